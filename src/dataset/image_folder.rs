//! Class-per-directory image datasets.
//!
//! ```text
//! root/
//! ├── Pepper__bell__Bacterial_spot/
//! │   ├── 0a1b.jpg
//! │   └── ...
//! └── Tomato_healthy/
//!     └── ...
//! ```
//!
//! Classes are the sub-directory names in sorted order, so the class index
//! of a directory is its position in that order.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::math::Tensor;
use crate::preprocess::{decode, to_input_tensor, IMAGE_SIZE};
use crate::train::SampleSource;

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "ppm"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSample {
    pub path: PathBuf,
    pub label: usize,
}

#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    classes: Vec<String>,
    /// Per class, files sorted by name.
    files: Vec<Vec<PathBuf>>,
}

impl ImageFolder {
    pub fn discover(root: impl AsRef<Path>) -> Result<ImageFolder> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::Dataset(format!(
                "Dataset directory does not exist: {}",
                root.display()
            )));
        }

        let mut classes = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                match entry.file_name().into_string() {
                    Ok(name) => classes.push(name),
                    Err(name) => warn!(?name, "skipping class directory with non UTF-8 name"),
                }
            }
        }
        classes.sort();
        if classes.is_empty() {
            return Err(Error::Dataset(format!(
                "No class directories found under {}",
                root.display()
            )));
        }

        let mut files = Vec::with_capacity(classes.len());
        for (label, class) in classes.iter().enumerate() {
            let mut class_files = Vec::new();
            for entry in std::fs::read_dir(root.join(class))? {
                let path = entry?.path();
                if path.is_file() && is_image(&path) {
                    class_files.push(path);
                }
            }
            class_files.sort();
            debug!(class = %class, label, samples = class_files.len(), "class discovered");
            files.push(class_files);
        }

        let folder = ImageFolder { root, classes, files };
        info!(
            root = %folder.root.display(),
            classes = folder.num_classes(),
            samples = folder.len(),
            "dataset discovered"
        );
        Ok(folder)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class names in index order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn len(&self) -> usize {
        self.files.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class_counts(&self) -> Vec<usize> {
        self.files.iter().map(Vec::len).collect()
    }

    /// Deterministic per-class split: the first `floor(n × validation_split)`
    /// files of each class go to validation, the rest to training.
    pub fn split(&self, validation_split: f64) -> Result<(FolderSplit, FolderSplit)> {
        if !(0.0..1.0).contains(&validation_split) {
            return Err(Error::Dataset(format!(
                "validation split must be in [0, 1), got {}",
                validation_split
            )));
        }

        let mut train = Vec::new();
        let mut val = Vec::new();
        for (label, class_files) in self.files.iter().enumerate() {
            let n_val = (class_files.len() as f64 * validation_split).floor() as usize;
            for (i, path) in class_files.iter().enumerate() {
                let sample = ImageSample { path: path.clone(), label };
                if i < n_val {
                    val.push(sample);
                } else {
                    train.push(sample);
                }
            }
        }

        Ok((FolderSplit::new(train), FolderSplit::new(val)))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// One side of a split; images are decoded when a sample is requested.
#[derive(Debug, Clone)]
pub struct FolderSplit {
    samples: Vec<ImageSample>,
    image_size: u32,
}

impl FolderSplit {
    pub fn new(samples: Vec<ImageSample>) -> Self {
        FolderSplit {
            samples,
            image_size: IMAGE_SIZE,
        }
    }

    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn samples(&self) -> &[ImageSample] {
        &self.samples
    }
}

impl SampleSource for FolderSplit {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn load(&self, index: usize) -> Result<(Tensor, usize)> {
        let sample = self
            .samples
            .get(index)
            .ok_or_else(|| Error::Dataset(format!("sample index {} out of range", index)))?;
        let bytes = std::fs::read(&sample.path)?;
        let img = decode(&bytes).map_err(|e| {
            Error::Dataset(format!("failed to decode {}: {}", sample.path.display(), e))
        })?;
        Ok((to_input_tensor(&img, self.image_size)?, sample.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_png(path: &Path, shade: u8) {
        let img = RgbImage::from_pixel(4, 4, Rgb([shade, shade, shade]));
        let mut file = fs::File::create(path).unwrap();
        img.write_to(&mut file, ImageOutputFormat::Png).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (class, n) in [("b_class", 5), ("a_class", 10)] {
            let class_dir = dir.path().join(class);
            fs::create_dir(&class_dir).unwrap();
            for i in 0..n {
                write_png(&class_dir.join(format!("img_{:02}.PNG", i)), 10 * i as u8);
            }
            fs::write(class_dir.join("notes.txt"), "not an image").unwrap();
        }
        fs::write(dir.path().join("README"), "stray file").unwrap();
        dir
    }

    #[test]
    fn classes_are_sorted_and_non_images_skipped() {
        let dir = fixture();
        let folder = ImageFolder::discover(dir.path()).unwrap();

        assert_eq!(folder.classes(), &["a_class".to_string(), "b_class".to_string()]);
        assert_eq!(folder.class_counts(), vec![10, 5]);
        assert_eq!(folder.len(), 15);
    }

    #[test]
    fn split_takes_leading_files_per_class_for_validation() {
        let dir = fixture();
        let folder = ImageFolder::discover(dir.path()).unwrap();
        let (train, val) = folder.split(0.2).unwrap();

        assert_eq!(val.len(), 3);
        assert_eq!(train.len(), 12);
        let val_names: Vec<String> = val
            .samples()
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(val_names, vec!["img_00.PNG", "img_01.PNG", "img_00.PNG"]);
        assert_eq!(val.samples()[2].label, 1);
    }

    #[test]
    fn samples_load_lazily_as_hwc_tensors() {
        let dir = fixture();
        let folder = ImageFolder::discover(dir.path()).unwrap();
        let (train, _) = folder.split(0.0).unwrap();
        let train = train.with_image_size(6);

        let (tensor, label) = train.load(0).unwrap();
        assert_eq!(tensor.shape(), &[6, 6, 3]);
        assert_eq!(label, 0);
        assert!(train.load(99).is_err());
    }

    #[test]
    fn missing_root_and_bad_split_are_errors() {
        assert!(matches!(
            ImageFolder::discover("/definitely/not/here"),
            Err(Error::Dataset(_))
        ));
        let dir = fixture();
        let folder = ImageFolder::discover(dir.path()).unwrap();
        assert!(folder.split(1.0).is_err());
        assert!(folder.split(-0.1).is_err());
    }
}
