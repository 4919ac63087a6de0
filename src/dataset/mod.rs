pub mod image_folder;

pub use image_folder::{FolderSplit, ImageFolder, ImageSample, IMAGE_EXTENSIONS};
