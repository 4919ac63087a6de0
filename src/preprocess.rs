//! Image decoding and normalisation shared by the service and the trainer.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::Result;
use crate::math::Tensor;

/// Side length the classifier expects.
pub const IMAGE_SIZE: u32 = 224;

/// Resampling filter used by both training and inference.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Decodes `bytes` (format guessed from content) into an image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// RGB, resized exactly to `size × size`, scaled to [0, 1], HWC layout.
pub fn to_input_tensor(img: &DynamicImage, size: u32) -> Result<Tensor> {
    let rgb = img
        .resize_exact(size, size, RESIZE_FILTER)
        .to_rgb8();
    let data: Vec<f64> = rgb
        .pixels()
        .flat_map(|p| p.0.iter().map(|&c| c as f64 / 255.0))
        .collect();
    Tensor::new(vec![size as usize, size as usize, 3], data)
}

/// Full upload path: decode, normalise, and add a batch dimension of 1.
pub fn preprocess(bytes: &[u8]) -> Result<Tensor> {
    let img = decode(bytes)?;
    Ok(to_input_tensor(&img, IMAGE_SIZE)?.with_batch_dim())
}
