use image::imageops::{self, FilterType};
use ndarray::{Array3, Array4, Axis};

use super::config::LocalModelConfig;
use crate::error::LocalModelError;

/// Per-pixel normalization used by the exported fruit model.
///
/// With a large `std` and a fractional `mean` (the shipped config uses 255
/// and 0.5) pixels are mapped to `[-1, 1]` as `(x / std - mean) / mean`;
/// otherwise the plain `(x - mean) / std` is applied. This is tuned to that
/// model and should not be extended.
pub fn normalize_pixel(pixel: f32, mean: f32, std: f32) -> f32 {
    if std >= 10.0 && mean > 0.0 && mean < 1.0 {
        (pixel / std - mean) / mean.max(1e-6)
    } else {
        (pixel - mean) / std
    }
}

/// Decodes an image into a `[1, 3, height, width]` float tensor.
pub fn preprocess_image(bytes: &[u8], config: &LocalModelConfig) -> Result<Array4<f32>, LocalModelError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let resized = imageops::resize(&rgb, config.width, config.height, FilterType::CatmullRom);

    let hwc = Array3::from_shape_vec(
        (config.height as usize, config.width as usize, 3),
        resized.into_raw(),
    )
    .map_err(|e| LocalModelError::Image(e.to_string()))?;

    let normalized = hwc.mapv(|p| normalize_pixel(p as f32, config.mean, config.std));

    Ok(normalized
        .permuted_axes([2, 0, 1])
        .insert_axis(Axis(0))
        .as_standard_layout()
        .into_owned())
}
