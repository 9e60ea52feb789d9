//! Byte-quantized visualization output.
//!
//! Extraction results live in float arrays; these helpers quantize them to
//! 8-bit PNGs for inspection. Two conventions exist: the depth/normal
//! visualizations compute values already scaled to [0, 255], while intrinsic
//! images hold radiance in [0, 1] (clamped, since HDR passes may exceed 1).

use std::path::Path;

use anyhow::Context as _;
use ndarray::{Array2, Array3};

use crate::{
    array_io::ensure_parent_dir,
    error::{StageError, StageResult},
};

/// Writes an H×W array of values in [0, 255] as a grayscale PNG.
pub fn gray_to_png(path: &Path, im: &Array2<f32>) -> StageResult<()> {
    ensure_parent_dir(path)?;
    let (h, w) = im.dim();
    let data: Vec<u8> = im.iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect();
    let img = image::GrayImage::from_raw(w as u32, h as u32, data)
        .ok_or_else(|| StageError::validation("grayscale buffer does not match dimensions"))?;
    img.save(path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Writes an H×W×3 array of values in [0, 255] as an RGB PNG.
pub fn rgb_to_png(path: &Path, im: &Array3<f32>) -> StageResult<()> {
    let (h, w, c) = im.dim();
    if c != 3 {
        return Err(StageError::validation(format!(
            "expected 3 channels for an rgb image, got {c}"
        )));
    }
    ensure_parent_dir(path)?;
    let data: Vec<u8> = im.iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect();
    let img = image::RgbImage::from_raw(w as u32, h as u32, data)
        .ok_or_else(|| StageError::validation("rgb buffer does not match dimensions"))?;
    img.save(path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Writes an H×W×4 array of values in [0, 1] as an RGBA PNG, clamping
/// out-of-range radiance before quantization.
pub fn rgba_unit_to_png(path: &Path, arr: &Array3<f32>) -> StageResult<()> {
    let (h, w, c) = arr.dim();
    if c != 4 {
        return Err(StageError::validation(format!(
            "expected 4 channels for an rgba image, got {c}"
        )));
    }
    ensure_parent_dir(path)?;
    let data: Vec<u8> = arr
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let img = image::RgbaImage::from_raw(w as u32, h as u32, data)
        .ok_or_else(|| StageError::validation("rgba buffer does not match dimensions"))?;
    img.save(path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
