use std::path::Path;

use ndarray::{Array2, Array3, Axis, stack};
use tracing::info;

use crate::{
    array_io::{save_npy, with_npy_extension},
    container::ChannelContainer,
    error::{StageError, StageResult},
    vis,
};

/// Combines a raw depth map and its anti-aliased alpha map into one
/// H×W×4 array (three identical depth channels plus alpha), saved as `.npy`.
///
/// Both containers must carry the depth/alpha scalar replicated across their
/// `R`/`G`/`B` channels; background pixels in the depth map carry the raster
/// maximum as a sentinel. With `vis_png` set, also writes a grayscale
/// visualization where closer pixels are brighter and the background is
/// black (see [`depth_visualization`]).
pub fn extract_depth(
    depth: &ChannelContainer,
    alpha: &ChannelContainer,
    out_npy: &Path,
    vis_png: Option<&Path>,
) -> StageResult<Array3<f32>> {
    let d = depth.identical_rgb("depth")?;
    let a = alpha.identical_rgb("alpha")?;
    if d.dim() != a.dim() {
        return Err(StageError::precondition(format!(
            "depth is {}x{} but alpha is {}x{}",
            d.dim().0,
            d.dim().1,
            a.dim().0,
            a.dim().1
        )));
    }

    let combined = stack(Axis(2), &[d.view(), d.view(), d.view(), a.view()])
        .map_err(|e| StageError::validation(format!("stack depth channels: {e}")))?;

    let out_npy = with_npy_extension(out_npy);
    save_npy(&out_npy, &combined)?;

    if let Some(png) = vis_png {
        let im = depth_visualization(&d, &a)?;
        vis::gray_to_png(png, &im)?;
    }

    info!(out = %out_npy.display(), "depth image extracted");
    Ok(combined)
}

/// Maps raw depth values to display brightness in [0, 255].
///
/// The raster's global maximum is the background sentinel; background depth
/// is first clamped to the maximum over foreground pixels so it no longer
/// dominates the scale. Foreground maximum maps to 0 and foreground minimum
/// to 255 (closer is brighter), then the result is composited against a
/// black background with alpha as the per-pixel blend weight.
pub fn depth_visualization(
    depth: &Array2<f32>,
    alpha: &Array2<f32>,
) -> StageResult<Array2<f32>> {
    if depth.dim() != alpha.dim() {
        return Err(StageError::precondition(format!(
            "depth is {}x{} but alpha is {}x{}",
            depth.dim().0,
            depth.dim().1,
            alpha.dim().0,
            alpha.dim().1
        )));
    }

    let global_max = depth.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut fg_max = f32::NEG_INFINITY;
    for &v in depth {
        if v < global_max {
            fg_max = fg_max.max(v);
        }
    }
    if !fg_max.is_finite() {
        return Err(StageError::validation(
            "depth map has no foreground pixels (every value equals the background sentinel)",
        ));
    }

    let clamped = depth.mapv(|v| v.min(fg_max));
    let min_val = clamped.iter().copied().fold(f32::INFINITY, f32::min);
    let denom = fg_max - min_val;

    let im = if denom > 0.0 {
        clamped.mapv(|v| 255.0 * (fg_max - v) / denom)
    } else {
        // Flat foreground depth: nothing to rescale.
        Array2::zeros(clamped.dim())
    };

    Ok(alpha * &im)
}
