use std::path::Path;

use ndarray::{Array3, Axis, stack};
use tracing::info;

use crate::{
    array_io::{save_npy, with_npy_extension},
    container::ChannelContainer,
    error::{StageError, StageResult},
    vis,
};

/// Converts an RGBA normal-map container into an H×W×4 `.npy` array, with an
/// optional visualization (black background, per the compositing convention
/// of common post-production tools).
pub fn extract_normal(
    container: &ChannelContainer,
    out_npy: &Path,
    vis_png: Option<&Path>,
) -> StageResult<Array3<f32>> {
    let r = container.channel("R")?;
    let g = container.channel("G")?;
    let b = container.channel("B")?;
    let a = container.channel("A")?;

    let combined = stack(Axis(2), &[r.view(), g.view(), b.view(), a.view()])
        .map_err(|e| StageError::validation(format!("stack normal channels: {e}")))?;

    let out_npy = with_npy_extension(out_npy);
    save_npy(&out_npy, &combined)?;

    if let Some(png) = vis_png {
        let im = normal_visualization(&combined)?;
        vis::rgb_to_png(png, &im)?;
    }

    info!(out = %out_npy.display(), "normal image extracted");
    Ok(combined)
}

/// Maps signed unit-vector components to display values in [0, 255]:
/// `(1 - (n/2 + 0.5)) * 255` per axis, alpha-composited over black with the
/// alpha channel broadcast across the three color channels.
pub fn normal_visualization(normals: &Array3<f32>) -> StageResult<Array3<f32>> {
    let (h, w, c) = normals.dim();
    if c != 4 {
        return Err(StageError::precondition(format!(
            "a normal map must be rgba (4 channels), got {c}"
        )));
    }

    let mut im = Array3::<f32>::zeros((h, w, 3));
    for y in 0..h {
        for x in 0..w {
            let alpha = normals[[y, x, 3]];
            for ch in 0..3 {
                let n = normals[[y, x, ch]];
                let v = (1.0 - (n / 2.0 + 0.5)) * 255.0;
                im[[y, x, ch]] = alpha * v;
            }
        }
    }
    Ok(im)
}
