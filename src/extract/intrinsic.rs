use std::path::Path;

use ndarray::{Array2, Array3, Axis, s, stack};
use tracing::info;

use crate::{
    array_io::save_npy,
    container::ChannelContainer,
    error::{StageError, StageResult},
    vis,
};

/// Names of the lighting passes an intrinsic-image EXR is expected to hold,
/// each as `<pass>.R/G/B/A` sub-channels.
pub const LIGHTING_PASSES: [&str; 7] = [
    "diffuse_color",
    "glossy_color",
    "diffuse_direct",
    "diffuse_indirect",
    "glossy_direct",
    "glossy_indirect",
    "composite",
];

/// The intrinsic-image decomposition of a set of lighting passes, each an
/// H×W×4 RGBA array.
#[derive(Clone, Debug)]
pub struct IntrinsicImages {
    pub albedo: Array3<f32>,
    pub shading: Array3<f32>,
    pub specularity: Array3<f32>,
    /// `albedo ⊙ shading + specularity` per color channel; alpha copied from
    /// albedo, since alpha is a coverage mask rather than radiance.
    pub reconstruction: Array3<f32>,
    /// The renderer's own composite, collapsed for reference. Equality with
    /// the reconstruction is deliberately not enforced here.
    pub composite: Array3<f32>,
}

/// Sums the named passes per color channel into one RGBA array.
///
/// All passes must share a pixel-identical alpha sub-channel; the shared
/// alpha becomes the result's fourth channel.
pub fn collapse_passes(
    container: &ChannelContainer,
    components: &[&str],
) -> StageResult<Array3<f32>> {
    let first = components
        .first()
        .ok_or_else(|| StageError::validation("collapse_passes needs at least one pass"))?;

    let mut channels: Vec<Array2<f32>> = Vec::with_capacity(4);
    for letter in ["R", "G", "B"] {
        let mut sum = container.channel(&format!("{first}.{letter}"))?.clone();
        for comp in &components[1..] {
            sum += container.channel(&format!("{comp}.{letter}"))?;
        }
        channels.push(sum);
    }

    let first_alpha = container.channel(&format!("{first}.A"))?;
    for comp in &components[1..] {
        if container.channel(&format!("{comp}.A"))? != first_alpha {
            return Err(StageError::precondition(
                "alpha channels of all passes must be the same",
            ));
        }
    }
    channels.push(first_alpha.clone());

    let views: Vec<_> = channels.iter().map(Array2::view).collect();
    stack(Axis(2), &views)
        .map_err(|e| StageError::validation(format!("stack collapsed channels: {e}")))
}

/// Decomposes lighting passes into albedo, shading, specularity, a
/// reconstruction, and the reference composite.
pub fn decompose_lighting_passes(container: &ChannelContainer) -> StageResult<IntrinsicImages> {
    let albedo = collapse_passes(container, &["diffuse_color", "glossy_color"])?;
    let shading = collapse_passes(container, &["diffuse_indirect", "diffuse_direct"])?;
    let specularity = collapse_passes(container, &["glossy_indirect", "glossy_direct"])?;

    let mut reconstruction = &albedo * &shading + &specularity;
    // Radiance multiplies and sums; alpha does not.
    reconstruction
        .slice_mut(s![.., .., 3])
        .assign(&albedo.slice(s![.., .., 3]));

    let composite = collapse_passes(container, &["composite"])?;

    Ok(IntrinsicImages {
        albedo,
        shading,
        specularity,
        reconstruction,
        composite,
    })
}

/// Runs the decomposition and writes the five arrays as `.npy` files into
/// `outdir` (created if missing), plus an RGBA PNG per array when `vis` is
/// set.
#[tracing::instrument(skip(container))]
pub fn extract_intrinsic_images(
    container: &ChannelContainer,
    outdir: &Path,
    vis: bool,
) -> StageResult<IntrinsicImages> {
    use anyhow::Context as _;
    std::fs::create_dir_all(outdir)
        .with_context(|| format!("create output directory '{}'", outdir.display()))?;

    let images = decompose_lighting_passes(container)?;
    let named = [
        ("albedo", &images.albedo),
        ("shading", &images.shading),
        ("specularity", &images.specularity),
        ("recon", &images.reconstruction),
        ("composite", &images.composite),
    ];
    for (name, arr) in named {
        save_npy(&outdir.join(format!("{name}.npy")), arr)?;
        if vis {
            vis::rgba_unit_to_png(&outdir.join(format!("{name}.png")), arr)?;
        }
    }

    info!(outdir = %outdir.display(), "intrinsic images extracted");
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Channels where every color pass is a constant and all alphas match.
    fn synthetic_channels(color: f32, shade: f32, alpha: &Array2<f32>) -> Vec<(String, Array2<f32>)> {
        let dim = alpha.dim();
        let mut channels = Vec::new();
        for pass in LIGHTING_PASSES {
            let value = match pass {
                "diffuse_color" | "glossy_color" => color,
                "composite" => 0.0,
                _ => shade,
            };
            for letter in ["R", "G", "B"] {
                channels.push((format!("{pass}.{letter}"), Array2::from_elem(dim, value)));
            }
            channels.push((format!("{pass}.A"), alpha.clone()));
        }
        channels
    }

    fn synthetic(color: f32, shade: f32, alpha: &Array2<f32>) -> ChannelContainer {
        ChannelContainer::from_channels(synthetic_channels(color, shade, alpha)).unwrap()
    }

    #[test]
    fn constant_passes_decompose_exactly() {
        let alpha = ndarray::arr2(&[[1.0f32, 0.5], [0.0, 1.0]]);
        let c = synthetic(0.25, 0.5, &alpha);

        let images = decompose_lighting_passes(&c).unwrap();

        for y in 0..2 {
            for x in 0..2 {
                for ch in 0..3 {
                    assert_eq!(images.albedo[[y, x, ch]], 0.5); // 2C
                    assert_eq!(images.shading[[y, x, ch]], 1.0); // 2S
                    assert_eq!(images.specularity[[y, x, ch]], 1.0); // 2S
                    // 4*C*S + 2S
                    assert_eq!(images.reconstruction[[y, x, ch]], 0.5 + 1.0);
                }
                for img in [
                    &images.albedo,
                    &images.shading,
                    &images.specularity,
                    &images.reconstruction,
                ] {
                    assert_eq!(img[[y, x, 3]], alpha[[y, x]]);
                }
            }
        }
    }

    #[test]
    fn mismatched_alpha_fails_the_collapse() {
        let alpha = Array2::from_elem((2, 2), 1.0f32);
        let mut channels = synthetic_channels(0.25, 0.5, &alpha);
        // Perturb one pass's alpha.
        for (name, arr) in &mut channels {
            if name == "glossy_color.A" {
                arr[[0, 0]] = 0.5;
            }
        }
        let c = ChannelContainer::from_channels(channels).unwrap();

        let err = collapse_passes(&c, &["diffuse_color", "glossy_color"]);
        assert!(matches!(err, Err(StageError::Precondition(_))));
    }

    #[test]
    fn writes_five_arrays_and_visualizations() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("intrinsics");
        let c = synthetic(0.1, 0.2, &Array2::from_elem((2, 2), 1.0f32));

        extract_intrinsic_images(&c, &outdir, true).unwrap();

        for name in ["albedo", "shading", "specularity", "recon", "composite"] {
            assert!(outdir.join(format!("{name}.npy")).exists());
            assert!(outdir.join(format!("{name}.png")).exists());
        }
    }
}
