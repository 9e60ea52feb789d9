//! Extraction of physically meaningful rasters from multi-channel render
//! output: depth, normals, and intrinsic-image lighting passes.

pub mod depth;
pub mod intrinsic;
pub mod normal;

pub use depth::{depth_visualization, extract_depth};
pub use intrinsic::{IntrinsicImages, decompose_lighting_passes, extract_intrinsic_images};
pub use normal::{extract_normal, normal_visualization};
