#![deny(unsafe_code)]

//! Convenience layer for rendering research: extract depth, normal, and
//! intrinsic-image rasters from multi-channel EXR output, assemble still
//! frames into videos, and script lighting rigs against an abstract scene
//! host.

pub mod array_io;
pub mod container;
pub mod error;
pub mod extract;
pub mod rig;
pub mod video;
pub mod vis;

pub use container::ChannelContainer;
pub use error::{StageError, StageResult};
pub use extract::{
    IntrinsicImages, decompose_lighting_passes, extract_depth, extract_intrinsic_images,
    extract_normal,
};
pub use rig::{
    EnvLighting, EnvSource, LightHandle, LightKind, LightSpec, RenderEngine, RigSpec, SceneHost,
    recording::RecordingHost,
};
pub use video::{VideoConfig, VideoEncoder, VideoFrame, frames_to_video};
