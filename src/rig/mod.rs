//! Lighting-rig and scene-save helpers, expressed against an abstract
//! [`SceneHost`] capability so the rotation math and parameter validation
//! stay pure and testable outside the host application.

pub mod math;
pub mod recording;

use std::{f32::consts::PI, path::Path, path::PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    array_io::ensure_parent_dir,
    error::{StageError, StageResult},
};

/// Opaque handle to a light owned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightHandle(pub u64);

/// The closed set of rendering backends a host can report. Emission and
/// environment strength are only wired for Cycles; configuring them under any
/// other engine is a typed, recoverable error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    Cycles,
    Eevee,
    Workbench,
}

impl std::fmt::Display for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cycles => "CYCLES",
            Self::Eevee => "EEVEE",
            Self::Workbench => "WORKBENCH",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    /// Emits parallel rays; location only matters for aiming.
    Sun,
    /// Emits the lambertian way from a rectangle.
    Area,
    /// Omnidirectional.
    Point,
}

/// Parameters for one light. `energy` and `shadow_soft_size` fall back to
/// per-kind defaults when unset (sun: 1.0 / 0.1, area: 100.0 / 0.1, point:
/// 100.0 / 0.0, hard shadows).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightSpec {
    pub kind: LightKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: [f32; 3],
    #[serde(default)]
    pub rotation_rad: [f32; 3],
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub shadow_soft_size: Option<f32>,
    /// Target to aim the light at after creation (directional kinds).
    #[serde(default)]
    pub aim: Option<[f32; 3]>,
}

impl LightSpec {
    pub fn sun() -> Self {
        Self::of_kind(LightKind::Sun)
    }

    pub fn area() -> Self {
        Self::of_kind(LightKind::Area)
    }

    pub fn point() -> Self {
        Self::of_kind(LightKind::Point)
    }

    fn of_kind(kind: LightKind) -> Self {
        Self {
            kind,
            name: None,
            location: [0.0; 3],
            rotation_rad: [0.0; 3],
            energy: None,
            shadow_soft_size: None,
            aim: None,
        }
    }

    pub fn resolved_energy(&self) -> f32 {
        self.energy.unwrap_or(match self.kind {
            LightKind::Sun => 1.0,
            LightKind::Area | LightKind::Point => 100.0,
        })
    }

    pub fn resolved_shadow_soft_size(&self) -> f32 {
        self.shadow_soft_size.unwrap_or(match self.kind {
            // Larger means softer shadows; point lights default to hard.
            LightKind::Sun | LightKind::Area => 0.1,
            LightKind::Point => 0.0,
        })
    }

    pub fn validate(&self) -> StageResult<()> {
        if self.resolved_energy() < 0.0 {
            return Err(StageError::validation("light energy must be non-negative"));
        }
        if self.resolved_shadow_soft_size() < 0.0 {
            return Err(StageError::validation(
                "shadow soft size must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Environment lighting: a solid color or an equirectangular image.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvSource {
    /// RGB or RGBA, each component in [0, 1]; RGB is promoted to RGBA.
    Color(Vec<f32>),
    Image(PathBuf),
}

impl EnvSource {
    /// The color as RGBA, or `None` for image sources. Lengths other than
    /// 3 or 4 are invalid.
    pub fn resolved_color(&self) -> StageResult<Option<[f32; 4]>> {
        match self {
            Self::Image(_) => Ok(None),
            Self::Color(c) => match c.as_slice() {
                [r, g, b] => Ok(Some([*r, *g, *b, 1.0])),
                [r, g, b, a] => Ok(Some([*r, *g, *b, *a])),
                _ => Err(StageError::validation(
                    "environment color must have 3 or 4 components",
                )),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvLighting {
    pub source: EnvSource,
    #[serde(default = "default_env_strength")]
    pub strength: f32,
    #[serde(default)]
    pub rotation_rad: [f32; 3],
    #[serde(default = "default_env_scale")]
    pub scale: [f32; 3],
}

fn default_env_strength() -> f32 {
    1.0
}

fn default_env_scale() -> [f32; 3] {
    [1.0; 3]
}

/// What the crate needs from the host application: light creation and field
/// mutation, environment shader wiring, and the scene-save operator.
pub trait SceneHost {
    fn engine(&self) -> RenderEngine;

    fn create_light(
        &mut self,
        kind: LightKind,
        location: [f32; 3],
        rotation_rad: [f32; 3],
    ) -> StageResult<LightHandle>;

    fn set_light_name(&mut self, light: LightHandle, name: &str) -> StageResult<()>;

    fn set_transform(
        &mut self,
        light: LightHandle,
        location: [f32; 3],
        rotation_rad: [f32; 3],
    ) -> StageResult<()>;

    fn set_shadow_softness(&mut self, light: LightHandle, size: f32) -> StageResult<()>;

    fn set_emission(&mut self, light: LightHandle, energy: f32) -> StageResult<()>;

    fn light_location(&self, light: LightHandle) -> StageResult<[f32; 3]>;

    fn set_environment(&mut self, env: &EnvLighting) -> StageResult<()>;

    fn pack_external_data(&mut self) -> StageResult<()>;

    fn save_scene(&mut self, path: &Path) -> StageResult<()>;
}

/// Creates a light from `spec`, names it, sets shadow softness and emission,
/// and aims it if an `aim` target is given.
pub fn add_light(host: &mut dyn SceneHost, spec: &LightSpec) -> StageResult<LightHandle> {
    spec.validate()?;

    if spec.rotation_rad.iter().any(|r| r.abs() > 2.0 * PI) {
        warn!("some rotation value falls outside [-2pi, 2pi]; are inputs in radians?");
    }

    let handle = host.create_light(spec.kind, spec.location, spec.rotation_rad)?;
    if let Some(name) = &spec.name {
        host.set_light_name(handle, name)?;
    }
    host.set_shadow_softness(handle, spec.resolved_shadow_soft_size())?;

    match host.engine() {
        RenderEngine::Cycles => host.set_emission(handle, spec.resolved_energy())?,
        other => return Err(StageError::unsupported_engine(other)),
    }

    if let Some(aim) = spec.aim {
        point_light_to(host, handle, aim)?;
    }

    info!(kind = ?spec.kind, name = spec.name.as_deref().unwrap_or("<unnamed>"), "light added");
    Ok(handle)
}

/// Rotates a directional light so it faces `target`, keeping its local +Y
/// pointing up (see [`math::track_rotation`]).
pub fn point_light_to(
    host: &mut dyn SceneHost,
    light: LightHandle,
    target: [f32; 3],
) -> StageResult<()> {
    let location = host.light_location(light)?;
    let rotation = math::track_rotation(Vec3::from(target) - Vec3::from(location))?;
    host.set_transform(light, location, rotation)?;
    info!(?target, "light aimed at target");
    Ok(())
}

/// Wires up environment lighting. Only the Cycles engine carries the strength
/// input this configures.
pub fn add_environment(host: &mut dyn SceneHost, env: &EnvLighting) -> StageResult<()> {
    match host.engine() {
        RenderEngine::Cycles => {}
        other => return Err(StageError::unsupported_engine(other)),
    }

    let color = env.source.resolved_color()?;
    if color.is_some()
        && (env.rotation_rad != [0.0; 3] || env.scale != [1.0; 3])
    {
        warn!("environment is a pure color; rotation and scale have no effect");
    }

    host.set_environment(env)?;
    info!("environment light added");
    Ok(())
}

/// Saves the scene: ensures the output directory exists, optionally removes a
/// pre-existing file at `outpath`, packs external data (failure is a warning,
/// not an abort), then invokes the host save operator.
pub fn save_scene(
    host: &mut dyn SceneHost,
    outpath: &Path,
    delete_overwritten: bool,
) -> StageResult<()> {
    use anyhow::Context as _;

    ensure_parent_dir(outpath)?;
    if delete_overwritten && outpath.exists() {
        std::fs::remove_file(outpath)
            .with_context(|| format!("remove '{}'", outpath.display()))?;
    }

    if let Err(e) = host.pack_external_data() {
        warn!(error = %e, "failed to pack some external data");
    }

    host.save_scene(outpath)?;
    info!(out = %outpath.display(), "scene saved");
    Ok(())
}

/// A whole rig as data: lights plus optional environment, typically loaded
/// from JSON and applied to a host.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RigSpec {
    #[serde(default)]
    pub lights: Vec<LightSpec>,
    #[serde(default)]
    pub environment: Option<EnvLighting>,
}

impl RigSpec {
    pub fn validate(&self) -> StageResult<()> {
        for light in &self.lights {
            light.validate()?;
        }
        if let Some(env) = &self.environment {
            env.source.resolved_color()?;
        }
        Ok(())
    }

    pub fn apply(&self, host: &mut dyn SceneHost) -> StageResult<Vec<LightHandle>> {
        self.validate()?;
        let mut handles = Vec::with_capacity(self.lights.len());
        for light in &self.lights {
            handles.push(add_light(host, light)?);
        }
        if let Some(env) = &self.environment {
            add_environment(host, env)?;
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_kind_defaults_match_the_rig_conventions() {
        assert_eq!(LightSpec::sun().resolved_energy(), 1.0);
        assert_eq!(LightSpec::area().resolved_energy(), 100.0);
        assert_eq!(LightSpec::point().resolved_energy(), 100.0);
        assert_eq!(LightSpec::sun().resolved_shadow_soft_size(), 0.1);
        assert_eq!(LightSpec::point().resolved_shadow_soft_size(), 0.0);
    }

    #[test]
    fn env_color_promotes_rgb_to_rgba() {
        let rgb = EnvSource::Color(vec![0.2, 0.4, 0.6]);
        assert_eq!(rgb.resolved_color().unwrap(), Some([0.2, 0.4, 0.6, 1.0]));

        let rgba = EnvSource::Color(vec![0.2, 0.4, 0.6, 0.5]);
        assert_eq!(rgba.resolved_color().unwrap(), Some([0.2, 0.4, 0.6, 0.5]));

        let bad = EnvSource::Color(vec![0.2, 0.4]);
        assert!(bad.resolved_color().is_err());
    }

    #[test]
    fn rig_spec_round_trips_through_json() {
        let json = r#"{
            "lights": [
                {"kind": "sun", "name": "key", "location": [4.0, -4.0, 8.0], "aim": [0.0, 0.0, 0.0]},
                {"kind": "point", "energy": 50.0}
            ],
            "environment": {"source": [1.0, 1.0, 1.0], "strength": 0.5}
        }"#;

        let rig: RigSpec = serde_json::from_str(json).unwrap();
        rig.validate().unwrap();
        assert_eq!(rig.lights.len(), 2);
        assert_eq!(rig.lights[0].kind, LightKind::Sun);
        assert_eq!(rig.lights[0].aim, Some([0.0, 0.0, 0.0]));
        assert_eq!(rig.lights[1].energy, Some(50.0));

        let back: RigSpec =
            serde_json::from_str(&serde_json::to_string(&rig).unwrap()).unwrap();
        assert_eq!(back.lights.len(), 2);
    }

    #[test]
    fn negative_energy_is_invalid() {
        let mut spec = LightSpec::sun();
        spec.energy = Some(-1.0);
        assert!(spec.validate().is_err());
    }
}
