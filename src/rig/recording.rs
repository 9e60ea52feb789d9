use std::path::{Path, PathBuf};

use anyhow::Context as _;

use super::{EnvLighting, EnvSource, LightHandle, LightKind, RenderEngine, SceneHost};
use crate::error::{StageError, StageResult};

/// One light as the host would hold it after our mutations.
#[derive(Clone, Debug)]
pub struct RecordedLight {
    pub kind: LightKind,
    pub name: Option<String>,
    pub location: [f32; 3],
    pub rotation_rad: [f32; 3],
    pub shadow_soft_size: Option<f32>,
    pub energy: Option<f32>,
}

/// In-memory [`SceneHost`] used by tests and the CLI dry-run. Records every
/// mutation; `save_scene` writes a placeholder file so save-path behavior is
/// observable. `fail_pack` simulates a host that cannot pack external data.
#[derive(Debug)]
pub struct RecordingHost {
    engine: RenderEngine,
    pub lights: Vec<RecordedLight>,
    pub environment: Option<EnvLighting>,
    pub saved: Vec<PathBuf>,
    pub fail_pack: bool,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new(RenderEngine::Cycles)
    }
}

impl RecordingHost {
    pub fn new(engine: RenderEngine) -> Self {
        Self {
            engine,
            lights: Vec::new(),
            environment: None,
            saved: Vec::new(),
            fail_pack: false,
        }
    }

    pub fn light(&self, handle: LightHandle) -> StageResult<&RecordedLight> {
        self.lights
            .get(handle.0 as usize)
            .ok_or_else(|| StageError::validation(format!("unknown light handle {}", handle.0)))
    }

    fn light_mut(&mut self, handle: LightHandle) -> StageResult<&mut RecordedLight> {
        self.lights
            .get_mut(handle.0 as usize)
            .ok_or_else(|| StageError::validation(format!("unknown light handle {}", handle.0)))
    }

    /// Human-readable account of the recorded scene, for dry-run output.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (i, l) in self.lights.iter().enumerate() {
            lines.push(format!(
                "light {i}: {:?} '{}' at [{:.3}, {:.3}, {:.3}] rot [{:.3}, {:.3}, {:.3}] energy {} shadow {}",
                l.kind,
                l.name.as_deref().unwrap_or("<unnamed>"),
                l.location[0],
                l.location[1],
                l.location[2],
                l.rotation_rad[0],
                l.rotation_rad[1],
                l.rotation_rad[2],
                l.energy.map_or("<unset>".to_string(), |e| e.to_string()),
                l.shadow_soft_size
                    .map_or("<unset>".to_string(), |s| s.to_string()),
            ));
        }
        if let Some(env) = &self.environment {
            let source = match &env.source {
                EnvSource::Color(c) => format!("color {c:?}"),
                EnvSource::Image(p) => format!("image '{}'", p.display()),
            };
            lines.push(format!("environment: {source} strength {}", env.strength));
        }
        lines
    }
}

impl SceneHost for RecordingHost {
    fn engine(&self) -> RenderEngine {
        self.engine
    }

    fn create_light(
        &mut self,
        kind: LightKind,
        location: [f32; 3],
        rotation_rad: [f32; 3],
    ) -> StageResult<LightHandle> {
        self.lights.push(RecordedLight {
            kind,
            name: None,
            location,
            rotation_rad,
            shadow_soft_size: None,
            energy: None,
        });
        Ok(LightHandle(self.lights.len() as u64 - 1))
    }

    fn set_light_name(&mut self, light: LightHandle, name: &str) -> StageResult<()> {
        self.light_mut(light)?.name = Some(name.to_string());
        Ok(())
    }

    fn set_transform(
        &mut self,
        light: LightHandle,
        location: [f32; 3],
        rotation_rad: [f32; 3],
    ) -> StageResult<()> {
        let l = self.light_mut(light)?;
        l.location = location;
        l.rotation_rad = rotation_rad;
        Ok(())
    }

    fn set_shadow_softness(&mut self, light: LightHandle, size: f32) -> StageResult<()> {
        self.light_mut(light)?.shadow_soft_size = Some(size);
        Ok(())
    }

    fn set_emission(&mut self, light: LightHandle, energy: f32) -> StageResult<()> {
        self.light_mut(light)?.energy = Some(energy);
        Ok(())
    }

    fn light_location(&self, light: LightHandle) -> StageResult<[f32; 3]> {
        Ok(self.light(light)?.location)
    }

    fn set_environment(&mut self, env: &EnvLighting) -> StageResult<()> {
        self.environment = Some(env.clone());
        Ok(())
    }

    fn pack_external_data(&mut self) -> StageResult<()> {
        if self.fail_pack {
            return Err(StageError::validation("host refused to pack external data"));
        }
        Ok(())
    }

    fn save_scene(&mut self, path: &Path) -> StageResult<()> {
        std::fs::write(path, b"")
            .with_context(|| format!("write scene '{}'", path.display()))?;
        self.saved.push(path.to_path_buf());
        Ok(())
    }
}
