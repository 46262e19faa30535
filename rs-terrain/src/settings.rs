use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::render_mesh::GRID_RESOLUTION;

#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Quads per side of the shared render grid. Must be even.
    pub render_grid_resolution: u32,
    /// Quads per side of each tile's collision mesh.
    pub collision_quads_per_side: u32,
    /// World-space edge length of a tile.
    pub world_scale: f32,
    pub amplitude: f32,
    /// Width of one LOD ring in world units.
    pub lod_distance: f32,
    pub async_collision: bool,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            render_grid_resolution: GRID_RESOLUTION,
            collision_quads_per_side: 32,
            world_scale: 64.0,
            amplitude: 16.0,
            lod_distance: 128.0,
            async_collision: true,
        }
    }
}

impl TerrainSettings {
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml(&raw)?;
        info!(path = %path.as_ref().display(), "loaded terrain settings");
        Ok(settings)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.as_ref().display(), "{err}; using default terrain settings");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = TerrainSettings::from_toml("collision_quads_per_side = 8\nworld_scale = 10.0\n")
            .unwrap();
        assert_eq!(settings.collision_quads_per_side, 8);
        assert_eq!(settings.world_scale, 10.0);
        assert_eq!(settings.render_grid_resolution, GRID_RESOLUTION);
        assert!(settings.async_collision);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = TerrainSettings::from_toml("world_scale = \"big\"").unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));
    }

    #[test]
    fn missing_file_falls_back() {
        let settings = TerrainSettings::load_or_default("does/not/exist/terrain.toml");
        assert_eq!(settings, TerrainSettings::default());
    }
}
