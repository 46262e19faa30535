use std::sync::{Arc, OnceLock};

use bevy::prelude::*;
use tracing::{info, warn};

use crate::height_field::HeightField;
use crate::render_mesh::{TerrainMesh, TerrainMeshBuilder};
use crate::settings::TerrainSettings;

/// Anything that can produce the shared render mesh.
pub trait TerrainMeshSource: Send + Sync + 'static {
    fn build(&self, height_field: &HeightField) -> TerrainMesh;
}

impl TerrainMeshSource for TerrainMeshBuilder {
    fn build(&self, height_field: &HeightField) -> TerrainMesh {
        TerrainMeshBuilder::build(self, height_field)
    }
}

/// Owner of the single [`TerrainMesh`] every tile renders with. The mesh is
/// built on first request and reused afterwards, including when several
/// threads race for it.
#[derive(Resource)]
pub struct TerrainMeshCache {
    source: Box<dyn TerrainMeshSource>,
    mesh: OnceLock<Arc<TerrainMesh>>,
}

impl Default for TerrainMeshCache {
    fn default() -> Self {
        Self::new(TerrainMeshBuilder::new())
    }
}

impl FromWorld for TerrainMeshCache {
    fn from_world(world: &mut World) -> Self {
        let resolution = world
            .get_resource::<TerrainSettings>()
            .map(|settings| settings.render_grid_resolution);
        let Some(resolution) = resolution else {
            return Self::default();
        };
        match TerrainMeshBuilder::with_resolution(resolution) {
            Ok(builder) => Self::new(builder),
            Err(err) => {
                warn!("{err}; using the default render grid");
                Self::default()
            }
        }
    }
}

impl TerrainMeshCache {
    pub fn new(source: impl TerrainMeshSource) -> Self {
        Self {
            source: Box::new(source),
            mesh: OnceLock::new(),
        }
    }

    /// Returns the shared mesh, building it from `height_field` only if no
    /// mesh exists yet. Later fields are ignored.
    pub fn get_or_build(&self, height_field: &HeightField) -> Arc<TerrainMesh> {
        self.mesh
            .get_or_init(|| {
                let mesh = self.source.build(height_field);
                info!(
                    resolution = mesh.resolution(),
                    vertices = mesh.vertex_count(),
                    "terrain render mesh initialized"
                );
                Arc::new(mesh)
            })
            .clone()
    }

    pub fn get(&self) -> Option<Arc<TerrainMesh>> {
        self.mesh.get().cloned()
    }

    pub fn is_built(&self) -> bool {
        self.mesh.get().is_some()
    }
}
