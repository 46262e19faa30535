use std::sync::Arc;

use bevy::prelude::*;

use crate::collision::CollisionMesh;
use crate::height_field::HeightField;
use crate::render_mesh::MorphDirection;
use crate::settings::TerrainSettings;

/// One square of terrain. Tile `(x, z)` covers
/// `[x, x + 1) * world_scale` by `[z, z + 1) * world_scale`.
#[derive(Component, Clone, Debug)]
pub struct TerrainTile {
    pub coords: IVec2,
    pub height_field: Arc<HeightField>,
    pub collision_quads: u32,
    pub world_scale: f32,
}

impl TerrainTile {
    pub fn new(coords: IVec2, height_field: Arc<HeightField>, settings: &TerrainSettings) -> Self {
        Self {
            coords,
            height_field,
            collision_quads: settings.collision_quads_per_side,
            world_scale: settings.world_scale,
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::new(
            self.coords.x as f32 * self.world_scale,
            0.0,
            self.coords.y as f32 * self.world_scale,
        )
    }

    pub fn center(&self) -> Vec3 {
        self.origin() + Vec3::new(self.world_scale * 0.5, 0.0, self.world_scale * 0.5)
    }

    /// Maps the render grid's `[-1, 1]` footprint and raw heights onto the
    /// same world box the collision mesh occupies.
    pub fn render_transform(&self) -> Transform {
        let half = self.world_scale * 0.5;
        Transform::from_xyz(half, 0.0, half).with_scale(Vec3::new(half, self.world_scale, half))
    }
}

/// Marks the entity whose position drives tile LOD selection.
#[derive(Component)]
pub struct TerrainViewer;

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainLod {
    pub level: u32,
    pub morph: MorphDirection,
}

impl Default for TerrainLod {
    fn default() -> Self {
        Self {
            level: 0,
            morph: MorphDirection::Full,
        }
    }
}

/// Render mesh asset of a tile, held on the tile root.
#[derive(Component)]
pub struct TerrainTileMesh(pub Handle<Mesh>);

/// Scaled collision mesh, ready for the physics world.
#[derive(Component, Clone, Debug)]
pub struct TerrainCollider(pub CollisionMesh);
