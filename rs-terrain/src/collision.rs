use std::time::Instant;

use bevy::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, TerrainError};
use crate::height_field::HeightField;
use crate::render_mesh::{MeshData, build_mesh_from_data};

/// Triangle mesh for a static collision shape. Built per tile and per
/// resolution, never cached.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    pub scale: f32,
}

impl CollisionMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of individual indices, three per triangle.
    pub fn index_count(&self) -> usize {
        self.indices.len() * 3
    }

    /// Vertices as a flat `x, y, z, x, y, z, ...` array.
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.to_array()).collect()
    }

    pub fn index_groups(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// Debug rendering of the collision surface.
    pub fn to_mesh(&self) -> Mesh {
        let normals = vec![[0.0, 1.0, 0.0]; self.vertices.len()];
        let uvs = vec![[0.0, 0.0]; self.vertices.len()];
        build_mesh_from_data(MeshData {
            positions: self.vertices.iter().map(|v| v.to_array()).collect(),
            normals,
            uvs,
            indices: self.indices.iter().flatten().copied().collect(),
        })
    }

    #[cfg(feature = "avian")]
    pub fn to_collider(&self) -> avian3d::prelude::Collider {
        avian3d::prelude::Collider::trimesh(self.vertices.clone(), self.indices.clone())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CollisionMeshBuilder;

impl CollisionMeshBuilder {
    /// Triangulates `height_field` into `num_quads_per_side²` quads over the
    /// unit square, sampling nearest pixels, then scales every axis by
    /// `world_scale`.
    pub fn build(
        height_field: &HeightField,
        num_quads_per_side: u32,
        world_scale: f32,
    ) -> Result<CollisionMesh> {
        let Some(num_vertices) = addressable_vertices_per_side(num_quads_per_side) else {
            warn!(
                requested = num_quads_per_side,
                "rejected collision mesh request outside the u32 index range"
            );
            return Err(TerrainError::InvalidResolution {
                requested: num_quads_per_side,
            });
        };
        let start = Instant::now();
        let quads = num_quads_per_side;

        let mut vertices = Vec::with_capacity(num_vertices as usize * num_vertices as usize);
        for z in 0..num_vertices {
            for x in 0..num_vertices {
                let u = x as f32 / quads as f32;
                let v = z as f32 / quads as f32;
                let height = height_field.height_at(u, v);
                vertices.push(Vec3::new(u, height, v) * world_scale);
            }
        }

        let mut indices = Vec::with_capacity(quads as usize * quads as usize * 2);
        for z in 0..quads {
            for x in 0..quads {
                let v0 = x + z * num_vertices;
                let v1 = v0 + 1;
                let v2 = v1 + num_vertices;
                let v3 = v0 + num_vertices;
                indices.push([v0, v1, v2]);
                indices.push([v2, v3, v0]);
            }
        }

        debug!(
            quads,
            vertices = vertices.len(),
            triangles = indices.len(),
            elapsed_ms = start.elapsed().as_secs_f32() * 1000.0,
            "built terrain collision mesh"
        );
        Ok(CollisionMesh {
            vertices,
            indices,
            scale: world_scale,
        })
    }
}

/// Vertices per side for `quads`, or `None` when the grid is empty or its
/// last vertex would not fit a `u32` index.
fn addressable_vertices_per_side(quads: u32) -> Option<u32> {
    if quads == 0 {
        return None;
    }
    let per_side = quads.checked_add(1)?;
    ((per_side as u64).pow(2) <= u32::MAX as u64 + 1).then_some(per_side)
}
