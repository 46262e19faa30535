use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use tracing::debug;

use crate::error::{Result, TerrainError};
use crate::height_field::HeightField;

/// Quads per side of the shared render grid.
pub const GRID_RESOLUTION: u32 = 64;

/// Index-buffer variant of the render grid. Every variant other than `Full`
/// steps the named side(s) down by one LOD level so the tile meets a coarser
/// neighbour without cracks.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MorphDirection {
    Full,
    Top,
    Bottom,
    Right,
    Left,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Which grid sides a variant steps down. Top is the `-Z` row, left the `-X` column.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MorphSides {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl MorphDirection {
    pub const COUNT: usize = 9;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Full,
        Self::Top,
        Self::Bottom,
        Self::Right,
        Self::Left,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::Full => 0,
            Self::Top => 1,
            Self::Bottom => 2,
            Self::Right => 3,
            Self::Left => 4,
            Self::TopLeft => 5,
            Self::TopRight => 6,
            Self::BottomLeft => 7,
            Self::BottomRight => 8,
        }
    }

    pub const fn sides(self) -> MorphSides {
        let (top, bottom, left, right) = match self {
            Self::Full => (false, false, false, false),
            Self::Top => (true, false, false, false),
            Self::Bottom => (false, true, false, false),
            Self::Right => (false, false, false, true),
            Self::Left => (false, false, true, false),
            Self::TopLeft => (true, false, true, false),
            Self::TopRight => (true, false, false, true),
            Self::BottomLeft => (false, true, true, false),
            Self::BottomRight => (false, true, false, true),
        };
        MorphSides {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Picks the variant for a tile whose neighbours on the given sides are
    /// one level coarser. Opposite sides cannot both step down; those
    /// combinations have no variant.
    pub fn from_coarser_sides(top: bool, bottom: bool, left: bool, right: bool) -> Option<Self> {
        if (top && bottom) || (left && right) {
            return None;
        }
        let direction = match (top, bottom, left, right) {
            (false, false, false, false) => Self::Full,
            (true, false, false, false) => Self::Top,
            (false, true, false, false) => Self::Bottom,
            (false, false, true, false) => Self::Left,
            (false, false, false, true) => Self::Right,
            (true, false, true, false) => Self::TopLeft,
            (true, false, false, true) => Self::TopRight,
            (false, true, true, false) => Self::BottomLeft,
            (false, true, false, true) => Self::BottomRight,
            _ => return None,
        };
        Some(direction)
    }
}

pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

pub fn apply_mesh_data(mesh: &mut Mesh, data: MeshData) {
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, data.uvs);
    mesh.insert_indices(Indices::U32(data.indices));
}

pub fn build_mesh_from_data(data: MeshData) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    apply_mesh_data(&mut mesh, data);
    mesh
}

/// Render-ready grid shared by every terrain tile: one vertex buffer plus
/// one index buffer per [`MorphDirection`] for each LOD level.
///
/// Level `n` samples every `2^n`-th vertex. Its morph variants step a side
/// down to level `n + 1`, so they meet a neighbour rendered one level
/// coarser on exactly the same edge vertices.
#[derive(Debug)]
pub struct TerrainMesh {
    resolution: u32,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    lod_buffers: Vec<[Vec<u32>; MorphDirection::COUNT]>,
}

impl TerrainMesh {
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// Coarsest level that still has morph variants.
    pub fn max_lod_level(&self) -> u32 {
        self.lod_buffers.len() as u32 - 1
    }

    /// Full-resolution index buffer for `direction`.
    pub fn indices(&self, direction: MorphDirection) -> &[u32] {
        self.lod_indices(0, direction)
    }

    /// Index buffer at `level`, clamped to [`Self::max_lod_level`].
    pub fn lod_indices(&self, level: u32, direction: MorphDirection) -> &[u32] {
        let level = level.min(self.max_lod_level()) as usize;
        &self.lod_buffers[level][direction.index()]
    }

    pub fn triangle_count(&self, direction: MorphDirection) -> usize {
        self.indices(direction).len() / 3
    }

    /// Vertex positions of this grid with elevation taken from another tile's field.
    pub fn tile_positions(&self, height_field: &HeightField) -> Vec<[f32; 3]> {
        let heights = sample_grid(self.resolution, height_field);
        self.positions
            .iter()
            .zip(heights)
            .map(|(p, y)| [p[0], y, p[2]])
            .collect()
    }

    pub fn tile_normals(&self, height_field: &HeightField) -> Vec<[f32; 3]> {
        grid_normals(self.resolution, &sample_grid(self.resolution, height_field))
    }

    pub fn mesh_data(&self, direction: MorphDirection) -> MeshData {
        MeshData {
            positions: self.positions.clone(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
            indices: self.indices(direction).to_vec(),
        }
    }

    pub fn to_mesh(&self, direction: MorphDirection) -> Mesh {
        build_mesh_from_data(self.mesh_data(direction))
    }

    /// Bevy mesh for one tile: the shared topology and UVs with the tile's own heights.
    pub fn tile_mesh(
        &self,
        height_field: &HeightField,
        level: u32,
        direction: MorphDirection,
    ) -> Mesh {
        build_mesh_from_data(MeshData {
            positions: self.tile_positions(height_field),
            normals: self.tile_normals(height_field),
            uvs: self.uvs.clone(),
            indices: self.lod_indices(level, direction).to_vec(),
        })
    }

    /// Swaps the index buffer of an existing tile mesh to another level or variant.
    pub fn apply_lod(&self, mesh: &mut Mesh, level: u32, direction: MorphDirection) {
        mesh.insert_indices(Indices::U32(self.lod_indices(level, direction).to_vec()));
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TerrainMeshBuilder {
    resolution: u32,
}

impl Default for TerrainMeshBuilder {
    fn default() -> Self {
        Self {
            resolution: GRID_RESOLUTION,
        }
    }
}

impl TerrainMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Morphing pairs up boundary quads, so the resolution must be even.
    /// Every grid vertex must also be addressable by a `u32` index.
    pub fn with_resolution(resolution: u32) -> Result<Self> {
        let addressable = (resolution as u64 + 1).pow(2) <= u32::MAX as u64 + 1;
        if resolution < 2 || resolution % 2 != 0 || !addressable {
            return Err(TerrainError::InvalidResolution {
                requested: resolution,
            });
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn build(&self, height_field: &HeightField) -> TerrainMesh {
        let resolution = self.resolution;
        let side = resolution + 1;
        let heights = sample_grid(resolution, height_field);

        let mut positions = Vec::with_capacity(heights.len());
        let mut uvs = Vec::with_capacity(heights.len());
        for z in 0..side {
            for x in 0..side {
                let u = x as f32 / resolution as f32;
                let v = z as f32 / resolution as f32;
                let y = heights[(z * side + x) as usize];
                positions.push([u * 2.0 - 1.0, y, v * 2.0 - 1.0]);
                uvs.push([u, v]);
            }
        }
        let normals = grid_normals(resolution, &heights);
        let lod_buffers = (0..=max_lod_level(resolution))
            .map(|level| {
                std::array::from_fn(|i| {
                    build_indices(resolution, 1 << level, MorphDirection::ALL[i].sides())
                })
            })
            .collect();

        let mesh = TerrainMesh {
            resolution,
            positions,
            normals,
            uvs,
            lod_buffers,
        };
        debug!(
            resolution,
            lod_levels = mesh.max_lod_level() + 1,
            vertices = mesh.vertex_count(),
            full_triangles = mesh.triangle_count(MorphDirection::Full),
            "built terrain render mesh"
        );
        mesh
    }
}

/// Level `n` tessellates `2^(n + 1)`-quad blocks, so it needs the resolution
/// to divide by that block size.
fn max_lod_level(resolution: u32) -> u32 {
    resolution.trailing_zeros() - 1
}

fn sample_grid(resolution: u32, height_field: &HeightField) -> Vec<f32> {
    let side = resolution + 1;
    let mut heights = Vec::with_capacity((side * side) as usize);
    for z in 0..side {
        for x in 0..side {
            heights.push(height_field.height_at(
                x as f32 / resolution as f32,
                z as f32 / resolution as f32,
            ));
        }
    }
    heights
}

fn grid_normals(resolution: u32, heights: &[f32]) -> Vec<[f32; 3]> {
    let side = resolution + 1;
    // Grid spacing in the [-1, 1] footprint.
    let step = 2.0 / resolution as f32;
    let at = |x: u32, z: u32| heights[(z * side + x) as usize];

    let mut normals = Vec::with_capacity(heights.len());
    for z in 0..side {
        for x in 0..side {
            let (x0, x1) = (x.saturating_sub(1), (x + 1).min(resolution));
            let (z0, z1) = (z.saturating_sub(1), (z + 1).min(resolution));
            let dx = (at(x1, z) - at(x0, z)) / ((x1 - x0) as f32 * step);
            let dz = (at(x, z1) - at(x, z0)) / ((z1 - z0) as f32 * step);
            normals.push(Vec3::new(-dx, 1.0, -dz).normalize().to_array());
        }
    }
    normals
}

/// Tessellates the grid as blocks of 2x2 cells of `step` quads each, fanned
/// around their centre vertex. A stepped side replaces the block's two outer
/// triangles on that side with one, dropping the mid-edge vertex. Ring order
/// keeps every triangle facing +Y.
fn build_indices(resolution: u32, step: u32, sides: MorphSides) -> Vec<u32> {
    let stride = resolution + 1;
    let idx = |x: u32, z: u32| z * stride + x;
    let blocks = resolution / (2 * step);
    let mut indices = Vec::with_capacity(blocks as usize * blocks as usize * 24);

    for bz in 0..blocks {
        for bx in 0..blocks {
            let (x, z) = (bx * 2 * step, bz * 2 * step);
            let (mid, far) = (step, 2 * step);
            let center = idx(x + mid, z + mid);
            let ring = [
                idx(x, z),
                idx(x + mid, z),
                idx(x + far, z),
                idx(x + far, z + mid),
                idx(x + far, z + far),
                idx(x + mid, z + far),
                idx(x, z + far),
                idx(x, z + mid),
            ];
            // Ring sides in order: top, right, bottom, left.
            let stepped = [
                sides.top && bz == 0,
                sides.right && bx == blocks - 1,
                sides.bottom && bz == blocks - 1,
                sides.left && bx == 0,
            ];
            for (side, &step_down) in stepped.iter().enumerate() {
                let a = ring[side * 2];
                let mid = ring[side * 2 + 1];
                let b = ring[(side * 2 + 2) % 8];
                if step_down {
                    indices.extend_from_slice(&[a, center, b]);
                } else {
                    indices.extend_from_slice(&[a, center, mid, mid, center, b]);
                }
            }
        }
    }
    indices
}
