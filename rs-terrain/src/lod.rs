use std::collections::HashMap;

use bevy::prelude::*;
use tracing::debug;

use crate::cache::TerrainMeshCache;
use crate::components::{TerrainLod, TerrainTile, TerrainTileMesh, TerrainViewer};
use crate::render_mesh::MorphDirection;
use crate::settings::TerrainSettings;

/// LOD ring of a tile: Chebyshev distance from the viewer to the tile centre
/// in units of `lod_distance`.
pub fn lod_level(tile_center: Vec3, viewer: Vec3, lod_distance: f32) -> u32 {
    let dx = (tile_center.x - viewer.x).abs();
    let dz = (tile_center.z - viewer.z).abs();
    (dx.max(dz) / lod_distance.max(f32::EPSILON)).floor() as u32
}

const NEIGHBOURS: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
];

/// Lowers levels until no tile is more than one level coarser than any of
/// its neighbours. Morph variants only bridge a single level.
pub fn smooth_levels(levels: &mut HashMap<IVec2, u32>) {
    let mut changed = true;
    while changed {
        changed = false;
        let coords: Vec<IVec2> = levels.keys().copied().collect();
        for tile in coords {
            let finest = NEIGHBOURS
                .iter()
                .filter_map(|offset| levels.get(&(tile + *offset)).copied())
                .min();
            let Some(finest) = finest else {
                continue;
            };
            if let Some(level) = levels.get_mut(&tile) {
                if *level > finest + 1 {
                    *level = finest + 1;
                    changed = true;
                }
            }
        }
    }
}

/// Variant for the tile at `coords` given every tile's level. A side steps
/// down when the neighbour there is coarser. Missing neighbours never force a
/// morph.
pub fn morph_for(coords: IVec2, levels: &HashMap<IVec2, u32>) -> MorphDirection {
    let Some(&level) = levels.get(&coords) else {
        return MorphDirection::Full;
    };
    let coarser = |offset: IVec2| {
        levels
            .get(&(coords + offset))
            .is_some_and(|&neighbour| neighbour > level)
    };
    let (top, bottom) = (coarser(NEIGHBOURS[0]), coarser(NEIGHBOURS[1]));
    let (left, right) = (coarser(NEIGHBOURS[2]), coarser(NEIGHBOURS[3]));

    MorphDirection::from_coarser_sides(top, bottom, left, right).unwrap_or_else(|| {
        debug!(?coords, "no morph variant for opposite coarser sides");
        MorphDirection::Full
    })
}

pub fn update_tile_lods(
    settings: Res<TerrainSettings>,
    cache: Res<TerrainMeshCache>,
    viewer: Query<&GlobalTransform, With<TerrainViewer>>,
    mut tiles: Query<(&TerrainTile, &mut TerrainLod, &TerrainTileMesh)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let Ok(viewer) = viewer.single() else {
        return;
    };
    let Some(shared) = cache.get() else {
        return;
    };
    let viewer_pos = viewer.translation();
    let max_level = shared.max_lod_level();

    let mut levels: HashMap<IVec2, u32> = tiles
        .iter()
        .map(|(tile, _, _)| {
            let level = lod_level(tile.center(), viewer_pos, settings.lod_distance);
            (tile.coords, level.min(max_level))
        })
        .collect();
    smooth_levels(&mut levels);

    for (tile, mut lod, tile_mesh) in &mut tiles {
        let level = levels[&tile.coords];
        let morph = morph_for(tile.coords, &levels);
        if lod.level == level && lod.morph == morph {
            continue;
        }
        if let Some(mesh) = meshes.get_mut(&tile_mesh.0) {
            shared.apply_lod(mesh, level, morph);
        }
        *lod = TerrainLod { level, morph };
    }
}
