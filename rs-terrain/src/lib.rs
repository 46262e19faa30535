use bevy::prelude::*;
use bevy::render::view::{InheritedVisibility, ViewVisibility, Visibility};
use tracing::{debug, warn};

mod async_collision;
mod cache;
mod collision;
mod components;
mod error;
mod height_field;
pub mod lod;
mod render_mesh;
mod settings;
mod texture_pack;

pub use async_collision::{CollisionAsyncResources, CollisionInFlight, CollisionJob, CollisionResult};
pub use cache::{TerrainMeshCache, TerrainMeshSource};
pub use collision::{CollisionMesh, CollisionMeshBuilder};
pub use components::{TerrainCollider, TerrainLod, TerrainTile, TerrainTileMesh, TerrainViewer};
pub use error::{Result, TerrainError};
pub use height_field::{CHANNEL_STRIDE, HeightField};
pub use render_mesh::{
    GRID_RESOLUTION, MeshData, MorphDirection, MorphSides, TerrainMesh, TerrainMeshBuilder,
    build_mesh_from_data,
};
pub use settings::TerrainSettings;
pub use texture_pack::{BlendChannel, TerrainTexturePack, default_terrain_material};

#[derive(Default)]
pub struct TerrainPlugin {
    pub settings: Option<TerrainSettings>,
}

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        match &self.settings {
            Some(settings) => {
                app.insert_resource(settings.clone());
            }
            None => {
                app.init_resource::<TerrainSettings>();
            }
        }
        app.init_resource::<TerrainMeshCache>()
            .init_resource::<CollisionAsyncResources>()
            .init_resource::<CollisionInFlight>()
            .add_systems(
                Update,
                (refresh_changed_tiles, spawn_tile_meshes, lod::update_tile_lods).chain(),
            )
            .add_systems(PostUpdate, apply_collision_results);
    }
}

/// Builds the render child and requests collision for new tiles. Only the
/// pack's `base` material is applied here. Blending the red, green and blue
/// layers through `blend_map` belongs to a custom shading stage.
fn spawn_tile_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<TerrainSettings>,
    cache: Res<TerrainMeshCache>,
    async_collision: Res<CollisionAsyncResources>,
    mut in_flight: ResMut<CollisionInFlight>,
    tiles: Query<(Entity, &TerrainTile, Option<&TerrainTexturePack>), Added<TerrainTile>>,
) {
    for (entity, tile, pack) in &tiles {
        let shared = cache.get_or_build(&tile.height_field);
        let lod = TerrainLod::default();
        let handle = meshes.add(shared.tile_mesh(&tile.height_field, lod.level, lod.morph));
        let material = materials.add(
            pack.map(|pack| pack.base.clone())
                .unwrap_or_else(default_terrain_material),
        );

        let child = commands
            .spawn((
                Mesh3d(handle.clone()),
                MeshMaterial3d(material),
                tile.render_transform(),
                GlobalTransform::default(),
                Visibility::Inherited,
                InheritedVisibility::default(),
                ViewVisibility::default(),
            ))
            .id();
        commands
            .entity(entity)
            .insert((
                Transform::from_translation(tile.origin()),
                GlobalTransform::default(),
                Visibility::Visible,
                InheritedVisibility::default(),
                ViewVisibility::default(),
                TerrainTileMesh(handle),
                lod,
            ))
            .add_child(child);

        request_collision(
            &mut commands,
            &settings,
            &async_collision,
            &mut in_flight,
            entity,
            tile,
        );
    }
}

/// Re-samples render heights and rebuilds collision for tiles whose field or
/// collision resolution changed after they were spawned.
fn refresh_changed_tiles(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    settings: Res<TerrainSettings>,
    cache: Res<TerrainMeshCache>,
    async_collision: Res<CollisionAsyncResources>,
    mut in_flight: ResMut<CollisionInFlight>,
    tiles: Query<(Entity, Ref<TerrainTile>, &TerrainLod, &TerrainTileMesh), Changed<TerrainTile>>,
) {
    let Some(shared) = cache.get() else {
        return;
    };
    for (entity, tile, lod, tile_mesh) in &tiles {
        if tile.is_added() {
            continue;
        }
        if let Some(mesh) = meshes.get_mut(&tile_mesh.0) {
            *mesh = shared.tile_mesh(&tile.height_field, lod.level, lod.morph);
        }
        debug!(?entity, coords = ?tile.coords, "refreshing changed terrain tile");
        request_collision(
            &mut commands,
            &settings,
            &async_collision,
            &mut in_flight,
            entity,
            &tile,
        );
    }
}

fn request_collision(
    commands: &mut Commands,
    settings: &TerrainSettings,
    async_collision: &CollisionAsyncResources,
    in_flight: &mut CollisionInFlight,
    entity: Entity,
    tile: &TerrainTile,
) {
    if !settings.async_collision {
        attach_collider(commands, CollisionJob::for_tile(entity, tile).build());
        return;
    }
    if in_flight.tiles.contains(&entity) {
        in_flight.stale.insert(entity);
        return;
    }
    if async_collision
        .job_tx
        .send(CollisionJob::for_tile(entity, tile))
        .is_ok()
    {
        in_flight.tiles.insert(entity);
    } else {
        warn!(?entity, "terrain collision worker is gone");
    }
}

fn apply_collision_results(
    mut commands: Commands,
    async_collision: Res<CollisionAsyncResources>,
    mut in_flight: ResMut<CollisionInFlight>,
    tiles: Query<&TerrainTile>,
) {
    let mut receiver = async_collision
        .result_rx
        .lock()
        .expect("collision result receiver lock poisoned");

    let mut applied = 0usize;
    while let Ok(result) = receiver.try_recv() {
        let entity = result.entity;
        in_flight.tiles.remove(&entity);
        if in_flight.stale.remove(&entity) {
            if let Ok(tile) = tiles.get(entity) {
                if async_collision
                    .job_tx
                    .send(CollisionJob::for_tile(entity, tile))
                    .is_ok()
                {
                    in_flight.tiles.insert(entity);
                }
            }
            continue;
        }
        debug!(?entity, build_ms = result.build_ms, "terrain collision ready");
        attach_collider(&mut commands, result);
        applied += 1;
    }
    if applied > 0 {
        debug!(applied, in_flight = in_flight.tiles.len(), "applied terrain colliders");
    }
}

fn attach_collider(commands: &mut Commands, result: CollisionResult) {
    let mesh = match result.mesh {
        Ok(mesh) => mesh,
        Err(err) => {
            warn!(entity = ?result.entity, "terrain collision build failed: {err}");
            return;
        }
    };
    let Ok(mut entity) = commands.get_entity(result.entity) else {
        return;
    };
    #[cfg(feature = "avian")]
    entity.try_insert((avian3d::prelude::RigidBody::Static, mesh.to_collider()));
    entity.try_insert(TerrainCollider(mesh));
}
