use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bevy::prelude::*;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::collision::{CollisionMesh, CollisionMeshBuilder};
use crate::components::TerrainTile;
use crate::error::Result;
use crate::height_field::HeightField;

#[derive(Resource)]
pub struct CollisionAsyncResources {
    pub runtime: Arc<Runtime>,
    pub job_tx: UnboundedSender<CollisionJob>,
    pub result_rx: Mutex<UnboundedReceiver<CollisionResult>>,
}

impl FromWorld for CollisionAsyncResources {
    fn from_world(_world: &mut World) -> Self {
        Self::new()
    }
}

impl CollisionAsyncResources {
    pub fn new() -> Self {
        let runtime = Arc::new(Runtime::new().expect("Failed to create tokio runtime"));
        let (job_tx, mut job_rx) = unbounded_channel::<CollisionJob>();
        let (result_tx, result_rx) = unbounded_channel::<CollisionResult>();
        let runtime_clone = runtime.clone();

        runtime.spawn(async move {
            while let Some(job) = job_rx.recv().await {
                let result_tx = result_tx.clone();
                runtime_clone.spawn_blocking(move || {
                    let _ = result_tx.send(job.build());
                });
            }
        });

        Self {
            runtime,
            job_tx,
            result_rx: Mutex::new(result_rx),
        }
    }
}

/// Tiles with a collision job on the worker. A tile that changes while its
/// job runs is marked stale, and its result is replaced by a fresh job.
#[derive(Resource, Default)]
pub struct CollisionInFlight {
    pub tiles: HashSet<Entity>,
    pub stale: HashSet<Entity>,
}

impl CollisionInFlight {
    pub fn is_idle(&self) -> bool {
        self.tiles.is_empty()
    }
}

pub struct CollisionJob {
    pub entity: Entity,
    pub height_field: Arc<HeightField>,
    pub quads: u32,
    pub scale: f32,
}

impl CollisionJob {
    pub fn for_tile(entity: Entity, tile: &TerrainTile) -> Self {
        Self {
            entity,
            height_field: tile.height_field.clone(),
            quads: tile.collision_quads,
            scale: tile.world_scale,
        }
    }

    pub fn build(self) -> CollisionResult {
        let start = Instant::now();
        let mesh = CollisionMeshBuilder::build(&self.height_field, self.quads, self.scale);
        CollisionResult {
            entity: self.entity,
            mesh,
            build_ms: start.elapsed().as_secs_f32() * 1000.0,
        }
    }
}

pub struct CollisionResult {
    pub entity: Entity,
    pub mesh: Result<CollisionMesh>,
    pub build_ms: f32,
}
