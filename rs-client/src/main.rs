use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rs_terrain::{
    CollisionMeshBuilder, HeightField, MorphDirection, TerrainMeshBuilder, TerrainSettings,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod timing;

use timing::Stopwatch;

#[derive(Parser, Debug)]
#[command(name = "rs-client", about = "Build terrain render and collision meshes from a heightmap")]
struct Args {
    /// Heightmap image; elevation is read from the red channel.
    #[arg(long, conflicts_with = "flat")]
    heightmap: Option<PathBuf>,
    /// Use an all-zero heightfield of SIZE x SIZE pixels instead of an image.
    #[arg(long, value_name = "SIZE")]
    flat: Option<u32>,
    #[arg(long)]
    amplitude: Option<f32>,
    /// Collision quads per side.
    #[arg(long)]
    quads: Option<u32>,
    /// World-space edge length of the tile.
    #[arg(long)]
    scale: Option<f32>,
    /// TOML file with terrain settings.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .without_time()
        .compact()
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match &args.settings {
        Some(path) => TerrainSettings::load(path)?,
        None => TerrainSettings::default(),
    };
    if let Some(amplitude) = args.amplitude {
        settings.amplitude = amplitude;
    }
    if let Some(quads) = args.quads {
        settings.collision_quads_per_side = quads;
    }
    if let Some(scale) = args.scale {
        settings.world_scale = scale;
    }

    let field = load_height_field(&args, settings.amplitude)?;
    info!(
        width = field.width(),
        height = field.height(),
        amplitude = field.amplitude(),
        "heightfield ready"
    );

    let watch = Stopwatch::start("render mesh");
    let render = TerrainMeshBuilder::with_resolution(settings.render_grid_resolution)?.build(&field);
    watch.finish();
    for direction in MorphDirection::ALL {
        info!(
            ?direction,
            triangles = render.triangle_count(direction),
            "render variant"
        );
    }

    let watch = Stopwatch::start("collision mesh");
    let collision = CollisionMeshBuilder::build(
        &field,
        settings.collision_quads_per_side,
        settings.world_scale,
    )?;
    watch.finish();
    info!(
        vertices = collision.vertex_count(),
        indices = collision.index_count(),
        render_vertices = render.vertex_count(),
        "collision mesh ready"
    );
    Ok(())
}

fn load_height_field(args: &Args, amplitude: f32) -> Result<HeightField, Box<dyn std::error::Error>> {
    if let Some(path) = &args.heightmap {
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        return Ok(HeightField::new(width, height, amplitude, image.into_raw())?);
    }
    let size = args.flat.unwrap_or(64);
    Ok(HeightField::flat(size, size, amplitude)?)
}
