use thiserror::Error;

pub type Result<T> = std::result::Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid mesh resolution: {requested} quads per side")]
    InvalidResolution { requested: u32 },

    #[error(
        "malformed height field {width}x{height}: {len} sample bytes, at least {required} required"
    )]
    MalformedHeightField {
        width: u32,
        height: u32,
        len: usize,
        required: usize,
    },

    #[error("failed to read terrain settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse terrain settings: {0}")]
    Config(#[from] toml::de::Error),
}
