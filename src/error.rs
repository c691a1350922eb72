use std::path::PathBuf;

use thiserror::Error;

/// Rejected simulation setup. Raised at construction time, never mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("population must contain at least one boid")]
    EmptyPopulation,

    #[error("plane bounds must be positive and finite, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("min_speed ({min_speed}) exceeds max_speed ({max_speed})")]
    SpeedRange { min_speed: f32, max_speed: f32 },

    #[error("max_bias must lie in [0, 1], got {0}")]
    MaxBias(f32),

    #[error("bias_increment ({bias_increment}) must be positive and no larger than max_bias ({max_bias})")]
    BiasIncrement { bias_increment: f32, max_bias: f32 },

    #[error("margin {margin} leaves no interior in a {width}x{height} plane")]
    MarginTooWide { margin: f32, width: f32, height: f32 },

    #[error("scout groups cover {scouts} boids but the population is {population}")]
    TooManyScouts { scouts: usize, population: usize },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure while handing a snapshot to an output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("snapshot serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}
