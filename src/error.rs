use thiserror::Error;

/// A specialized `Result` type for the matching stages.
pub type MatchResult<T> = Result<T, MatchError>;

/// The error type for scoring, merging and compositing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("template image is empty ({width}x{height})")]
    EmptyTemplate { width: u32, height: u32 },

    #[error("threshold must be a finite number, got {0}")]
    InvalidThreshold(f64),

    #[error("opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f64),

    #[error("opacity percentage must be within [0, 100], got {0}")]
    InvalidOpacityPercent(u32),

    #[error("malformed color {0:?}, expected #RRGGBB")]
    MalformedColor(String),

    #[error(
        "match box at ({x}, {y}) of size {width}x{height} exceeds image bounds {image_width}x{image_height}"
    )]
    MatchOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}
