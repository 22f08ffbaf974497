//! Find every region of an image that looks like a selected patch.
//!
//! The patch is scored against every placement with a sum-of-squared
//! differences surface ([`score`]), placements below a threshold become
//! candidates ([`extract`]), overlapping candidates collapse into single
//! matches ([`merge`]) and the matches can be recolored ([`composite`]).
//! [`Pipeline`] wires the stages together and [`Session`] drives them from
//! interactive selection events.

pub mod composite;
pub mod convert;
pub mod error;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod scale;
pub mod score;
pub mod session;
pub mod types;

pub use composite::composite;
pub use error::{MatchError, MatchResult};
pub use extract::extract;
pub use merge::{iou, merge};
pub use pipeline::{
    Detection, MergeConfig, Pipeline, PipelineBuilder, PipelineConfig, RecolorConfig,
};
pub use scale::DisplayScale;
pub use score::{score, DissimilaritySurface, Extremes};
pub use session::{DetectionRequest, Session, SessionEvent, SessionState};
pub use types::{BoxSize, Color, Match, MatchCandidate, Opacity, Point, Rect};
