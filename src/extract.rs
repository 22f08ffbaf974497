use log::debug;

use crate::error::{MatchError, MatchResult};
use crate::score::DissimilaritySurface;
use crate::types::MatchCandidate;

pub const DEFAULT_THRESHOLD: f32 = 0.08;

/// Collects every placement scoring strictly below `threshold`, in row-major
/// order.
pub fn extract(surface: &DissimilaritySurface, threshold: f32) -> MatchResult<Vec<MatchCandidate>> {
    if !threshold.is_finite() {
        return Err(MatchError::InvalidThreshold(threshold as f64));
    }

    let candidates = surface
        .values()
        .indexed_iter()
        .filter(|&(_, &value)| value < threshold)
        .map(|((y, x), _)| MatchCandidate::new(x as u32, y as u32))
        .collect::<Vec<_>>();

    debug!(
        "{} of {} placements below threshold {}",
        candidates.len(),
        surface.values().len(),
        threshold
    );
    Ok(candidates)
}
