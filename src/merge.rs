use log::debug;

use crate::error::{MatchError, MatchResult};
use crate::types::{BoxSize, Match, MatchCandidate, Point};

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.7;

/// Intersection over union of two boxes that share `size` and differ only in
/// placement.
///
/// The union is taken as `2 * area - intersection`, which only holds for
/// equal-sized boxes. Do not reuse this for boxes of different sizes.
pub fn iou(a: Point, b: Point, size: BoxSize) -> f64 {
    let (w, h) = (size.width as i64, size.height as i64);
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (bx, by) = (b.x as i64, b.y as i64);

    let x = ax.max(bx);
    let y = ay.max(by);
    let xx = (ax + w).min(bx + w);
    let yy = (ay + h).min(by + h);

    let intersection = ((xx - x).max(0) * (yy - y).max(0)) as f64;
    let area = (w * h) as f64;
    if area == 0.0 {
        return 0.0;
    }
    intersection / (2.0 * area - intersection)
}

/// Greedily clusters candidates whose boxes overlap by more than
/// `iou_threshold` and returns one floored-mean location per cluster.
///
/// Each candidate joins the first group (in creation order) holding any
/// member it overlaps, so the result depends on input order.
pub fn merge(
    candidates: &[MatchCandidate],
    size: BoxSize,
    iou_threshold: f64,
) -> MatchResult<Vec<Match>> {
    if !(0.0..=1.0).contains(&iou_threshold) {
        return Err(MatchError::InvalidThreshold(iou_threshold));
    }

    let mut groups: Vec<Vec<MatchCandidate>> = Vec::new();
    for &candidate in candidates {
        let group = groups.iter_mut().find(|group| {
            group
                .iter()
                .any(|&member| iou(candidate, member, size) > iou_threshold)
        });
        match group {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    let merged = groups.iter().map(|group| centroid(group)).collect::<Vec<_>>();
    debug!(
        "merged {} candidates into {} matches",
        candidates.len(),
        merged.len()
    );
    Ok(merged)
}

fn centroid(group: &[MatchCandidate]) -> Match {
    let len = group.len() as u64;
    let (sum_x, sum_y) = group.iter().fold((0u64, 0u64), |(sx, sy), p| {
        (sx + p.x as u64, sy + p.y as u64)
    });
    Match::new((sum_x / len) as u32, (sum_y / len) as u32)
}
