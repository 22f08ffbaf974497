use image::RgbaImage;
use log::debug;
use ndarray as nd;
use rayon::prelude::*;

use crate::convert::rgba_to_array3;
use crate::error::{MatchError, MatchResult};
use crate::types::Point;

/// Normalized sum-of-squared-differences score for every placement of a
/// template inside a source image. `0.0` is the best placement, `1.0` the worst.
///
/// Indexed as `[[y, x]]`; the shape is
/// `(source_height - template_height + 1, source_width - template_width + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilaritySurface {
    values: nd::Array2<f32>,
}

/// Lowest and highest value of a surface and where they first occur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub min_value: f32,
    pub max_value: f32,
    pub min_value_location: Point,
    pub max_value_location: Point,
}

impl DissimilaritySurface {
    /// A surface with no valid placements.
    pub fn empty() -> Self {
        Self {
            values: nd::Array2::zeros((0, 0)),
        }
    }

    pub fn from_values(values: nd::Array2<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &nd::Array2<f32> {
        &self.values
    }

    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.values.get([y as usize, x as usize]).copied()
    }

    pub fn min_max_loc(&self) -> Option<Extremes> {
        let mut rows = self.values.indexed_iter();
        let ((y, x), &first) = rows.next()?;
        let start = Point::new(x as u32, y as u32);
        let mut extremes = Extremes {
            min_value: first,
            max_value: first,
            min_value_location: start,
            max_value_location: start,
        };
        for ((y, x), &value) in rows {
            if value < extremes.min_value {
                extremes.min_value = value;
                extremes.min_value_location = Point::new(x as u32, y as u32);
            }
            if value > extremes.max_value {
                extremes.max_value = value;
                extremes.max_value_location = Point::new(x as u32, y as u32);
            }
        }
        Some(extremes)
    }

    /// Top-left of the most similar placement.
    pub fn position(&self) -> Option<Point> {
        self.min_max_loc().map(|e| e.min_value_location)
    }
}

/// Slides `template` over `source` and scores every placement by the sum of
/// squared per-channel differences, min-max normalized to `[0, 1]`.
///
/// A template larger than the source in either axis has no placements and
/// yields an empty surface.
pub fn score(source: &RgbaImage, template: &RgbaImage) -> MatchResult<DissimilaritySurface> {
    let (source_width, source_height) = source.dimensions();
    let (template_width, template_height) = template.dimensions();
    if template_width == 0 || template_height == 0 {
        return Err(MatchError::EmptyTemplate {
            width: template_width,
            height: template_height,
        });
    }

    if template_width > source_width || template_height > source_height {
        debug!(
            "template {}x{} does not fit in source {}x{}",
            template_width, template_height, source_width, source_height
        );
        return Ok(DissimilaritySurface::empty());
    }

    let raw = sum_of_squared_differences(&rgba_to_array3(source), &rgba_to_array3(template));
    let values = normalize_min_max(&raw);
    debug!(
        "scored {}x{} placements of a {}x{} template",
        values.ncols(),
        values.nrows(),
        template_width,
        template_height
    );
    Ok(DissimilaritySurface { values })
}

fn sum_of_squared_differences(
    source: &nd::Array3<i32>,
    template: &nd::Array3<i32>,
) -> nd::Array2<u64> {
    let (source_height, source_width, _) = source.dim();
    let (template_height, template_width, _) = template.dim();
    let rows = source_height - template_height + 1;
    let cols = source_width - template_width + 1;

    let mut raw = nd::Array2::<u64>::zeros((rows, cols));
    raw.axis_iter_mut(nd::Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let window =
                    source.slice(nd::s![y..y + template_height, x..x + template_width, ..]);
                *out = window
                    .iter()
                    .zip(template.iter())
                    .map(|(&s, &t)| {
                        let diff = (s - t) as i64;
                        (diff * diff) as u64
                    })
                    .sum();
            }
        });
    raw
}

/// Constant input maps to all zeros.
fn normalize_min_max(raw: &nd::Array2<u64>) -> nd::Array2<f32> {
    let (min, max) = raw
        .iter()
        .fold((u64::MAX, u64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if raw.is_empty() || min == max {
        return nd::Array2::zeros(raw.raw_dim());
    }

    debug!("raw ssd range: {}..={}", min, max);
    let range = (max - min) as f64;
    raw.mapv(|v| ((v - min) as f64 / range) as f32)
}
