use image::RgbaImage;
use log::debug;

use crate::error::{MatchError, MatchResult};
use crate::types::{BoxSize, Color, Match, Opacity};

/// Blends `color` into the window of every match over a copy of `source`.
///
/// Each window spans `size.width + 1` by `size.height + 1` pixels, edges
/// included. A match whose `size` box does not lie inside the image is
/// rejected; the extra edge row or column is skipped where it would fall
/// outside.
pub fn composite(
    source: &RgbaImage,
    matches: &[Match],
    size: BoxSize,
    color: Color,
    opacity: Opacity,
) -> MatchResult<RgbaImage> {
    let (image_width, image_height) = source.dimensions();
    for m in matches {
        let fits = m.x as u64 + size.width as u64 <= image_width as u64
            && m.y as u64 + size.height as u64 <= image_height as u64;
        if !fits {
            return Err(MatchError::MatchOutOfBounds {
                x: m.x,
                y: m.y,
                width: size.width,
                height: size.height,
                image_width,
                image_height,
            });
        }
    }

    let mut output = source.clone();
    let channels = color.channels();
    let alpha = opacity.value();
    for m in matches {
        for row in m.y..=m.y + size.height {
            for col in m.x..=m.x + size.width {
                let Some(pixel) = output.get_pixel_mut_checked(col, row) else {
                    continue;
                };
                for (value, &target) in pixel.0.iter_mut().zip(channels.iter()) {
                    *value = blend(*value, target, alpha);
                }
            }
        }
    }

    debug!(
        "recolored {} windows with {} at opacity {}",
        matches.len(),
        color,
        alpha
    );
    Ok(output)
}

fn blend(original: u8, target: u8, alpha: f64) -> u8 {
    (original as f64 * (1.0 - alpha) + target as f64 * alpha).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source() -> RgbaImage {
        RgbaImage::from_fn(16, 12, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 100, 200]))
    }

    const SIZE: BoxSize = BoxSize {
        width: 4,
        height: 3,
    };

    #[test]
    fn test_zero_opacity_is_identity() {
        let source = source();
        let output = composite(
            &source,
            &[Match::new(2, 2), Match::new(6, 5)],
            SIZE,
            Color::rgb(0, 255, 0),
            Opacity::TRANSPARENT,
        )
        .unwrap();
        assert_eq!(output, source);
    }

    #[test]
    fn test_full_opacity_paints_inclusive_window() {
        let source = source();
        let color = Color::rgb(1, 2, 3);
        let output = composite(&source, &[Match::new(2, 3)], SIZE, color, Opacity::OPAQUE).unwrap();

        for (x, y, pixel) in output.enumerate_pixels() {
            let inside = (2..=6).contains(&x) && (3..=6).contains(&y);
            if inside {
                assert_eq!(pixel, &Rgba([1, 2, 3, 255]), "({x}, {y})");
            } else {
                assert_eq!(pixel, source.get_pixel(x, y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_blend_floors() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([101, 0, 255, 255]));
        let output = composite(
            &source,
            &[Match::new(0, 0)],
            BoxSize::new(1, 1),
            Color::rgb(0, 255, 0),
            Opacity::from_percent(50).unwrap(),
        )
        .unwrap();
        assert_eq!(output.get_pixel(0, 0), &Rgba([50, 127, 127, 255]));
        assert_eq!(output.get_pixel(1, 1), &Rgba([50, 127, 127, 255]));
        assert_eq!(output.get_pixel(2, 2), &Rgba([101, 0, 255, 255]));
    }

    #[test]
    fn test_window_touching_edge_is_clipped() {
        let source = source();
        let edge = Match::new(16 - SIZE.width, 12 - SIZE.height);
        let output = composite(
            &source,
            &[edge],
            SIZE,
            Color::rgb(9, 9, 9),
            Opacity::OPAQUE,
        )
        .unwrap();
        assert_eq!(output.get_pixel(15, 11), &Rgba([9, 9, 9, 255]));
        assert_eq!(output.get_pixel(11, 8), source.get_pixel(11, 8));
    }

    #[test]
    fn test_out_of_bounds_match_is_rejected() {
        let source = source();
        let err = composite(
            &source,
            &[Match::new(0, 0), Match::new(13, 0)],
            SIZE,
            Color::default(),
            Opacity::OPAQUE,
        )
        .unwrap_err();
        assert_eq!(
            err,
            MatchError::MatchOutOfBounds {
                x: 13,
                y: 0,
                width: 4,
                height: 3,
                image_width: 16,
                image_height: 12,
            }
        );
    }

    #[test]
    fn test_no_matches_copies_source() {
        let source = source();
        let output = composite(&source, &[], SIZE, Color::default(), Opacity::OPAQUE).unwrap();
        assert_eq!(output, source);
    }
}
