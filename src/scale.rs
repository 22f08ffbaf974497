use anyhow::{ensure, Result};

use crate::types::Rect;

/// Maps coordinates on a display surface to pixels of the image shown on it.
///
/// The display may stretch the image differently along each axis, so X and Y
/// are scaled independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    image_size: (u32, u32),
    display_size: (f64, f64),
}

impl DisplayScale {
    pub fn new(
        image_width: u32,
        image_height: u32,
        display_width: f64,
        display_height: f64,
    ) -> Result<Self> {
        ensure!(
            display_width.is_finite() && display_width > 0.0,
            "display width must be positive, got {display_width}"
        );
        ensure!(
            display_height.is_finite() && display_height > 0.0,
            "display height must be positive, got {display_height}"
        );
        Ok(Self {
            image_size: (image_width, image_height),
            display_size: (display_width, display_height),
        })
    }

    /// The image is shown at its native size.
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            image_size: (width, height),
            display_size: (width.max(1) as f64, height.max(1) as f64),
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    pub fn scale_x(&self) -> f64 {
        self.image_size.0 as f64 / self.display_size.0
    }

    pub fn scale_y(&self) -> f64 {
        self.image_size.1 as f64 / self.display_size.1
    }

    pub fn to_image(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_x(), y * self.scale_y())
    }

    /// The image rectangle spanned by a drag from `origin` to `current`, both
    /// in display coordinates. Truncated to whole pixels and clipped to the
    /// image.
    pub fn selection(&self, origin: (f64, f64), current: (f64, f64)) -> Rect {
        let (image_width, image_height) = self.image_size;
        let left = origin.0.min(current.0) * self.scale_x();
        let top = origin.1.min(current.1) * self.scale_y();
        let width = (origin.0 - current.0).abs() * self.scale_x();
        let height = (origin.1 - current.1).abs() * self.scale_y();

        let (x, width) = clip_span(left, width, image_width);
        let (y, height) = clip_span(top, height, image_height);
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Truncates a span to whole pixels and clips it to `[0, max]`.
fn clip_span(start: f64, len: f64, max: u32) -> (u32, u32) {
    if !start.is_finite() || !len.is_finite() {
        return (0, 0);
    }
    let max = max as f64;
    let start = start.trunc();
    let end = (start + len.trunc()).min(max);
    let start = start.clamp(0.0, max);
    if end <= start {
        return (start as u32, 0);
    }
    (start as u32, (end - start) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scale() {
        let scale = DisplayScale::new(200, 100, 100.0, 200.0).unwrap();
        assert_eq!(scale.scale_x(), 2.0);
        assert_eq!(scale.scale_y(), 0.5);
        assert_eq!(scale.to_image(10.0, 10.0), (20.0, 5.0));

        let identity = DisplayScale::identity(64, 48);
        assert_eq!(identity.scale_x(), 1.0);
        assert_eq!(identity.scale_y(), 1.0);
    }

    #[test]
    fn test_selection_normalizes_drag_direction() {
        let scale = DisplayScale::new(200, 100, 100.0, 200.0).unwrap();
        let forward = scale.selection((10.0, 20.0), (30.5, 61.0));
        let backward = scale.selection((30.5, 61.0), (10.0, 20.0));
        assert_eq!(forward, Rect::new(20, 10, 41, 20));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_selection_is_clipped() {
        let scale = DisplayScale::identity(50, 40);
        assert_eq!(
            scale.selection((45.0, 30.0), (80.0, -10.0)),
            Rect::new(45, 0, 5, 30)
        );
        assert!(scale.selection((5.0, 5.0), (5.0, 9.0)).is_empty());
    }

    #[test]
    fn test_invalid_display_size() {
        assert!(DisplayScale::new(10, 10, 0.0, 10.0).is_err());
        assert!(DisplayScale::new(10, 10, 10.0, f64::NAN).is_err());
    }
}
