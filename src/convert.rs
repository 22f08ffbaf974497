use image::{GrayImage, Luma, RgbaImage};
use ndarray as nd;

use crate::error::{MatchError, MatchResult};
use crate::score::DissimilaritySurface;
use crate::types::Rect;

/// Lays an RGBA image out as a `(height, width, 4)` array of channel values.
pub fn rgba_to_array3(image: &RgbaImage) -> nd::Array3<i32> {
    let (width, height) = image.dimensions();
    nd::Array3::from_shape_fn((height as usize, width as usize, 4), |(y, x, c)| {
        image.get_pixel(x as u32, y as u32)[c] as i32
    })
}

/// Renders a surface as an 8-bit heatmap, black being a perfect match.
pub fn surface_to_luma(surface: &DissimilaritySurface) -> GrayImage {
    let values = surface.values();
    GrayImage::from_fn(surface.width(), surface.height(), |x, y| {
        let value = values[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(value * 255.0).round() as u8])
    })
}

/// Copies a sub-rectangle out of `image`. The rectangle is clipped to the
/// image; an empty result is an error.
pub fn crop_template(image: &RgbaImage, rect: Rect) -> MatchResult<RgbaImage> {
    let (width, height) = image.dimensions();
    let x = rect.x.min(width);
    let y = rect.y.min(height);
    let w = rect.width.min(width - x);
    let h = rect.height.min(height - y);
    if w == 0 || h == 0 {
        return Err(MatchError::EmptyTemplate {
            width: w,
            height: h,
        });
    }
    Ok(image::imageops::crop_imm(image, x, y, w, h).to_image())
}
