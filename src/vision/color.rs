//! Color band masking and lane cropping

use image::{GenericImageView, GrayImage, ImageBuffer, Luma, Pixel, RgbImage};

use crate::config::{ColorInterval, Region};
use crate::Result;

/// Mask that keeps everything *except* the color band
///
/// Pixels inside `interval` (inclusive on every channel) become 0, all
/// others 255.
pub fn mask_out_range(frame: &RgbImage, interval: &ColorInterval) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if interval.contains(&frame.get_pixel(x, y).0) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Copy `region` out of `image`
pub fn crop_region<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    region: &Region,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
{
    region.check_within(image.width(), image.height())?;
    Ok(image
        .view(region.x, region.y, region.width, region.height)
        .to_image())
}

/// Crop the left and right lane windows from a mask
pub fn lane_crops(
    mask: &GrayImage,
    left: &Region,
    right: &Region,
) -> Result<(GrayImage, GrayImage)> {
    Ok((crop_region(mask, left)?, crop_region(mask, right)?))
}

/// Place `right` next to `left`
///
/// The taller image sets the height; the shorter one is padded below with
/// zero pixels.
pub fn hconcat<P>(
    left: &ImageBuffer<P, Vec<P::Subpixel>>,
    right: &ImageBuffer<P, Vec<P::Subpixel>>,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let mut joined = ImageBuffer::new(
        left.width() + right.width(),
        left.height().max(right.height()),
    );
    image::imageops::replace(&mut joined, left, 0, 0);
    image::imageops::replace(&mut joined, right, left.width() as i64, 0);
    joined
}
