//! Scalar lane signal from a masked crop

use image::GrayImage;

/// Row-weighted pixel sum of a crop
///
/// Row `r` of an `H`-row crop is weighted `H - 1 - r`: the top row counts
/// `H - 1` times and the bottom row not at all. The sum is scaled by
/// `100 / (H * W)` and truncated toward zero.
pub fn weighted_sum(region: &GrayImage) -> i64 {
    let (width, height) = region.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let mut total: u64 = 0;
    for (y, row) in region.rows().enumerate() {
        let weight = (height as u64 - 1) - y as u64;
        let row_sum: u64 = row.map(|p| p.0[0] as u64).sum();
        total += row_sum * weight;
    }

    (100.0 * total as f64 / (height as f64 * width as f64)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_zero_region() {
        assert_eq!(weighted_sum(&GrayImage::new(7, 5)), 0);
    }

    #[test]
    fn test_full_region_closed_form() {
        // 100 * 255 * (3 + 2 + 1 + 0) * 10 / (4 * 10) = 38250
        let region = GrayImage::from_pixel(10, 4, Luma([255]));
        let expected = (100 * 255 * (0..4).map(|r| 4 - 1 - r).sum::<u64>() * 10) / (4 * 10);
        assert_eq!(weighted_sum(&region), expected as i64);
        assert_eq!(weighted_sum(&region), 38250);
    }

    #[test]
    fn test_top_rows_weigh_more() {
        let mut top = GrayImage::new(4, 6);
        let mut lower = GrayImage::new(4, 6);
        for x in 0..4 {
            top.put_pixel(x, 0, Luma([255]));
            lower.put_pixel(x, 4, Luma([255]));
        }
        // weights 5 and 1
        assert_eq!(weighted_sum(&top), 100 * 255 * 5 * 4 / 24);
        assert_eq!(weighted_sum(&lower), 100 * 255 * 4 / 24);
        assert!(weighted_sum(&top) > weighted_sum(&lower));
    }

    #[test]
    fn test_bottom_row_has_no_weight() {
        let mut region = GrayImage::new(3, 3);
        for x in 0..3 {
            region.put_pixel(x, 2, Luma([255]));
        }
        assert_eq!(weighted_sum(&region), 0);
    }

    #[test]
    fn test_truncates() {
        // 100 * 1 * 1 / 9 = 11.11..
        let mut region = GrayImage::new(3, 3);
        region.put_pixel(0, 1, Luma([1]));
        assert_eq!(weighted_sum(&region), 11);
    }

    #[test]
    fn test_empty_region() {
        assert_eq!(weighted_sum(&GrayImage::new(0, 0)), 0);
    }
}
