//! Needle-in-haystack template matching
//!
//! Scores every aligned window of the haystack with a normalized squared
//! difference (0 = identical, lower is better) and keeps each position whose
//! score is at or below the threshold.

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::integral_image::{integral_squared_image, sum_image_pixels};
use imageproc::template_matching::{
    find_extremes, match_template, Extremes, MatchTemplateMethod,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Result, SurfError};

/// Per-position dissimilarity scores, one per needle placement
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Top-left corner of a needle placement that matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub x: u32,
    pub y: u32,
}

/// Scoring variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Squared differences summed over all three channels
    #[default]
    ColorSquaredDiffNormed,
    /// Squared differences on grayscale copies of both images
    LumaSquaredDiffNormed,
}

/// Fail unless the needle is non-empty and strictly smaller than the haystack
fn check_sizes(haystack: (u32, u32), needle: (u32, u32)) -> Result<()> {
    let (hw, hh) = haystack;
    let (nw, nh) = needle;
    if nw == 0 || nh == 0 || nw >= hw || nh >= hh {
        return Err(SurfError::NeedleTooLarge {
            needle_width: nw,
            needle_height: nh,
            haystack_width: hw,
            haystack_height: hh,
        });
    }
    Ok(())
}

fn channel(image: &RgbImage, c: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[c]])
    })
}

/// Multi-channel normalized squared difference
///
/// `score = sum((I - T)^2) / sqrt(sum(I^2) * sum(T^2))` over the window and
/// all channels. Scores that would reach 1 or more, including windows where
/// the denominator is zero, are reported as exactly 1.
fn color_scores(haystack: &RgbImage, needle: &RgbImage) -> ScoreMap {
    let (nw, nh) = needle.dimensions();
    let out_w = haystack.width() - nw + 1;
    let out_h = haystack.height() - nh + 1;

    let mut squared_diff = vec![0f64; (out_w * out_h) as usize];
    for c in 0..3 {
        let scores = match_template(
            &channel(haystack, c),
            &channel(needle, c),
            MatchTemplateMethod::SumOfSquaredErrors,
        );
        for (acc, score) in squared_diff.iter_mut().zip(scores.pixels()) {
            *acc += score.0[0] as f64;
        }
    }

    let needle_norm: f64 = needle
        .pixels()
        .flat_map(|p| p.0)
        .map(|v| (v as f64) * (v as f64))
        .sum();
    let window_norms = integral_squared_image::<Rgb<u8>, u64>(haystack);

    ScoreMap::from_fn(out_w, out_h, |x, y| {
        let window_norm: u64 = sum_image_pixels(&window_norms, x, y, x + nw - 1, y + nh - 1)
            .into_iter()
            .sum();
        let denominator = (window_norm as f64 * needle_norm).sqrt();
        let numerator = squared_diff[(y * out_w + x) as usize];
        let score = if numerator < denominator {
            numerator / denominator
        } else {
            1.0
        };
        Luma([score as f32])
    })
}

/// Score every needle placement in the haystack
pub fn score_map(haystack: &RgbImage, needle: &RgbImage, method: MatchMethod) -> Result<ScoreMap> {
    check_sizes(haystack.dimensions(), needle.dimensions())?;
    let scores = match method {
        MatchMethod::ColorSquaredDiffNormed => color_scores(haystack, needle),
        MatchMethod::LumaSquaredDiffNormed => match_template(
            &image::imageops::grayscale(haystack),
            &image::imageops::grayscale(needle),
            MatchTemplateMethod::SumOfSquaredErrorsNormalized,
        ),
    };
    Ok(scores)
}

/// Positions scoring at or below `threshold`, row-major, duplicates kept
pub fn matches_below(scores: &ScoreMap, threshold: f32) -> Vec<Match> {
    scores
        .enumerate_pixels()
        .filter(|(_, _, score)| score.0[0] <= threshold)
        .map(|(x, y, _)| Match { x, y })
        .collect()
}

/// Every position where `needle` matches `haystack` within `threshold`
pub fn find_matches(haystack: &RgbImage, needle: &RgbImage, threshold: f32) -> Result<Vec<Match>> {
    let scores = score_map(haystack, needle, MatchMethod::default())?;
    Ok(matches_below(&scores, threshold))
}

/// Whether at least one position matches
pub fn match_exists(haystack: &RgbImage, needle: &RgbImage, threshold: f32) -> Result<bool> {
    Ok(!find_matches(haystack, needle, threshold)?.is_empty())
}

/// A needle loaded once and matched against many frames
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    needle: RgbImage,
    threshold: f32,
    method: MatchMethod,
}

impl TemplateMatcher {
    pub fn new(needle: RgbImage, threshold: f32) -> Self {
        Self {
            needle,
            threshold,
            method: MatchMethod::default(),
        }
    }

    /// Read the needle from an image file; alpha is dropped, channels become RGB
    pub fn load(path: impl AsRef<Path>, threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let needle = image::open(path)?.to_rgb8();
        log::info!(
            "Loaded needle {} ({}x{})",
            path.display(),
            needle.width(),
            needle.height()
        );
        Ok(Self::new(needle, threshold))
    }

    pub fn with_method(mut self, method: MatchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn needle(&self) -> &RgbImage {
        &self.needle
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    pub fn find_matches(&self, haystack: &RgbImage) -> Result<Vec<Match>> {
        let scores = score_map(haystack, &self.needle, self.method)?;
        Ok(matches_below(&scores, self.threshold))
    }

    pub fn match_exists(&self, haystack: &RgbImage) -> Result<bool> {
        Ok(!self.find_matches(haystack)?.is_empty())
    }

    /// Lowest score in the haystack and where it occurs
    pub fn best_score(&self, haystack: &RgbImage) -> Result<(f32, Match)> {
        let scores = score_map(haystack, &self.needle, self.method)?;
        let Extremes {
            min_value,
            min_value_location,
            ..
        } = find_extremes(&scores);
        Ok((
            min_value,
            Match {
                x: min_value_location.0,
                y: min_value_location.1,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Flat haystack with a textured needle pasted at (x, y)
    fn scene(x: u32, y: u32) -> (RgbImage, RgbImage) {
        let needle = RgbImage::from_fn(4, 3, |i, j| {
            Rgb([40 + 50 * i as u8, 200 - 60 * j as u8, 90])
        });
        let mut haystack = RgbImage::from_pixel(20, 15, Rgb([100, 120, 90]));
        image::imageops::replace(&mut haystack, &needle, x as i64, y as i64);
        (haystack, needle)
    }

    #[test]
    fn test_exact_placement_found() {
        let (haystack, needle) = scene(7, 5);
        let matches = find_matches(&haystack, &needle, 0.01).unwrap();
        assert!(matches.contains(&Match { x: 7, y: 5 }));
        assert_eq!(matches.len(), 1);
        assert!(match_exists(&haystack, &needle, 0.01).unwrap());
    }

    #[test]
    fn test_perfect_match_scores_zero() {
        let (haystack, needle) = scene(3, 2);
        let scores = score_map(&haystack, &needle, MatchMethod::ColorSquaredDiffNormed).unwrap();
        assert_eq!(scores.dimensions(), (17, 13));
        assert!(scores.get_pixel(3, 2).0[0].abs() < 1e-6);
        assert!(scores.get_pixel(0, 0).0[0] > 0.1);
    }

    #[test]
    fn test_stricter_threshold_is_subset() {
        let (haystack, needle) = scene(9, 4);
        let loose: HashSet<Match> = find_matches(&haystack, &needle, 0.6)
            .unwrap()
            .into_iter()
            .collect();
        let strict = find_matches(&haystack, &needle, 0.05).unwrap();
        assert!(loose.len() > strict.len());
        assert!(strict.iter().all(|m| loose.contains(m)));
    }

    #[test]
    fn test_matches_are_row_major() {
        let (haystack, needle) = scene(0, 0);
        let matches = find_matches(&haystack, &needle, 1.0).unwrap();
        assert_eq!(matches.len(), 17 * 13);
        assert_eq!(matches[0], Match { x: 0, y: 0 });
        assert_eq!(matches[1], Match { x: 1, y: 0 });
        assert_eq!(matches[17], Match { x: 0, y: 1 });
    }

    #[test]
    fn test_no_match_on_blank_haystack() {
        let needle = RgbImage::from_pixel(3, 3, Rgb([200, 30, 30]));
        let haystack = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        assert!(!match_exists(&haystack, &needle, 0.5).unwrap());
    }

    #[test]
    fn test_needle_must_be_strictly_smaller() {
        let needle = RgbImage::new(5, 3);
        let haystack = RgbImage::new(5, 10);
        let err = find_matches(&haystack, &needle, 0.1).unwrap_err();
        assert!(matches!(err, SurfError::NeedleTooLarge { .. }));
        assert!(find_matches(&haystack, &RgbImage::new(0, 2), 0.1).is_err());
    }

    #[test]
    fn test_luma_method_finds_placement() {
        let (haystack, needle) = scene(11, 8);
        let matcher = TemplateMatcher::new(needle, 0.01).with_method(MatchMethod::LumaSquaredDiffNormed);
        assert!(matcher.find_matches(&haystack).unwrap().contains(&Match { x: 11, y: 8 }));
    }

    #[test]
    fn test_best_score_location() {
        let (haystack, needle) = scene(12, 1);
        let matcher = TemplateMatcher::new(needle, 0.025);
        let (score, at) = matcher.best_score(&haystack).unwrap();
        assert!(score < 1e-6);
        assert_eq!(at, Match { x: 12, y: 1 });
        assert!(matcher.match_exists(&haystack).unwrap());
    }

    #[test]
    fn test_method_config_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            method: MatchMethod,
        }
        let wrapper: Wrapper = toml::from_str(r#"method = "luma_squared_diff_normed""#).unwrap();
        assert_eq!(wrapper.method, MatchMethod::LumaSquaredDiffNormed);
    }
}
