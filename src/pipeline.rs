use anyhow::{ensure, Result};
use image::RgbaImage;
use log::info;

use crate::composite::composite;
use crate::extract::{extract, DEFAULT_THRESHOLD};
use crate::merge::{merge, DEFAULT_IOU_THRESHOLD};
use crate::score::{score, DissimilaritySurface};
use crate::types::{BoxSize, Color, Match, MatchCandidate, Opacity};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeConfig {
    /// Candidates overlapping by more than this are merged.
    pub iou_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecolorConfig {
    pub color: Color,
    pub opacity: Opacity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Normalized dissimilarity below which a placement is a candidate.
    pub threshold: f32,
    /// `None` reports every candidate as a match.
    pub merge: Option<MergeConfig>,
    /// `None` skips compositing.
    pub recolor: Option<RecolorConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            merge: Some(MergeConfig::default()),
            recolor: Some(RecolorConfig::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn merge(mut self, config: MergeConfig) -> Self {
        self.config.merge = Some(config);
        self
    }

    pub fn iou_threshold(mut self, iou_threshold: f64) -> Self {
        self.config.merge = Some(MergeConfig { iou_threshold });
        self
    }

    pub fn no_merge(mut self) -> Self {
        self.config.merge = None;
        self
    }

    pub fn recolor(mut self, config: RecolorConfig) -> Self {
        self.config.recolor = Some(config);
        self
    }

    pub fn no_recolor(mut self) -> Self {
        self.config.recolor = None;
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        Pipeline::new(self.config)
    }
}

/// Result of one detection pass for a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Template size, shared by every match box.
    pub size: BoxSize,
    pub candidates: Vec<MatchCandidate>,
    pub matches: Vec<Match>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Score, extract, optionally merge, optionally recolor.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn new(config: PipelineConfig) -> Result<Self> {
        ensure!(
            config.threshold.is_finite(),
            "threshold must be finite, got {}",
            config.threshold
        );
        if let Some(merge) = config.merge {
            ensure!(
                (0.0..=1.0).contains(&merge.iou_threshold),
                "iou threshold must be within [0, 1], got {}",
                merge.iou_threshold
            );
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn recolor_config(&self) -> Option<RecolorConfig> {
        self.config.recolor
    }

    pub fn set_recolor(&mut self, recolor: Option<RecolorConfig>) {
        self.config.recolor = recolor;
    }

    /// Changes the recolor color, enabling recoloring if it was off.
    pub fn set_color(&mut self, color: Color) {
        self.config.recolor.get_or_insert_with(Default::default).color = color;
    }

    /// Changes the recolor opacity, enabling recoloring if it was off.
    pub fn set_opacity(&mut self, opacity: Opacity) {
        self.config.recolor.get_or_insert_with(Default::default).opacity = opacity;
    }

    pub fn surface(
        &self,
        source: &RgbaImage,
        template: &RgbaImage,
    ) -> Result<DissimilaritySurface> {
        Ok(score(source, template)?)
    }

    pub fn detect(&self, source: &RgbaImage, template: &RgbaImage) -> Result<Detection> {
        let size = BoxSize::of(template);
        let surface = score(source, template)?;
        let candidates = extract(&surface, self.config.threshold)?;
        let matches = match self.config.merge {
            Some(merge_config) => merge(&candidates, size, merge_config.iou_threshold)?,
            None => candidates.clone(),
        };

        info!(
            "found {} matches ({} candidates) for a {}x{} template",
            matches.len(),
            candidates.len(),
            size.width,
            size.height
        );
        Ok(Detection {
            size,
            candidates,
            matches,
        })
    }

    /// Returns `None` when recoloring is disabled.
    pub fn recolor(&self, source: &RgbaImage, detection: &Detection) -> Result<Option<RgbaImage>> {
        let Some(recolor) = self.config.recolor else {
            return Ok(None);
        };
        let output = composite(
            source,
            &detection.matches,
            detection.size,
            recolor.color,
            recolor.opacity,
        )?;
        Ok(Some(output))
    }

    pub fn run(
        &self,
        source: &RgbaImage,
        template: &RgbaImage,
    ) -> Result<(Detection, Option<RgbaImage>)> {
        let detection = self.detect(source, template)?;
        let output = self.recolor(source, &detection)?;
        Ok((detection, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use crate::types::Point;
    use image::Rgba;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const BACKGROUND: Rgba<u8> = Rgba([20, 20, 20, 255]);

    /// A dark canvas with a bright 6x4 marker stamped at each location.
    fn scene(width: u32, height: u32, markers: &[Point]) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);
        for marker in markers {
            for y in 0..4 {
                for x in 0..6 {
                    let value = 120 + (x * 20 + y * 10) as u8;
                    image.put_pixel(
                        marker.x + x,
                        marker.y + y,
                        Rgba([value, 255 - value, 90, 255]),
                    );
                }
            }
        }
        image
    }

    fn marker() -> RgbaImage {
        image::imageops::crop_imm(&scene(6, 4, &[Point::new(0, 0)]), 0, 0, 6, 4).to_image()
    }

    #[test]
    fn test_detect_finds_every_marker() {
        init();
        let markers = [Point::new(3, 2), Point::new(20, 5), Point::new(9, 17)];
        let source = scene(32, 24, &markers);
        let pipeline = Pipeline::default();

        let detection = pipeline.detect(&source, &marker()).unwrap();
        assert_eq!(detection.size, BoxSize::new(6, 4));
        assert_eq!(
            detection.matches,
            vec![Point::new(3, 2), Point::new(20, 5), Point::new(9, 17)]
        );
        assert!(detection.candidates.contains(&Point::new(20, 5)));
    }

    #[test]
    fn test_detect_without_merge_reports_candidates() {
        init();
        let source = scene(32, 24, &[Point::new(3, 2)]);
        let pipeline = Pipeline::builder().threshold(0.5).no_merge().build().unwrap();
        let detection = pipeline.detect(&source, &marker()).unwrap();
        assert_eq!(detection.matches, detection.candidates);
        assert!(detection.matches.contains(&Point::new(3, 2)));
    }

    #[test]
    fn test_oversized_template_is_a_noop() {
        init();
        let source = scene(5, 5, &[]);
        let pipeline = Pipeline::default();
        let (detection, output) = pipeline.run(&source, &marker()).unwrap();
        assert!(detection.is_empty());
        assert!(detection.candidates.is_empty());
        assert_eq!(output, Some(source));
    }

    #[test]
    fn test_run_recolors_matches() {
        init();
        let source = scene(32, 24, &[Point::new(10, 10)]);
        let pipeline = Pipeline::builder()
            .recolor(RecolorConfig {
                color: Color::rgb(0, 0, 255),
                opacity: Opacity::OPAQUE,
            })
            .build()
            .unwrap();

        let (detection, output) = pipeline.run(&source, &marker()).unwrap();
        assert_eq!(detection.matches, vec![Point::new(10, 10)]);
        let output = output.unwrap();
        assert_eq!(output.get_pixel(10, 10), &Rgba([0, 0, 255, 255]));
        assert_eq!(output.get_pixel(16, 14), &Rgba([0, 0, 255, 255]));
        assert_eq!(output.get_pixel(17, 14), &BACKGROUND);
    }

    #[test]
    fn test_recolor_disabled() {
        init();
        let source = scene(32, 24, &[Point::new(10, 10)]);
        let pipeline = Pipeline::builder().no_recolor().build().unwrap();
        let (_, output) = pipeline.run(&source, &marker()).unwrap();
        assert!(output.is_none());
    }

    #[test]
    fn test_set_color_enables_recolor() {
        init();
        let mut pipeline = Pipeline::builder().no_recolor().build().unwrap();
        pipeline.set_color(Color::rgb(1, 2, 3));
        assert_eq!(
            pipeline.recolor_config(),
            Some(RecolorConfig {
                color: Color::rgb(1, 2, 3),
                opacity: Opacity::default(),
            })
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        init();
        assert!(Pipeline::builder().threshold(f32::NAN).build().is_err());
        assert!(Pipeline::builder().iou_threshold(-0.1).build().is_err());
    }

    #[test]
    fn test_empty_template_error_is_detectable() {
        init();
        let source = scene(8, 8, &[]);
        let err = Pipeline::default()
            .detect(&source, &RgbaImage::new(0, 0))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<MatchError>(),
            Some(&MatchError::EmptyTemplate {
                width: 0,
                height: 0
            })
        );
    }
}
