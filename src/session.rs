//! Interactive state: the loaded image, the patch being dragged out, and the
//! detection and recolor results derived from them.
//!
//! The host feeds [`SessionEvent`]s in as they happen and calls
//! [`Session::update`] once per frame. Detection only re-runs after the
//! template changes; compositing re-runs after the matches, color or opacity
//! change.

use anyhow::Result;
use image::RgbaImage;
use log::{trace, warn};

use crate::convert::crop_template;
use crate::pipeline::{Detection, Pipeline};
use crate::scale::DisplayScale;
use crate::types::{Color, Match, Opacity, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No image loaded yet.
    Init,
    /// An image is loaded and no patch is selected.
    AwaitingPatch,
    /// A drag is in progress.
    SelectingPatch,
    /// A non-empty patch is selected and matches are (or will be) available.
    PatchSelected,
}

/// Pointer coordinates are in display space; see [`DisplayScale`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ImageLoaded(RgbaImage),
    DisplayResized { width: f64, height: f64 },
    DragStart { x: f64, y: f64 },
    DragMove { x: f64, y: f64 },
    DragEnd,
    ColorChanged(Color),
    OpacityChanged(Opacity),
}

/// A self-contained detection job for the template of one generation.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub generation: u64,
    pub source: RgbaImage,
    pub template: RgbaImage,
}

impl DetectionRequest {
    pub fn run(&self, pipeline: &Pipeline) -> Result<Detection> {
        pipeline.detect(&self.source, &self.template)
    }
}

#[derive(Debug)]
pub struct Session {
    pipeline: Pipeline,
    state: SessionState,
    image: Option<RgbaImage>,
    scale: DisplayScale,
    display_size: Option<(f64, f64)>,
    drag_origin: (f64, f64),
    selection: Rect,
    template: Option<RgbaImage>,
    generation: u64,
    detection: Option<Detection>,
    output: Option<RgbaImage>,
    output_stale: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Pipeline::default())
    }
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            state: SessionState::Init,
            image: None,
            scale: DisplayScale::identity(0, 0),
            display_size: None,
            drag_origin: (0.0, 0.0),
            selection: Rect::default(),
            template: None,
            generation: 0,
            detection: None,
            output: None,
            output_stale: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn scale(&self) -> &DisplayScale {
        &self.scale
    }

    /// The selection in image coordinates.
    pub fn selection(&self) -> Rect {
        self.selection
    }

    pub fn template(&self) -> Option<&RgbaImage> {
        self.template.as_ref()
    }

    /// Bumped every time the template changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    pub fn matches(&self) -> &[Match] {
        self.detection
            .as_ref()
            .map(|d| d.matches.as_slice())
            .unwrap_or_default()
    }

    /// The recolored image, once composited.
    pub fn output(&self) -> Option<&RgbaImage> {
        self.output.as_ref()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::ImageLoaded(image) => {
                let (width, height) = image.dimensions();
                self.scale = match self.display_size {
                    Some((display_width, display_height)) => {
                        DisplayScale::new(width, height, display_width, display_height)?
                    }
                    None => DisplayScale::identity(width, height),
                };
                self.image = Some(image);
                self.selection = Rect::default();
                self.set_template(None);
                self.transition(SessionState::AwaitingPatch);
            }
            SessionEvent::DisplayResized { width, height } => {
                let (image_width, image_height) = self.scale.image_size();
                self.scale = DisplayScale::new(image_width, image_height, width, height)?;
                self.display_size = Some((width, height));
            }
            SessionEvent::DragStart { x, y } => {
                if self.state == SessionState::Init {
                    return Ok(());
                }
                self.drag_origin = (x, y);
                self.selection = self.scale.selection((x, y), (x, y));
                self.set_template(None);
                self.transition(SessionState::SelectingPatch);
            }
            SessionEvent::DragMove { x, y } => {
                if self.state != SessionState::SelectingPatch {
                    return Ok(());
                }
                self.selection = self.scale.selection(self.drag_origin, (x, y));
                let template = match &self.image {
                    Some(image) if !self.selection.is_empty() => {
                        Some(crop_template(image, self.selection)?)
                    }
                    _ => None,
                };
                self.set_template(template);
            }
            SessionEvent::DragEnd => {
                if self.state != SessionState::SelectingPatch {
                    return Ok(());
                }
                if self.template.is_some() {
                    self.transition(SessionState::PatchSelected);
                } else {
                    self.transition(SessionState::AwaitingPatch);
                }
            }
            SessionEvent::ColorChanged(color) => {
                self.pipeline.set_color(color);
                self.output_stale = true;
            }
            SessionEvent::OpacityChanged(opacity) => {
                self.pipeline.set_opacity(opacity);
                self.output_stale = true;
            }
        }
        Ok(())
    }

    /// The detection the session is waiting for, if any.
    pub fn pending_detection(&self) -> Option<DetectionRequest> {
        if self.state != SessionState::PatchSelected || self.detection.is_some() {
            return None;
        }
        Some(DetectionRequest {
            generation: self.generation,
            source: self.image.clone()?,
            template: self.template.clone()?,
        })
    }

    /// Stores a finished detection. Results for a template that has since
    /// been replaced are dropped and `false` is returned.
    pub fn apply_detection(&mut self, generation: u64, detection: Detection) -> bool {
        if generation != self.generation || self.state != SessionState::PatchSelected {
            warn!(
                "discarding detection for generation {} (current {})",
                generation, self.generation
            );
            return false;
        }
        self.detection = Some(detection);
        self.output_stale = true;
        true
    }

    /// Per-frame tick. Runs whatever is stale and reports whether anything
    /// visible changed.
    pub fn update(&mut self) -> Result<bool> {
        let mut refreshed = false;
        if let Some(request) = self.pending_detection() {
            let detection = request.run(&self.pipeline)?;
            refreshed |= self.apply_detection(request.generation, detection);
        }

        if self.output_stale {
            if let (Some(image), Some(detection)) = (&self.image, &self.detection) {
                self.output = self.pipeline.recolor(image, detection)?;
                self.output_stale = false;
                refreshed = true;
            }
        }
        Ok(refreshed)
    }

    fn set_template(&mut self, template: Option<RgbaImage>) {
        self.template = template;
        self.generation += 1;
        self.detection = None;
        self.output = None;
        self.output_stale = false;
    }

    fn transition(&mut self, next: SessionState) {
        trace!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
