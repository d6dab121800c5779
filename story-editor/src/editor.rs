//! Overlay transform engine
//!
//! Owns the overlays of one editing session and turns canvas taps and
//! multi-touch move samples into overlay creation, selection and
//! position/scale updates. Overlays are addressed by id only, so callbacks
//! that arrive after a delete simply find nothing to update.

use crate::gesture::{pinch_distance, Gesture, ReferenceFrame};
use crate::EditorConfig;
use story_core::{
    Overlay, OverlayId, OverlayStyle, Point, StylePatch, ValidationError, Vector,
};
use tracing::debug;

/// Result of a tap on the editing canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Something was selected; the tap only cleared the selection
    Deselected,
    /// An existing overlay was hit and is now selected
    Selected(OverlayId),
    /// Empty space was hit and a new overlay was created and selected
    Created(OverlayId),
}

/// Overlay editing session
#[derive(Debug, Clone)]
pub struct OverlayEditor {
    config: EditorConfig,
    /// Overlays in z-order, the last one drawn on top
    overlays: Vec<Overlay>,
    selected: Option<OverlayId>,
    next_id: u32,
    frame: Option<ReferenceFrame>,
}

impl Default for OverlayEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl OverlayEditor {
    /// Creates an empty editor with the given configuration
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            overlays: Vec::new(),
            selected: None,
            next_id: 1,
            frame: None,
        }
    }

    /// Overlays in z-order (bottom first)
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id() == id)
    }

    fn overlay_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.iter_mut().find(|o| o.id() == id)
    }

    /// Currently selected overlay id
    pub fn selected(&self) -> Option<OverlayId> {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Style applied to the next created overlay
    pub fn default_style(&self) -> &OverlayStyle {
        &self.config.default_style
    }

    /// Changes the style used for overlays created from now on
    pub fn update_default_style(&mut self, patch: &StylePatch) {
        self.config.default_style.apply(patch);
    }

    /// Snapshot of the overlays for publishing
    pub fn snapshot(&self) -> Vec<Overlay> {
        self.overlays.clone()
    }

    /// Handles a tap on the canvas.
    ///
    /// With something selected the tap only clears the selection; creating
    /// a new overlay then needs a second tap. Otherwise the topmost overlay
    /// under `point` is selected, or a new one is created near `point`.
    pub fn handle_canvas_tap(&mut self, point: Point) -> TapOutcome {
        if let Some(id) = self.selected.take() {
            debug!(overlay = %id, "tap cleared selection");
            return TapOutcome::Deselected;
        }

        if let Some(id) = self.hit_test(point) {
            debug!(overlay = %id, x = point.x, y = point.y, "tap selected overlay");
            self.selected = Some(id);
            return TapOutcome::Selected(id);
        }

        TapOutcome::Created(self.add_overlay(point))
    }

    /// Topmost overlay whose bounding box strictly contains `point`
    pub fn hit_test(&self, point: Point) -> Option<OverlayId> {
        self.overlays
            .iter()
            .rev()
            .find(|o| o.hit_test(point))
            .map(Overlay::id)
    }

    /// Creates an overlay near `point` with the default style and selects it
    pub fn add_overlay(&mut self, point: Point) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;

        let position = point.offset(self.config.tap_bias);
        let overlay = Overlay::new(
            id,
            self.config.default_text.clone(),
            position,
            self.config.default_base_size,
            self.config.default_style,
        );
        self.overlays.push(overlay);
        self.selected = Some(id);

        debug!(overlay = %id, x = position.x, y = position.y, "created overlay");
        id
    }

    /// Selects an existing overlay. Returns `false` if it does not exist.
    pub fn select(&mut self, id: OverlayId) -> bool {
        if self.overlay(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Records the overlay's position and scale as the gesture reference.
    ///
    /// Starting with two touches also records their distance as the pinch
    /// reference. Any earlier reference frame is replaced. Returns `false`
    /// if the overlay does not exist.
    pub fn begin_transform(&mut self, id: OverlayId, touches: &[Point]) -> bool {
        let Some(overlay) = self.overlay(id) else {
            debug!(overlay = %id, "begin transform on missing overlay ignored");
            return false;
        };

        let frame = ReferenceFrame::new(id, overlay.position(), overlay.scale(), touches);
        debug!(
            overlay = %id,
            touches = touches.len(),
            pinch = frame.pinch_distance.is_some(),
            "begin transform"
        );
        self.frame = Some(frame);
        true
    }

    /// Applies one batch of move samples.
    ///
    /// `delta` is the cumulative displacement since the gesture started.
    /// Two or more touches pinch (scale only), one touch drags (position
    /// only). Both are computed from the reference frame, never from the
    /// previous sample.
    pub fn update_transform(&mut self, id: OverlayId, touches: &[Point], delta: Vector) -> Gesture {
        let Some(frame) = self.frame.as_mut().filter(|f| f.overlay == id) else {
            return Gesture::Idle;
        };
        let Some(overlay) = self.overlays.iter_mut().find(|o| o.id() == id) else {
            return Gesture::Idle;
        };

        match touches.len() {
            0 => Gesture::Idle,
            1 => {
                overlay.set_position(frame.origin.offset(delta));
                Gesture::Dragging {
                    origin: frame.origin,
                }
            }
            _ => {
                let Some(current) = pinch_distance(touches) else {
                    return Gesture::Idle;
                };
                let Some(origin_distance) = frame.pinch_distance else {
                    // Second finger joined mid-gesture: this sample becomes
                    // the pinch reference.
                    debug!(overlay = %id, distance = current, "pinch reference captured mid-gesture");
                    frame.pinch_distance = Some(current);
                    frame.origin_scale = overlay.scale();
                    return Gesture::Pinching {
                        origin_scale: frame.origin_scale,
                        origin_distance: current,
                    };
                };

                overlay.set_scale(current / origin_distance * frame.origin_scale);
                Gesture::Pinching {
                    origin_scale: frame.origin_scale,
                    origin_distance,
                }
            }
        }
    }

    /// Ends the gesture on `id`, clearing the pinch reference. Position and
    /// scale keep their last committed values.
    pub fn end_transform(&mut self, id: OverlayId) {
        if let Some(frame) = self.frame.as_mut().filter(|f| f.overlay == id) {
            frame.pinch_distance = None;
            debug!(overlay = %id, "end transform");
        }
    }

    /// Removes the selected overlay. No-op if nothing is selected.
    pub fn delete_selected(&mut self) -> Option<Overlay> {
        let id = self.selected.take()?;
        let index = self.overlays.iter().position(|o| o.id() == id)?;
        if self.frame.is_some_and(|f| f.overlay == id) {
            self.frame = None;
        }
        debug!(overlay = %id, "deleted overlay");
        Some(self.overlays.remove(index))
    }

    /// Merges `patch` into the selected overlay's style. Returns whether
    /// anything was selected.
    pub fn update_style_of_selected(&mut self, patch: &StylePatch) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        match self.overlay_mut(id) {
            Some(overlay) => {
                overlay.apply_style(patch);
                true
            }
            None => false,
        }
    }

    /// Replaces the selected overlay's text. Returns `Ok(false)` if nothing
    /// is selected; invalid text leaves the overlay unchanged.
    pub fn set_text_of_selected(&mut self, text: &str) -> Result<bool, ValidationError> {
        let Some(id) = self.selected else {
            return Ok(false);
        };
        let Some(overlay) = self.overlay_mut(id) else {
            return Ok(false);
        };
        overlay.set_text(text)?;
        Ok(true)
    }

    /// Sets the selected overlay's base size, clamped to its bounds
    pub fn set_base_size_of_selected(&mut self, size: f32) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        match self.overlay_mut(id) {
            Some(overlay) => {
                overlay.set_base_size(size);
                true
            }
            None => false,
        }
    }
}
