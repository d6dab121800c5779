//! Gesture reference frames
//!
//! Transforms are recomputed from the overlay's state at gesture start
//! rather than accumulated per move event, so long drags do not drift and
//! the result only depends on the latest sample.

use story_core::{OverlayId, Point};

/// Pinch distances below this are treated as degenerate
const MIN_PINCH_DISTANCE: f32 = 1.0;

/// What a single batch of move samples was interpreted as.
///
/// Decided per input batch from the live touch count, so a gesture can
/// switch between dragging and pinching when a finger is lifted or added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Nothing applied: no touches, unknown overlay, or no reference frame
    Idle,
    Dragging {
        origin: Point,
    },
    Pinching {
        origin_scale: f32,
        origin_distance: f32,
    },
}

/// Overlay state captured when a gesture starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReferenceFrame {
    pub overlay: OverlayId,
    pub origin: Point,
    pub origin_scale: f32,
    pub pinch_distance: Option<f32>,
}

impl ReferenceFrame {
    pub fn new(overlay: OverlayId, origin: Point, origin_scale: f32, touches: &[Point]) -> Self {
        Self {
            overlay,
            origin,
            origin_scale,
            pinch_distance: pinch_distance(touches),
        }
    }
}

/// Distance between the first two touch points, if there are at least two
/// and they are not on top of each other
pub(crate) fn pinch_distance(touches: &[Point]) -> Option<f32> {
    match touches {
        [a, b, ..] => Some(a.distance(*b)).filter(|d| *d >= MIN_PINCH_DISTANCE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinch_distance_needs_two_separate_points() {
        assert_eq!(pinch_distance(&[]), None);
        assert_eq!(pinch_distance(&[Point::new(1.0, 1.0)]), None);
        assert_eq!(
            pinch_distance(&[Point::new(0.0, 0.0), Point::new(0.0, 0.0)]),
            None
        );
        assert_eq!(
            pinch_distance(&[Point::new(0.0, 0.0), Point::new(30.0, 40.0)]),
            Some(50.0)
        );
    }

    #[test]
    fn test_frame_records_pinch_only_for_two_touches() {
        let id = OverlayId(1);
        let origin = Point::new(5.0, 5.0);
        let drag = ReferenceFrame::new(id, origin, 1.0, &[Point::new(0.0, 0.0)]);
        assert_eq!(drag.pinch_distance, None);

        let pinch = ReferenceFrame::new(
            id,
            origin,
            1.5,
            &[Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
        );
        assert_eq!(pinch.pinch_distance, Some(100.0));
        assert_eq!(pinch.origin_scale, 1.5);
    }
}
