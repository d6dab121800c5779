//! Video trim control
//!
//! Two independent bounded handles over a source video. The handles can
//! never cross, but a window longer than the maximum span is only flagged:
//! the user's choice is kept and publishing stays disabled until it is
//! shortened.

use crate::{Error, Result};
use story_core::{TrimWindow, ValidationError};
use tracing::debug;

/// Trim window editing state for one source video
#[derive(Debug, Clone, PartialEq)]
pub struct TrimController {
    source_duration: f64,
    max_span: f64,
    min_gap: f64,
    window: TrimWindow,
}

impl TrimController {
    /// Creates a controller with the window initially covering
    /// `[0, min(source_duration, max_span)]`
    pub fn new(source_duration: f64, max_span: f64, min_gap: f64) -> Result<Self> {
        if !min_gap.is_finite() || min_gap <= 0.0 {
            return Err(Error::InvalidTrimGap(min_gap));
        }
        if !source_duration.is_finite() || source_duration <= min_gap {
            return Err(Error::InvalidSourceDuration(source_duration));
        }

        let end = source_duration.min(max_span).max(min_gap);
        Ok(Self {
            source_duration,
            max_span,
            min_gap,
            window: TrimWindow::new(0.0, end),
        })
    }

    pub fn window(&self) -> TrimWindow {
        self.window
    }

    pub fn source_duration(&self) -> f64 {
        self.source_duration
    }

    pub fn max_span(&self) -> f64 {
        self.max_span
    }

    /// Moves the start handle. The value is clamped to the source and kept
    /// at least `min_gap` before the end handle.
    pub fn set_start(&mut self, secs: f64) {
        let upper = self.window.end - self.min_gap;
        self.window.start = clamp(secs, 0.0, upper);
        debug!(start = self.window.start, end = self.window.end, "trim start moved");
    }

    /// Moves the end handle. The value is clamped to the source and kept at
    /// least `min_gap` after the start handle.
    pub fn set_end(&mut self, secs: f64) {
        let lower = self.window.start + self.min_gap;
        self.window.end = clamp(secs, lower, self.source_duration);
        debug!(start = self.window.start, end = self.window.end, "trim end moved");
    }

    /// Whether the current span is within the maximum
    pub fn is_within_max_span(&self) -> bool {
        self.window.span() <= self.max_span
    }

    /// Publishing is gated on a valid window
    pub fn can_publish(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the window without correcting it
    pub fn validate(&self) -> std::result::Result<TrimWindow, ValidationError> {
        let TrimWindow { start, end } = self.window;
        if start >= end {
            return Err(ValidationError::InvertedTrim { start, end });
        }
        if !self.is_within_max_span() {
            return Err(ValidationError::TrimTooLong {
                span: self.window.span(),
                max: self.max_span,
            });
        }
        Ok(self.window)
    }
}

fn clamp(value: f64, lower: f64, upper: f64) -> f64 {
    if value.is_nan() {
        return lower;
    }
    value.max(lower).min(upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> TrimController {
        TrimController::new(30.0, 10.0, 0.5).unwrap()
    }

    #[test]
    fn test_initial_window_respects_max_span() {
        assert_eq!(controller().window(), TrimWindow::new(0.0, 10.0));
        let short = TrimController::new(4.0, 10.0, 0.5).unwrap();
        assert_eq!(short.window(), TrimWindow::new(0.0, 4.0));
        assert!(matches!(
            TrimController::new(0.0, 10.0, 0.5),
            Err(Error::InvalidSourceDuration(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_gap() {
        for gap in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                TrimController::new(30.0, 10.0, gap),
                Err(Error::InvalidTrimGap(_))
            ));
        }
    }

    #[test]
    fn test_over_long_window_is_flagged_not_corrected() {
        let mut trim = controller();
        trim.set_start(2.0);
        trim.set_end(9.0);
        assert!(trim.can_publish());

        trim.set_end(15.0);
        assert_eq!(trim.window().end, 15.0);
        assert!(!trim.can_publish());
        assert!(matches!(
            trim.validate(),
            Err(ValidationError::TrimTooLong { .. })
        ));

        trim.set_end(11.5);
        assert!(trim.can_publish());
        assert_eq!(trim.validate(), Ok(TrimWindow::new(2.0, 11.5)));
    }

    #[test]
    fn test_handles_never_cross() {
        let mut trim = controller();
        let moves = [
            (true, 25.0),
            (false, 3.0),
            (true, 40.0),
            (false, -5.0),
            (true, -1.0),
            (false, 0.0),
            (true, f64::NAN),
            (false, 100.0),
            (true, 29.9),
        ];
        for (is_start, value) in moves {
            if is_start {
                trim.set_start(value);
            } else {
                trim.set_end(value);
            }
            let w = trim.window();
            assert!(w.start < w.end, "{w:?}");
            assert!(w.start >= 0.0 && w.end <= 30.0, "{w:?}");
        }
    }

    #[test]
    fn test_dragging_end_below_start_keeps_gap() {
        let mut trim = controller();
        trim.set_start(5.0);
        trim.set_end(1.0);
        assert_eq!(trim.window(), TrimWindow::new(5.0, 5.5));
    }
}
