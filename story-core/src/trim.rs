//! Trim window over a source video

/// The `[start, end]` sub-range of a source video, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the window in seconds (zero when inverted)
    pub fn span(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Length of the window in whole milliseconds
    pub fn span_ms(&self) -> u64 {
        (self.span() * 1000.0).round() as u64
    }
}
