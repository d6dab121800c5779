//! Duration policy values
//!
//! The per-item playback duration, the trim span limit shown while editing,
//! the publish-time video limit and the retention window are independent
//! product rules. They are kept as separate values on purpose and must not
//! be folded into a single "story duration".

use std::time::Duration;

/// Independently configurable duration policy values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Policy {
    /// Time each item stays on screen during playback, regardless of media type
    pub item_duration_ms: u64,
    /// Duration hint recorded for published image and text items
    pub still_duration_ms: u64,
    /// Maximum trim window span accepted by the video editor, in seconds
    pub trim_max_span_secs: f64,
    /// Maximum video length accepted at publish time, in seconds
    pub publish_max_video_secs: f64,
    /// How long a published story stays visible, in seconds
    pub retention_secs: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            item_duration_ms: 5_000,
            still_duration_ms: 5_000,
            trim_max_span_secs: 10.0,
            publish_max_video_secs: 60.0,
            retention_secs: 24 * 60 * 60,
        }
    }
}

impl Policy {
    pub fn item_duration(&self) -> Duration {
        Duration::from_millis(self.item_duration_ms)
    }

    pub fn still_duration(&self) -> Duration {
        Duration::from_millis(self.still_duration_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Reads a policy from JSON. Missing fields keep their default values.
    #[cfg(feature = "serde")]
    pub fn from_json<R: std::io::Read>(reader: R) -> crate::Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
