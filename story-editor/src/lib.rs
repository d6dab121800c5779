//! Story Editor Library
//!
//! This library provides the creation-time half of stories: the overlay
//! transform engine that turns taps, drags and pinches into overlay edits,
//! the video trim control, and draft validation and publishing through
//! external upload and publish sinks.

pub mod editor;
pub mod gesture;
pub mod publish;
pub mod trim;

pub use editor::{OverlayEditor, TapOutcome};
pub use gesture::Gesture;
pub use publish::{
    MediaRef, PublishRequest, PublishSink, Publisher, SinkError, StoryDraft, UploadSink,
};
pub use trim::TrimController;

use story_core::{OverlayStyle, ValidationError, Vector};

/// Result type for story-editor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for story-editor operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Upload(#[source] SinkError),

    #[error("Publish failed: {0}")]
    Publish(#[source] SinkError),

    #[error("Invalid source duration: {0}s")]
    InvalidSourceDuration(f64),

    #[error("Invalid minimum trim gap: {0}s")]
    InvalidTrimGap(f64),
}

impl Error {
    /// Single user-facing notification for this error.
    ///
    /// Validation messages are shown inline as-is; external failures get a
    /// retry hint since the draft is kept intact.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(err) => err.to_string(),
            Error::Upload(_) => {
                "Couldn't upload your video. Your edits are saved, please try again.".to_string()
            }
            Error::Publish(_) => {
                "Couldn't share your story. Your edits are saved, please try again.".to_string()
            }
            Error::InvalidSourceDuration(_) => {
                "This video can't be used for a story.".to_string()
            }
            Error::InvalidTrimGap(_) => "This video can't be trimmed right now.".to_string(),
        }
    }

    /// Whether retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upload(_) | Error::Publish(_))
    }
}

/// Editor configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EditorConfig {
    /// Style given to newly created overlays
    pub default_style: OverlayStyle,
    /// Text given to newly created overlays
    pub default_text: String,
    /// Base font size of newly created overlays
    pub default_base_size: f32,
    /// Offset from the tap point to a new overlay's top-left corner, so the
    /// tap lands near the overlay's visual center
    pub tap_bias: Vector,
    /// Smallest gap kept between trim start and end, in seconds
    pub min_trim_gap_secs: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_style: OverlayStyle::default(),
            default_text: "Text".to_string(),
            default_base_size: 24.0,
            tap_bias: Vector::new(-50.0, -20.0),
            min_trim_gap_secs: 0.5,
        }
    }
}
