//! Story Core Library
//!
//! This library provides the core data structures for ephemeral stories:
//! positioned text overlays, published story items, video trim windows, the
//! duration policy values and a compact binary bundle format for storing
//! published items.

pub mod bundle;
pub mod geometry;
pub mod overlay;
pub mod policy;
pub mod story;
pub mod trim;

pub use bundle::{BundleHeader, StoryBundle};
pub use geometry::{Point, Rect, Vector};
pub use overlay::{
    Color, FontSlant, FontWeight, Overlay, OverlayId, OverlayStyle, StylePatch, TextAlign,
    TextDecoration,
};
pub use policy::Policy;
pub use story::{MediaKind, MediaSource, Privacy, StoryId, StoryItem};
pub use trim::TrimWindow;

/// Result type for story-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for story-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes, expected 'STY\\0'")]
    InvalidMagic,

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid {field} tag: {tag}")]
    InvalidTag { field: &'static str, tag: u8 },

    #[error("Invalid UTF-8 text in bundle")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Story not found: {0}")]
    StoryNotFound(u64),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local, synchronous validation failures.
///
/// These are caught before any external call and surface as an inline,
/// non-fatal message. No edit state is lost when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Text cannot be empty")]
    EmptyText,

    #[error("Text is too long ({len} characters, at most {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("Trim start ({start:.1}s) must be before trim end ({end:.1}s)")]
    InvertedTrim { start: f64, end: f64 },

    #[error("Selected clip is {span:.1}s long, at most {max:.1}s is allowed")]
    TrimTooLong { span: f64, max: f64 },

    #[error("Video is {duration:.1}s long, at most {max:.1}s can be published")]
    VideoTooLong { duration: f64, max: f64 },

    #[error("Nothing to publish")]
    NothingToPublish,

    #[error("Invalid color: {0}")]
    InvalidColor(String),
}
