//! Story Player Library
//!
//! This library provides the viewing-time half of stories: a timed,
//! auto-advancing playback controller over one author's items, the progress
//! clock it runs on, and a compositor that renders preview frames.

pub mod clock;
pub mod controller;
pub mod frame_compositor;
pub mod progress;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ExitReason, PlaybackController, PlaybackObserver, PlaybackState, Transition};
pub use frame_compositor::FrameCompositor;
pub use progress::Progress;

/// Result type for story-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for story-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid frame size: {0}x{1}")]
    InvalidFrameSize(u32, u32),
}
