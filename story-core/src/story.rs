//! Published story items

use crate::overlay::{Color, Overlay};
use crate::policy::Policy;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

/// Identifier of a published story item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StoryId(pub u64);

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of base media a story item is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    Image,
    Video,
    Text,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Base media under the overlays. The engine never fetches or decodes it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum MediaSource {
    Image { uri: String },
    Video { uri: String },
    Gradient { from: Color, to: Color },
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaSource::Image { .. } => MediaKind::Image,
            MediaSource::Video { .. } => MediaKind::Video,
            MediaSource::Gradient { .. } => MediaKind::Text,
        }
    }

    /// Returns the media uri for image and video sources
    pub fn uri(&self) -> Option<&str> {
        match self {
            MediaSource::Image { uri } | MediaSource::Video { uri } => Some(uri),
            MediaSource::Gradient { .. } => None,
        }
    }
}

/// Audience of a published story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Privacy {
    #[default]
    Public,
    Friends,
    Private,
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privacy::Public => "public",
            Privacy::Friends => "friends",
            Privacy::Private => "private",
        };
        f.write_str(name)
    }
}

/// One unit of playable story content.
///
/// Items are immutable once published: fields are only reachable through
/// accessors and the overlay list is a snapshot taken at publish time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoryItem {
    id: StoryId,
    content: MediaSource,
    overlays: Vec<Overlay>,
    caption: String,
    created_at: DateTime<Utc>,
    duration_ms: u64,
    privacy: Privacy,
}

impl StoryItem {
    /// Creates a published story item
    pub fn new(
        id: StoryId,
        content: MediaSource,
        overlays: Vec<Overlay>,
        caption: impl Into<String>,
        created_at: DateTime<Utc>,
        duration_hint: Duration,
        privacy: Privacy,
    ) -> Self {
        Self {
            id,
            content,
            overlays,
            caption: caption.into(),
            created_at,
            duration_ms: duration_hint.as_millis() as u64,
            privacy,
        }
    }

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.content.kind()
    }

    pub fn content(&self) -> &MediaSource {
        &self.content
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fixed for images and text, the trimmed length for video
    pub fn duration_hint(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    /// Time at which the item leaves the retention window. A retention too
    /// large to represent never expires.
    pub fn expires_at(&self, policy: &Policy) -> DateTime<Utc> {
        i64::try_from(policy.retention_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|retention| self.created_at.checked_add_signed(retention))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Checks whether the item is past its retention window at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, policy: &Policy) -> bool {
        now >= self.expires_at(policy)
    }
}
