//! Draft validation and publishing
//!
//! A draft is validated locally before any external call. Upload and publish
//! go through caller-supplied sinks; the draft is only borrowed, so a failed
//! call leaves every overlay and trim edit in place for a retry.

use crate::editor::OverlayEditor;
use crate::trim::TrimController;
use crate::{EditorConfig, Error, Result};
use story_core::{
    Color, MediaKind, MediaSource, Overlay, Policy, Privacy, StoryItem, TrimWindow,
    ValidationError,
};
use std::time::Duration;
use tracing::{info, warn};

/// Failure reported by an external upload or publish collaborator
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands local video off to durable storage
pub trait UploadSink {
    /// Uploads the media at `local_uri` and returns its durable url
    fn upload(&mut self, local_uri: &str) -> std::result::Result<String, SinkError>;
}

/// Creates the story on the backend
pub trait PublishSink {
    fn publish(&mut self, request: &PublishRequest) -> std::result::Result<StoryItem, SinkError>;
}

/// Media reference sent with a publish request
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum MediaRef {
    Url { url: String },
    Background { from: Color, to: Color },
}

/// Payload handed to the publish sink
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PublishRequest {
    pub media_type: MediaKind,
    pub media: MediaRef,
    /// Overlay texts in z-order, one per line
    pub caption: String,
    pub overlays: Vec<Overlay>,
    pub trim: Option<TrimWindow>,
    pub duration_ms: u64,
    pub privacy: Privacy,
}

impl PublishRequest {
    pub fn duration_hint(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Rebuilds the media source this request describes
    pub fn media_source(&self) -> MediaSource {
        match (&self.media, self.media_type) {
            (MediaRef::Background { from, to }, _) => MediaSource::Gradient {
                from: *from,
                to: *to,
            },
            (MediaRef::Url { url }, MediaKind::Video) => MediaSource::Video { uri: url.clone() },
            (MediaRef::Url { url }, _) => MediaSource::Image { uri: url.clone() },
        }
    }
}

/// In-progress story being edited
#[derive(Debug, Clone)]
pub struct StoryDraft {
    media: MediaSource,
    editor: OverlayEditor,
    trim: Option<TrimController>,
    privacy: Privacy,
}

impl StoryDraft {
    /// Text story over a two-color gradient
    pub fn gradient(from: Color, to: Color, config: EditorConfig) -> Self {
        Self::with_media(MediaSource::Gradient { from, to }, config)
    }

    pub fn image(uri: impl Into<String>, config: EditorConfig) -> Self {
        Self::with_media(MediaSource::Image { uri: uri.into() }, config)
    }

    /// Video story with a trim control bounded by the policy's trim span
    pub fn video(
        uri: impl Into<String>,
        source_duration: f64,
        policy: &Policy,
        config: EditorConfig,
    ) -> Result<Self> {
        let trim = TrimController::new(
            source_duration,
            policy.trim_max_span_secs,
            config.min_trim_gap_secs,
        )?;
        let mut draft = Self::with_media(MediaSource::Video { uri: uri.into() }, config);
        draft.trim = Some(trim);
        Ok(draft)
    }

    fn with_media(media: MediaSource, config: EditorConfig) -> Self {
        Self {
            media,
            editor: OverlayEditor::new(config),
            trim: None,
            privacy: Privacy::default(),
        }
    }

    pub fn media(&self) -> &MediaSource {
        &self.media
    }

    pub fn editor(&self) -> &OverlayEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut OverlayEditor {
        &mut self.editor
    }

    pub fn trim(&self) -> Option<&TrimController> {
        self.trim.as_ref()
    }

    pub fn trim_mut(&mut self) -> Option<&mut TrimController> {
        self.trim.as_mut()
    }

    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    pub fn set_privacy(&mut self, privacy: Privacy) {
        self.privacy = privacy;
    }

    /// Whether the publish action should be enabled
    pub fn can_publish(&self, policy: &Policy) -> bool {
        self.build_request(policy).is_ok()
    }

    /// Validates the draft and flattens it into a publish payload
    pub fn build_request(&self, policy: &Policy) -> std::result::Result<PublishRequest, ValidationError> {
        let overlays = self.editor.snapshot();

        let (media, trim, duration) = match &self.media {
            MediaSource::Gradient { from, to } => {
                if overlays.is_empty() {
                    return Err(ValidationError::NothingToPublish);
                }
                let media = MediaRef::Background {
                    from: *from,
                    to: *to,
                };
                (media, None, policy.still_duration())
            }
            MediaSource::Image { uri } => {
                (media_url(uri)?, None, policy.still_duration())
            }
            MediaSource::Video { uri } => {
                let media = media_url(uri)?;
                let trim = self
                    .trim
                    .as_ref()
                    .ok_or(ValidationError::NothingToPublish)?
                    .validate()?;
                if trim.span() > policy.publish_max_video_secs {
                    return Err(ValidationError::VideoTooLong {
                        duration: trim.span(),
                        max: policy.publish_max_video_secs,
                    });
                }
                (media, Some(trim), Duration::from_millis(trim.span_ms()))
            }
        };

        let caption = overlays
            .iter()
            .map(Overlay::text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(PublishRequest {
            media_type: self.media.kind(),
            media,
            caption,
            overlays,
            trim,
            duration_ms: duration.as_millis() as u64,
            privacy: self.privacy,
        })
    }
}

fn media_url(uri: &str) -> std::result::Result<MediaRef, ValidationError> {
    if uri.trim().is_empty() {
        return Err(ValidationError::NothingToPublish);
    }
    Ok(MediaRef::Url {
        url: uri.to_string(),
    })
}

/// Whether `uri` already points at durable remote storage
fn is_remote(uri: &str) -> bool {
    uri.starts_with("https://") || uri.starts_with("http://")
}

/// Validates drafts and sends them through the upload and publish sinks
pub struct Publisher<U, P> {
    uploader: U,
    sink: P,
    policy: Policy,
}

impl<U: UploadSink, P: PublishSink> Publisher<U, P> {
    pub fn new(uploader: U, sink: P, policy: Policy) -> Self {
        Self {
            uploader,
            sink,
            policy,
        }
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Publishes `draft`.
    ///
    /// Local video is uploaded first and replaced by its durable url. Any
    /// failure is returned without touching the draft.
    pub fn submit(&mut self, draft: &StoryDraft) -> Result<StoryItem> {
        let mut request = draft.build_request(&self.policy).map_err(|err| {
            warn!(error = %err, "draft rejected");
            Error::from(err)
        })?;

        let local_video = match &request.media {
            MediaRef::Url { url } if request.media_type == MediaKind::Video && !is_remote(url) => {
                Some(url.clone())
            }
            _ => None,
        };
        if let Some(uri) = local_video {
            let durable = self.uploader.upload(&uri).map_err(|err| {
                warn!(error = %err, uri = %uri, "upload failed");
                Error::Upload(err)
            })?;
            request.media = MediaRef::Url { url: durable };
        }

        let item = self.sink.publish(&request).map_err(|err| {
            warn!(error = %err, "publish failed");
            Error::Publish(err)
        })?;

        info!(
            story = %item.id(),
            kind = %item.kind(),
            overlays = item.overlays().len(),
            privacy = %item.privacy(),
            "story published"
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use story_core::{Point, StoryId};

    #[derive(Default)]
    struct FakeUploader {
        fail: bool,
        uploaded: Vec<String>,
    }

    impl UploadSink for FakeUploader {
        fn upload(&mut self, local_uri: &str) -> std::result::Result<String, SinkError> {
            if self.fail {
                return Err(SinkError::Unavailable("blob storage down".into()));
            }
            self.uploaded.push(local_uri.to_string());
            Ok(format!("https://cdn.example/{}", self.uploaded.len()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        requests: Vec<PublishRequest>,
    }

    impl PublishSink for RecordingSink {
        fn publish(&mut self, request: &PublishRequest) -> std::result::Result<StoryItem, SinkError> {
            if self.fail {
                return Err(SinkError::Rejected("timeout".into()));
            }
            self.requests.push(request.clone());
            Ok(StoryItem::new(
                StoryId(self.requests.len() as u64),
                request.media_source(),
                request.overlays.clone(),
                request.caption.clone(),
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                request.duration_hint(),
                request.privacy,
            ))
        }
    }

    fn gradient_draft() -> StoryDraft {
        StoryDraft::gradient(
            Color::rgb(255, 0, 0),
            Color::rgb(0, 0, 255),
            EditorConfig::default(),
        )
    }

    #[test]
    fn test_empty_text_story_has_nothing_to_publish() {
        let draft = gradient_draft();
        let policy = Policy::default();
        assert!(!draft.can_publish(&policy));
        assert_eq!(
            draft.build_request(&policy),
            Err(ValidationError::NothingToPublish)
        );
        assert_eq!(
            StoryDraft::image("  ", EditorConfig::default()).build_request(&policy),
            Err(ValidationError::NothingToPublish)
        );
    }

    #[test]
    fn test_caption_joins_overlay_texts() {
        let mut draft = gradient_draft();
        let editor = draft.editor_mut();
        editor.add_overlay(Point::new(100.0, 100.0));
        editor.set_text_of_selected("hello").unwrap();
        editor.add_overlay(Point::new(100.0, 300.0));
        editor.set_text_of_selected("world").unwrap();
        draft.set_privacy(Privacy::Friends);

        let request = draft.build_request(&Policy::default()).unwrap();
        assert_eq!(request.media_type, MediaKind::Text);
        assert_eq!(request.caption, "hello\nworld");
        assert_eq!(request.overlays.len(), 2);
        assert_eq!(request.duration_ms, 5_000);
        assert_eq!(request.privacy, Privacy::Friends);
    }

    #[test]
    fn test_video_duration_comes_from_trim() {
        let policy = Policy::default();
        let mut draft =
            StoryDraft::video("file:///clip.mp4", 30.0, &policy, EditorConfig::default()).unwrap();
        let trim = draft.trim_mut().unwrap();
        trim.set_start(2.0);
        trim.set_end(9.0);

        let request = draft.build_request(&policy).unwrap();
        assert_eq!(request.duration_ms, 7_000);
        assert_eq!(request.trim, Some(TrimWindow::new(2.0, 9.0)));

        draft.trim_mut().unwrap().set_end(15.0);
        assert!(matches!(
            draft.build_request(&policy),
            Err(ValidationError::TrimTooLong { .. })
        ));
    }

    #[test]
    fn test_publish_cap_checked_separately_from_trim_span() {
        let policy = Policy {
            trim_max_span_secs: 120.0,
            publish_max_video_secs: 60.0,
            ..Policy::default()
        };
        let mut draft =
            StoryDraft::video("file:///long.mp4", 300.0, &policy, EditorConfig::default()).unwrap();
        draft.trim_mut().unwrap().set_end(90.0);
        assert!(matches!(
            draft.build_request(&policy),
            Err(ValidationError::VideoTooLong { .. })
        ));
    }

    #[test]
    fn test_submit_uploads_local_video_then_publishes() {
        let policy = Policy::default();
        let draft =
            StoryDraft::video("file:///clip.mp4", 8.0, &policy, EditorConfig::default()).unwrap();
        let mut publisher =
            Publisher::new(FakeUploader::default(), RecordingSink::default(), policy);

        let item = publisher.submit(&draft).unwrap();
        assert_eq!(
            item.content(),
            &MediaSource::Video {
                uri: "https://cdn.example/1".into()
            }
        );
        assert_eq!(item.duration_hint(), Duration::from_secs(8));
        assert_eq!(publisher.sink().requests.len(), 1);
    }

    #[test]
    fn test_failed_upload_keeps_draft_for_retry() {
        let policy = Policy::default();
        let mut draft =
            StoryDraft::video("file:///clip.mp4", 8.0, &policy, EditorConfig::default()).unwrap();
        draft.editor_mut().add_overlay(Point::new(50.0, 50.0));
        draft.trim_mut().unwrap().set_start(1.0);

        let uploader = FakeUploader {
            fail: true,
            ..FakeUploader::default()
        };
        let mut publisher = Publisher::new(uploader, RecordingSink::default(), policy.clone());
        let err = publisher.submit(&draft).unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
        assert!(err.is_retryable());
        assert!(err.user_message().contains("try again"));

        assert_eq!(draft.editor().overlays().len(), 1);
        assert_eq!(draft.trim().unwrap().window().start, 1.0);

        let mut retry = Publisher::new(FakeUploader::default(), RecordingSink::default(), policy);
        assert!(retry.submit(&draft).is_ok());
    }

    #[test]
    fn test_failed_publish_is_reported() {
        let mut draft = gradient_draft();
        draft.editor_mut().add_overlay(Point::new(50.0, 50.0));
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut publisher = Publisher::new(FakeUploader::default(), sink, Policy::default());

        let err = publisher.submit(&draft).unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
        assert!(publisher.sink().requests.is_empty());
    }

    #[test]
    fn test_validation_error_is_not_retryable() {
        let mut publisher = Publisher::new(
            FakeUploader::default(),
            RecordingSink::default(),
            Policy::default(),
        );
        let err = publisher.submit(&gradient_draft()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NothingToPublish)
        ));
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Nothing to publish");
    }
}
