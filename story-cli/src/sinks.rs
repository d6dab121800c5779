//! File-backed upload and publish sinks

use chrono::Utc;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use story_core::{StoryBundle, StoryItem};
use story_editor::{PublishRequest, PublishSink, SinkError, UploadSink};
use tracing::debug;

/// Publishes by appending items to a story bundle file
pub struct BundleSink {
    path: PathBuf,
    bundle: StoryBundle,
}

impl BundleSink {
    /// Opens the bundle at `path`, or starts a new one for `author`
    pub fn open(path: &Path, author: &str) -> anyhow::Result<Self> {
        let bundle = if path.exists() {
            let file = File::open(path)?;
            StoryBundle::read(std::io::BufReader::new(file))?
        } else {
            StoryBundle::new(author)
        };
        Ok(Self {
            path: path.to_path_buf(),
            bundle,
        })
    }

    pub fn bundle(&self) -> &StoryBundle {
        &self.bundle
    }

    /// Writes `bundle` next to the target and renames it into place, so a
    /// failed write leaves the previous file intact
    fn save(&self, bundle: &StoryBundle) -> Result<(), SinkError> {
        let temp_path = self.path.with_extension("stories.tmp");
        let written = File::create(&temp_path)
            .map_err(SinkError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                bundle
                    .write(&mut writer)
                    .map_err(|err| SinkError::Rejected(err.to_string()))?;
                writer.flush()?;
                Ok(())
            })
            .and_then(|()| fs::rename(&temp_path, &self.path).map_err(SinkError::from));

        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written
    }
}

impl PublishSink for BundleSink {
    fn publish(&mut self, request: &PublishRequest) -> Result<StoryItem, SinkError> {
        let item = StoryItem::new(
            self.bundle.next_id(),
            request.media_source(),
            request.overlays.clone(),
            request.caption.clone(),
            Utc::now(),
            request.duration_hint(),
            request.privacy,
        );

        let mut updated = self.bundle.clone();
        updated.push(item.clone());
        self.save(&updated)?;
        self.bundle = updated;

        debug!(path = %self.path.display(), story = %item.id(), "bundle updated");
        Ok(item)
    }
}

/// Uploads by copying local media into a directory
pub struct DirUploader {
    dir: PathBuf,
}

impl DirUploader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl UploadSink for DirUploader {
    fn upload(&mut self, local_uri: &str) -> Result<String, SinkError> {
        let source = Path::new(local_uri.strip_prefix("file://").unwrap_or(local_uri));
        let name = source
            .file_name()
            .ok_or_else(|| SinkError::Rejected(format!("not a file: {local_uri}")))?;

        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(name);
        let bytes = fs::copy(source, &target)?;
        let target = fs::canonicalize(&target)?;
        debug!(from = %source.display(), to = %target.display(), bytes, "media uploaded");
        Ok(format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_core::{Color, MediaKind, Privacy, StoryId};
    use story_editor::MediaRef;
    use tempfile::tempdir;

    fn request() -> PublishRequest {
        PublishRequest {
            media_type: MediaKind::Text,
            media: MediaRef::Background {
                from: Color::rgb(0, 0, 0),
                to: Color::rgb(255, 255, 255),
            },
            caption: "hello".to_string(),
            overlays: Vec::new(),
            trim: None,
            duration_ms: 5_000,
            privacy: Privacy::Public,
        }
    }

    #[test]
    fn test_publish_persists_bundle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mine.stories");

        let mut sink = BundleSink::open(&path, "asha").unwrap();
        assert_eq!(sink.publish(&request()).unwrap().id(), StoryId(1));
        assert_eq!(sink.publish(&request()).unwrap().id(), StoryId(2));
        assert!(!path.with_extension("stories.tmp").exists());

        let reopened = BundleSink::open(&path, "ignored").unwrap();
        assert_eq!(reopened.bundle().header.author, "asha");
        assert_eq!(reopened.bundle().items.len(), 2);
        assert_eq!(reopened.bundle().items[0].caption(), "hello");
    }

    #[test]
    fn test_failed_publish_leaves_bundle_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("mine.stories");

        let mut sink = BundleSink::open(&path, "asha").unwrap();
        assert!(matches!(sink.publish(&request()), Err(SinkError::Io(_))));
        assert!(sink.bundle().items.is_empty());
        assert_eq!(sink.bundle().next_id(), StoryId(1));
        assert!(!path.exists());
    }

    #[test]
    fn test_dir_uploader_copies_media() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        fs::write(&source, b"not really a video").unwrap();

        let mut uploader = DirUploader::new(dir.path().join("media"));
        let url = uploader
            .upload(&format!("file://{}", source.display()))
            .unwrap();

        let copied = url.strip_prefix("file://").unwrap();
        assert!(copied.ends_with("clip.mp4"));
        assert_eq!(fs::read(copied).unwrap(), b"not really a video");

        let missing = dir.path().join("gone.mp4");
        assert!(matches!(
            uploader.upload(missing.to_str().unwrap()),
            Err(SinkError::Io(_))
        ));
    }
}
