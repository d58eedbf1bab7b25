//! Local channel export connector
//!
//! Reads a channel that was exported to disk: a `messages.json` manifest
//! plus the media files it references, relative to the export directory.
//!
//! ```json
//! {
//!   "title": "Rust in Practice",
//!   "messages": [
//!     { "id": 1, "text": "MODULE: Basics" },
//!     { "id": 2, "media": { "mime_type": "video/mp4", "size": 1048576,
//!                           "file_name": "01 Intro.mp4", "location": "media/2.mp4" } }
//!   ]
//! }
//! ```

use super::{
    rechunk, stream_error, ChannelConnector, ChannelInfo, ChunkStream, MediaDescriptor, Message,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncSeekExt;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;

/// Manifest file name inside the export directory
pub const MANIFEST_FILE: &str = "messages.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    title: Option<String>,
    messages: Vec<Message>,
}

struct LoadedExport {
    title: String,
    /// Sorted by id, oldest first
    messages: Vec<Message>,
    by_id: HashMap<i64, usize>,
}

/// Connector over a channel export on the local filesystem
pub struct LocalConnector {
    dir: PathBuf,
    export: OnceCell<LoadedExport>,
}

impl LocalConnector {
    /// Create a connector over the given export directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            export: OnceCell::new(),
        }
    }

    async fn export(&self) -> Result<&LoadedExport> {
        self.export.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedExport> {
        let path = self.dir.join(MANIFEST_FILE);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::Connector(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let manifest: Manifest = serde_json::from_str(&raw)?;

        let mut messages = manifest.messages;
        messages.sort_by_key(|m| m.id);
        let by_id = messages
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();

        let title = manifest.title.unwrap_or_else(|| {
            self.dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Unknown Course".to_string())
        });

        Ok(LoadedExport {
            title,
            messages,
            by_id,
        })
    }

    /// Resolve a media location, refusing paths that leave the export directory
    fn media_path(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::NotFound(format!("media location '{}'", location)));
        }
        Ok(self.dir.join(relative))
    }
}

#[async_trait]
impl ChannelConnector for LocalConnector {
    fn name(&self) -> &str {
        "local"
    }

    async fn authenticate(&self) -> Result<ChannelInfo> {
        let export = self.export().await?;
        tracing::debug!(
            dir = %self.dir.display(),
            messages = export.messages.len(),
            "Loaded local channel export"
        );
        Ok(ChannelInfo {
            title: export.title.clone(),
        })
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>> {
        Ok(self.export().await?.messages.clone())
    }

    async fn fetch_message_by_id(&self, id: i64) -> Result<Message> {
        let export = self.export().await?;
        export
            .by_id
            .get(&id)
            .map(|&idx| export.messages[idx].clone())
            .ok_or_else(|| Error::NotFound(format!("message {}", id)))
    }

    async fn open_chunked_download(
        &self,
        media: &MediaDescriptor,
        offset: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream> {
        let path = self.media_path(&media.location)?;
        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("media file {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        file.seek(SeekFrom::Start(offset)).await?;

        let reader = ReaderStream::with_capacity(file, chunk_size.max(1)).map_err(stream_error);
        Ok(rechunk(reader, chunk_size))
    }
}
