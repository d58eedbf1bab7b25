//! In-memory connector
//!
//! Holds a fixed message list and media blobs in memory. Counts every chunk
//! pulled from its download sessions and can inject failures, which makes
//! it the reference backend for exercising the indexer and the proxy.

use super::{ChannelConnector, ChannelInfo, ChunkStream, MediaDescriptor, Message};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Connector serving messages and media from memory
pub struct MemoryConnector {
    title: String,
    messages: Vec<Message>,
    blobs: HashMap<String, Bytes>,
    reject_auth: bool,
    fail_after_chunks: Option<usize>,
    blob_failures: HashMap<String, usize>,
    max_downloads: Option<usize>,
    chunks_pulled: Arc<AtomicUsize>,
    downloads_opened: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Create an empty connector for a channel with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            messages: Vec::new(),
            blobs: HashMap::new(),
            reject_auth: false,
            fail_after_chunks: None,
            blob_failures: HashMap::new(),
            max_downloads: None,
            chunks_pulled: Arc::new(AtomicUsize::new(0)),
            downloads_opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append a message
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append a video message whose bytes are `data`
    pub fn with_video(mut self, id: i64, file_name: Option<&str>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let location = format!("blob-{}", id);
        let mut media = MediaDescriptor::new("video/mp4", data.len() as u64, location.clone());
        media.file_name = file_name.map(str::to_string);
        self.blobs.insert(location, data);
        self.messages.push(Message::media(id, media));
        self
    }

    /// Fail authentication
    pub fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    /// Make every download session fail after yielding `n` chunks
    pub fn failing_after_chunks(mut self, n: usize) -> Self {
        self.fail_after_chunks = Some(n);
        self
    }

    /// Make downloads of one media location fail after yielding `n` chunks
    pub fn failing_blob(mut self, location: impl Into<String>, n: usize) -> Self {
        self.blob_failures.insert(location.into(), n);
        self
    }

    /// Report a cap on simultaneous downloads
    pub fn with_max_downloads(mut self, n: usize) -> Self {
        self.max_downloads = Some(n);
        self
    }

    /// Total chunks pulled across all download sessions
    pub fn chunks_pulled(&self) -> usize {
        self.chunks_pulled.load(Ordering::SeqCst)
    }

    /// Number of download sessions opened
    pub fn downloads_opened(&self) -> usize {
        self.downloads_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelConnector for MemoryConnector {
    fn name(&self) -> &str {
        "memory"
    }

    async fn authenticate(&self) -> Result<ChannelInfo> {
        if self.reject_auth {
            return Err(Error::Connector("Authentication rejected".to_string()));
        }
        Ok(ChannelInfo {
            title: self.title.clone(),
        })
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>> {
        let mut messages = self.messages.clone();
        messages.sort_by_key(|m| m.id);
        Ok(messages)
    }

    async fn fetch_message_by_id(&self, id: i64) -> Result<Message> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("message {}", id)))
    }

    async fn open_chunked_download(
        &self,
        media: &MediaDescriptor,
        offset: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream> {
        let blob = self
            .blobs
            .get(&media.location)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("media {}", media.location)))?;
        self.downloads_opened.fetch_add(1, Ordering::SeqCst);

        let chunk_size = chunk_size.max(1);
        let start = (offset as usize).min(blob.len());
        let pulled = self.chunks_pulled.clone();
        let fail_after = self
            .blob_failures
            .get(&media.location)
            .copied()
            .or(self.fail_after_chunks);

        // Chunks are cut on demand so the pull counter reflects what the
        // consumer actually asked for.
        let stream = futures::stream::unfold((start, 0usize), move |(pos, served)| {
            let blob = blob.clone();
            let pulled = pulled.clone();
            async move {
                if pos >= blob.len() {
                    return None;
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                if fail_after.is_some_and(|n| served >= n) {
                    return Some((
                        Err(Error::Stream("backend connection lost".to_string())),
                        (blob.len(), served),
                    ));
                }
                let end = (pos + chunk_size).min(blob.len());
                Some((Ok(blob.slice(pos..end)), (end, served + 1)))
            }
        });

        Ok(stream.boxed())
    }

    fn max_concurrent_downloads(&self) -> Option<usize> {
        self.max_downloads
    }
}
