//! Channel connectors
//!
//! A connector is the only component that talks to the remote message
//! source. It authenticates, lists the channel history oldest-first, looks
//! up single messages and opens chunked downloads of attached media.
//!
//! Every call to [`ChannelConnector::open_chunked_download`] opens an
//! independent download session; sessions are never shared between
//! requests. Connectors that cannot run many sessions at once report a cap
//! through [`ChannelConnector::max_concurrent_downloads`] and the streaming
//! proxy queues excess streams behind it.

mod channel_ref;
mod http;
mod local;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod message;

pub use channel_ref::ChannelRef;
pub use http::HttpConnector;
pub use local::LocalConnector;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryConnector;
pub use message::{MediaDescriptor, Message};

use crate::config::{SourceConfig, StorageConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;

/// Lazy, finite sequence of byte chunks produced by a download session
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Channel metadata returned on successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Display title of the channel
    pub title: String,
}

/// Access to the remote message source
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Connector name, for logs
    fn name(&self) -> &str;

    /// Authenticate and resolve the channel
    async fn authenticate(&self) -> Result<ChannelInfo>;

    /// Full channel history, oldest first
    async fn fetch_messages(&self) -> Result<Vec<Message>>;

    /// Look up a single message; `Error::NotFound` when it does not exist
    async fn fetch_message_by_id(&self, id: i64) -> Result<Message>;

    /// Open a download session starting at `offset`, yielding chunks of
    /// `chunk_size` bytes (the last one may be shorter). The chunks sum to
    /// `media.size - offset`.
    async fn open_chunked_download(
        &self,
        media: &MediaDescriptor,
        offset: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream>;

    /// Maximum number of simultaneous download sessions (`None` = unbounded)
    fn max_concurrent_downloads(&self) -> Option<usize> {
        None
    }
}

/// Build the connector described by the source configuration
pub fn from_config(
    source: &SourceConfig,
    storage: &StorageConfig,
) -> Result<Arc<dyn ChannelConnector>> {
    match source {
        SourceConfig::Local { dir } => Ok(Arc::new(LocalConnector::new(dir.clone()))),
        SourceConfig::Http {
            base_url,
            channel,
            token_env,
        } => {
            let token = std::env::var(token_env)
                .ok()
                .filter(|t| !t.trim().is_empty())
                .or_else(|| storage.read_session());
            if token.is_none() {
                tracing::warn!(
                    "No token in ${} or {}; connecting anonymously",
                    token_env,
                    storage.session_file.display()
                );
            }
            Ok(Arc::new(HttpConnector::new(
                base_url,
                ChannelRef::parse(channel),
                token,
            )?))
        }
    }
}

/// Regroup an arbitrary byte stream into chunks of exactly `chunk_size`
/// bytes; only the final chunk may be shorter.
pub(crate) fn rechunk<S>(inner: S, chunk_size: usize) -> ChunkStream
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    let stream = async_stream::try_stream! {
        let mut inner = Box::pin(inner);
        let mut buf = BytesMut::with_capacity(chunk_size);
        while let Some(piece) = inner.next().await {
            let piece = piece?;
            buf.extend_from_slice(&piece);
            while buf.len() >= chunk_size {
                yield buf.split_to(chunk_size).freeze();
            }
        }
        if !buf.is_empty() {
            yield buf.freeze();
        }
    };
    stream.boxed()
}

/// Map a transport error raised mid-download into a stream error
pub(crate) fn stream_error(e: impl std::fmt::Display) -> Error {
    Error::Stream(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(stream: ChunkStream) -> Vec<Bytes> {
        stream.map(|c| c.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_rechunk_merges_small_pieces() {
        let pieces = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cde")),
            Ok(Bytes::from_static(b"f")),
            Ok(Bytes::from_static(b"ghij")),
        ]);
        let chunks = collect(rechunk(pieces, 4)).await;
        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"abcd"),
                Bytes::from_static(b"efgh"),
                Bytes::from_static(b"ij"),
            ]
        );
    }

    #[tokio::test]
    async fn test_rechunk_splits_large_piece() {
        let pieces = stream::iter(vec![Ok(Bytes::from(vec![1u8; 10]))]);
        let chunks = collect(rechunk(pieces, 3)).await;
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[tokio::test]
    async fn test_rechunk_propagates_error() {
        let pieces = stream::iter(vec![
            Ok(Bytes::from_static(b"abcd")),
            Err(Error::Stream("connection reset".to_string())),
        ]);
        let mut out = rechunk(pieces, 2);
        assert_eq!(out.next().await.unwrap().unwrap(), Bytes::from_static(b"ab"));
        assert_eq!(out.next().await.unwrap().unwrap(), Bytes::from_static(b"cd"));
        assert!(matches!(out.next().await, Some(Err(Error::Stream(_)))));
    }

    #[test]
    fn test_from_config_local() {
        let storage = StorageConfig::rooted_at("/tmp/teloview-test");
        let connector = from_config(
            &SourceConfig::Local {
                dir: "/tmp/course".into(),
            },
            &storage,
        )
        .unwrap();
        assert_eq!(connector.name(), "local");
    }
}
