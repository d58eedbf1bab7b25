//! `GET /stream/{lessonId}` handler
//!
//! Resolves a lesson to its channel message, answers `Range` requests with
//! 206 and the exact window, and everything else with 200 and the full
//! file. Each request opens its own download session.

use super::range::{parse_range, RangeRequest};
use super::window::ByteWindow;
use crate::config::StreamingConfig;
use crate::connector::ChannelConnector;
use crate::course::CourseStructure;
use crate::error::{Error, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared state for the streaming proxy
#[derive(Clone)]
pub struct StreamState {
    course: Arc<CourseStructure>,
    connector: Arc<dyn ChannelConnector>,
    config: Arc<StreamingConfig>,
    download_slots: Option<Arc<Semaphore>>,
}

impl StreamState {
    pub fn new(
        course: Arc<CourseStructure>,
        connector: Arc<dyn ChannelConnector>,
        config: StreamingConfig,
    ) -> Self {
        let download_slots = connector.max_concurrent_downloads().map(|n| {
            tracing::info!(
                connector = connector.name(),
                max = n,
                "Connector limits concurrent downloads; excess streams will queue"
            );
            Arc::new(Semaphore::new(n.max(1)))
        });
        Self {
            course,
            connector,
            config: Arc::new(config),
            download_slots,
        }
    }

    /// Build the response for one stream request
    pub async fn open(&self, lesson_id: i64, range: Option<&str>) -> Result<Response> {
        if !self.course.contains_lesson(lesson_id) {
            return Err(Error::NotFound(format!("lesson {}", lesson_id)));
        }

        let message = self.connector.fetch_message_by_id(lesson_id).await?;
        let media = message
            .media
            .ok_or_else(|| Error::NotFound(format!("media for lesson {}", lesson_id)))?;
        let total = media.size;

        let (status, offset, len, content_range) = match parse_range(range, total) {
            RangeRequest::Partial(window) => (
                StatusCode::PARTIAL_CONTENT,
                window.start,
                window.len(),
                Some(window.content_range(total)),
            ),
            RangeRequest::Full => (StatusCode::OK, 0, total, None),
            RangeRequest::Unsatisfiable => {
                tracing::debug!(lesson = lesson_id, range = ?range, total, "Unsatisfiable range");
                return Ok((
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, format!("bytes */{}", total))],
                )
                    .into_response());
            }
        };

        tracing::debug!(
            lesson = lesson_id,
            status = status.as_u16(),
            offset,
            len,
            total,
            "Streaming lesson"
        );

        let body = if len == 0 {
            Body::empty()
        } else {
            let permit = match &self.download_slots {
                Some(slots) => Some(
                    slots
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| Error::Server(format!("Download slots closed: {}", e)))?,
                ),
                None => None,
            };
            let chunks = self
                .connector
                .open_chunked_download(&media, offset, self.config.chunk_size)
                .await?;
            Body::from_stream(ByteWindow::new(chunks, len, lesson_id).with_permit(permit))
        };

        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, self.config.content_type.as_str())
            .header(header::CONTENT_LENGTH, len)
            .header(header::ACCEPT_RANGES, "bytes");
        if let Some(content_range) = content_range {
            builder = builder.header(header::CONTENT_RANGE, content_range);
        }
        builder
            .body(body)
            .map_err(|e| Error::Server(format!("Failed to build response: {}", e)))
    }
}

/// Create the streaming router
pub fn stream_router(state: StreamState) -> Router {
    Router::new()
        .route("/stream/:id", get(stream_lesson))
        .with_state(state)
}

/// GET /stream/:id
async fn stream_lesson(
    State(state): State<StreamState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Ok(lesson_id) = id.parse::<i64>() else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    match state.open(lesson_id, range).await {
        Ok(response) => response,
        Err(e) if e.is_not_found() => {
            tracing::debug!(lesson = lesson_id, "Stream lookup failed: {}", e);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
        Err(e) => {
            tracing::error!(lesson = lesson_id, "Stream error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::connector::{MediaDescriptor, MemoryConnector, Message};
    use crate::course::Indexer;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    async fn make_state(connector: Arc<MemoryConnector>) -> StreamState {
        let indexer = Indexer::new(&IndexerConfig::default()).unwrap();
        let course = indexer.build(connector.as_ref()).await.unwrap();
        StreamState::new(Arc::new(course), connector, StreamingConfig::default())
    }

    async fn get(state: StreamState, uri: &str, range: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        stream_router(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_range_request() {
        let connector =
            Arc::new(MemoryConnector::new("c").with_video(1, Some("a.mp4"), payload(1000)));
        let state = make_state(connector).await;

        let response = get(state, "/stream/1", Some("bytes=0-99")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "100");
        assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 0-99/1000");
        assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "video/mp4");

        let body = body_bytes(response).await;
        assert_eq!(body, payload(1000)[..100].to_vec());
    }

    #[tokio::test]
    async fn test_open_ended_range() {
        let connector = Arc::new(MemoryConnector::new("c").with_video(1, None, payload(1000)));
        let state = make_state(connector).await;

        let response = get(state, "/stream/1", Some("bytes=990-")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 990-999/1000");
        assert_eq!(body_bytes(response).await, payload(1000)[990..].to_vec());
    }

    #[tokio::test]
    async fn test_full_fetch_without_range() {
        let connector = Arc::new(MemoryConnector::new("c").with_video(1, None, payload(500_000)));
        let state = make_state(connector).await;

        let response = get(state, "/stream/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "500000");
        assert!(response.headers().get(header::CONTENT_RANGE).is_none());
        assert_eq!(body_bytes(response).await.len(), 500_000);
    }

    #[tokio::test]
    async fn test_malformed_range_serves_full() {
        let connector = Arc::new(MemoryConnector::new("c").with_video(1, None, payload(300)));
        let state = make_state(connector).await;

        let response = get(state, "/stream/1", Some("bytes=oops")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.len(), 300);
    }

    #[tokio::test]
    async fn test_small_window_pulls_one_chunk() {
        let connector =
            Arc::new(MemoryConnector::new("c").with_video(1, None, payload(2 * 1024 * 1024)));
        let state = make_state(connector.clone()).await;

        let response = get(state, "/stream/1", Some("bytes=0-9")).await;
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "10");
        assert_eq!(body_bytes(response).await, payload(10));
        assert_eq!(connector.chunks_pulled(), 1);
    }

    #[tokio::test]
    async fn test_unknown_lesson_is_404() {
        let connector = Arc::new(
            MemoryConnector::new("c")
                .with_video(1, None, payload(10))
                .with_message(Message::media(2, MediaDescriptor::new("application/pdf", 10, "p"))),
        );
        let state = make_state(connector.clone()).await;

        for _ in 0..3 {
            let response = get(state.clone(), "/stream/999", None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        // Present in the channel but not a lesson
        let response = get(state.clone(), "/stream/2", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(state, "/stream/not-a-number", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(connector.downloads_opened(), 0);
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let connector = Arc::new(MemoryConnector::new("c").with_video(1, None, payload(100)));
        let state = make_state(connector.clone()).await;

        let response = get(state, "/stream/1", Some("bytes=100-")).await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes */100");
        assert_eq!(connector.downloads_opened(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_body() {
        let connector = Arc::new(
            MemoryConnector::new("c")
                .with_video(1, None, payload(3 * 512 * 1024))
                .failing_after_chunks(1),
        );
        let state = make_state(connector).await;

        let response = get(state, "/stream/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_backend_failure_spares_concurrent_stream() {
        let healthy_len = 2 * 512 * 1024 + 7;
        let connector = Arc::new(
            MemoryConnector::new("c")
                .with_video(1, None, payload(3 * 512 * 1024))
                .with_video(2, None, payload(healthy_len))
                .failing_blob("blob-1", 1),
        );
        let state = make_state(connector.clone()).await;

        let broken = state.open(1, None).await.unwrap();
        let healthy = state.open(2, None).await.unwrap();
        assert_eq!(connector.downloads_opened(), 2);

        let (broken, healthy) = tokio::join!(
            axum::body::to_bytes(broken.into_body(), usize::MAX),
            axum::body::to_bytes(healthy.into_body(), usize::MAX),
        );
        assert!(broken.is_err());
        let healthy = healthy.unwrap();
        assert_eq!(healthy.len(), healthy_len);
        assert_eq!(healthy.to_vec(), payload(healthy_len));
    }

    #[tokio::test]
    async fn test_downloads_queue_behind_connector_limit() {
        let connector = Arc::new(
            MemoryConnector::new("c")
                .with_video(1, None, payload(100))
                .with_max_downloads(1),
        );
        let state = make_state(connector.clone()).await;

        let first = state.open(1, Some("bytes=0-9")).await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), state.open(1, None)).await;
        assert!(second.is_err(), "second stream should wait for a slot");
        assert_eq!(connector.downloads_opened(), 1);

        drop(first);
        let second = state.open(1, None).await.unwrap();
        assert_eq!(body_bytes(second).await.len(), 100);
        assert_eq!(connector.downloads_opened(), 2);
    }
}
