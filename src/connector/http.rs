//! HTTP channel mirror connector
//!
//! Talks to a remote channel mirror that exposes the message history and
//! media over plain HTTP. Endpoints (all authenticated with a bearer token
//! when one is configured):
//!
//! | Request | Response |
//! |---------|----------|
//! | `GET /channels/{ref}` | `{ "title": "..." }` |
//! | `GET /channels/{ref}/messages?after={id}&limit={n}` | messages with `id > after`, ascending |
//! | `GET /channels/{ref}/messages/{id}` | one message, 404 if absent |
//! | `GET /media/{location}` + `Range: bytes={offset}-` | media bytes from `offset` |

use super::{
    rechunk, stream_error, ChannelConnector, ChannelInfo, ChannelRef, ChunkStream,
    MediaDescriptor, Message,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::Deserialize;

/// Messages requested per history page
const PAGE_SIZE: usize = 200;

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    title: String,
}

/// Connector for a remote channel mirror
pub struct HttpConnector {
    client: Client,
    base_url: String,
    channel: ChannelRef,
    token: Option<String>,
}

impl HttpConnector {
    /// Create a connector for `channel` on the mirror at `base_url`
    pub fn new(base_url: &str, channel: ChannelRef, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("teloview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel,
            token,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn channel_path(&self) -> String {
        format!("/channels/{}", self.channel)
    }
}

#[async_trait]
impl ChannelConnector for HttpConnector {
    fn name(&self) -> &str {
        "http"
    }

    async fn authenticate(&self) -> Result<ChannelInfo> {
        let response = self
            .get(&self.channel_path())
            .send()
            .await
            .map_err(|e| Error::Connector(format!("Cannot reach {}: {}", self.base_url, e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Connector(
                "Authentication rejected by channel mirror".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(Error::Connector(format!(
                "Channel '{}' not found",
                self.channel
            ))),
            status if !status.is_success() => Err(Error::Connector(format!(
                "Unexpected status {} while resolving channel",
                status
            ))),
            _ => {
                let body: ChannelResponse = response.json().await?;
                Ok(ChannelInfo { title: body.title })
            }
        }
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>> {
        let path = format!("{}/messages", self.channel_path());
        let mut messages: Vec<Message> = Vec::new();
        let mut after = 0i64;

        loop {
            let page: Vec<Message> = self
                .get(&path)
                .query(&[("after", after.to_string()), ("limit", PAGE_SIZE.to_string())])
                .send()
                .await?
                .error_for_status()
                .map_err(|e| Error::Connector(format!("History fetch failed: {}", e)))?
                .json()
                .await?;

            let page_len = page.len();
            match page.iter().map(|m| m.id).max() {
                Some(last) if last > after => after = last,
                _ => break,
            }
            messages.extend(page);
            tracing::debug!(fetched = messages.len(), "Fetched history page");

            if page_len < PAGE_SIZE {
                break;
            }
        }

        messages.sort_by_key(|m| m.id);
        messages.dedup_by_key(|m| m.id);
        Ok(messages)
    }

    async fn fetch_message_by_id(&self, id: i64) -> Result<Message> {
        let response = self
            .get(&format!("{}/messages/{}", self.channel_path(), id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("message {}", id)));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    async fn open_chunked_download(
        &self,
        media: &MediaDescriptor,
        offset: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream> {
        let response = self
            .get(&format!("/media/{}", media.location.trim_start_matches('/')))
            .header(header::RANGE, format!("bytes={}-", offset))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound(format!("media {}", media.location)))
            }
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK if offset == 0 => {}
            status => {
                return Err(Error::Stream(format!(
                    "Mirror answered {} to a range request at offset {}",
                    status, offset
                )))
            }
        }

        let body = response.bytes_stream().map_err(stream_error);
        Ok(rechunk(body, chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connector(server: &MockServer) -> HttpConnector {
        HttpConnector::new(
            &server.uri(),
            ChannelRef::Username("rust_course".to_string()),
            Some("secret".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_authenticate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/rust_course"))
            .and(header_eq("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Rust Course"})))
            .mount(&server)
            .await;

        let info = connector(&server).authenticate().await.unwrap();
        assert_eq!(info.title, "Rust Course");
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/rust_course"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = connector(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, Error::Connector(_)));
    }

    #[tokio::test]
    async fn test_fetch_messages_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/rust_course/messages"))
            .and(query_param("after", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "text": "MODULE: Intro"},
                {"id": 2, "media": {"mime_type": "video/mp4", "size": 10, "location": "2"}}
            ])))
            .mount(&server)
            .await;

        let messages = connector(&server).fetch_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 1);
        assert!(messages[1].media.is_some());
    }

    #[tokio::test]
    async fn test_fetch_message_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/rust_course/messages/77"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = connector(&server).fetch_message_by_id(77).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_download_sends_range_and_rechunks() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..50u8).collect();
        Mock::given(method("GET"))
            .and(path("/media/videos/2.mp4"))
            .and(header_eq("range", "bytes=20-"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(payload[20..].to_vec()))
            .mount(&server)
            .await;

        let media = MediaDescriptor::new("video/mp4", 50, "videos/2.mp4");
        let chunks: Vec<_> = connector(&server)
            .open_chunked_download(&media, 20, 8)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![8, 8, 8, 6]);
        assert_eq!(chunks.concat(), payload[20..].to_vec());
    }

    #[tokio::test]
    async fn test_download_rejects_ignored_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/x"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .mount(&server)
            .await;

        let media = MediaDescriptor::new("video/mp4", 10, "x");
        let result = connector(&server).open_chunked_download(&media, 5, 4).await;
        assert!(matches!(result, Err(Error::Stream(_))));
    }
}
