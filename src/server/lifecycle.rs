//! Server lifecycle: authenticate, index, serve

use super::bootstrap::{bind_first_free, browser_url, open_browser};
use crate::api::{build_app, CourseState};
use crate::config::TeloViewConfig;
use crate::connector::ChannelConnector;
use crate::course::{CourseStructure, Indexer};
use crate::error::{Error, Result};
use crate::stream::StreamState;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started
    Stopped,
    /// Authenticating and indexing the channel
    Indexing,
    /// Course indexed, router built
    Ready,
    /// Accepting connections
    Running,
    /// Draining connections
    ShuttingDown,
}

/// A prepared course, ready to be served
pub struct PreparedCourse {
    pub title: String,
    pub course: Arc<CourseStructure>,
    pub app: Router,
}

/// TeloView server
pub struct Server {
    config: TeloViewConfig,
    connector: Arc<dyn ChannelConnector>,
    state: Arc<RwLock<ServerState>>,
}

impl Server {
    /// Get current state
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    async fn set_state(&self, next: ServerState) {
        *self.state.write().await = next;
    }

    /// Authenticate, index the channel and build the HTTP application.
    ///
    /// Authentication failures are fatal; the index is built exactly once
    /// and never mutated afterwards.
    pub async fn prepare(&self) -> Result<PreparedCourse> {
        {
            let mut state = self.state.write().await;
            if *state != ServerState::Stopped {
                return Err(Error::Server("Server already started".to_string()));
            }
            *state = ServerState::Indexing;
        }

        match self.index().await {
            Ok(prepared) => {
                self.set_state(ServerState::Ready).await;
                Ok(prepared)
            }
            Err(e) => {
                self.set_state(ServerState::Stopped).await;
                Err(e)
            }
        }
    }

    async fn index(&self) -> Result<PreparedCourse> {
        tracing::info!(connector = self.connector.name(), "Connecting to channel");
        let info = self.connector.authenticate().await?;
        tracing::info!("Connected to \"{}\"", info.title);

        let indexer = Indexer::new(&self.config.indexer)?;
        let course = Arc::new(indexer.build(self.connector.as_ref()).await?);
        if course.is_empty() {
            tracing::warn!("No video lessons found in \"{}\"", info.title);
        }

        let course_state = CourseState {
            title: Arc::from(info.title.as_str()),
            default_module: Arc::from(indexer.default_module()),
            course: course.clone(),
        };
        let stream_state = StreamState::new(
            course.clone(),
            self.connector.clone(),
            self.config.streaming.clone(),
        );
        let app = build_app(course_state, stream_state, &self.config.server.cors_origins);

        Ok(PreparedCourse {
            title: info.title,
            course,
            app,
        })
    }

    /// Prepare the course, bind a free port and serve until `shutdown`
    /// resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let prepared = self.prepare().await?;

        let server = &self.config.server;
        let listener = bind_first_free(&server.host, server.port, server.port_scan_limit).await?;
        let addr = listener.local_addr()?;
        let url = browser_url(addr);
        tracing::info!(
            "Serving \"{}\" ({} lessons) at {}",
            prepared.title,
            prepared.course.lesson_count(),
            url
        );

        if server.open_browser {
            open_browser(&url);
        }

        self.set_state(ServerState::Running).await;
        let state = self.state.clone();
        let result = serve(listener, prepared.app, async move {
            shutdown.await;
            *state.write().await = ServerState::ShuttingDown;
            tracing::info!("Shutting down");
        })
        .await;
        self.set_state(ServerState::Stopped).await;
        result
    }
}

/// Serve `app` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Server(format!("HTTP server failed: {}", e)))
}

/// Resolves when the process receives Ctrl+C
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Builder for [`Server`]
pub struct ServerBuilder {
    config: TeloViewConfig,
    connector: Option<Arc<dyn ChannelConnector>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: TeloViewConfig::default(),
            connector: None,
        }
    }

    /// Set configuration
    pub fn config(mut self, config: TeloViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific connector instead of the configured source
    pub fn connector(mut self, connector: Arc<dyn ChannelConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        self.config.validate()?;
        let connector = match self.connector {
            Some(connector) => connector,
            None => crate::connector::from_config(&self.config.source, &self.config.storage)?,
        };
        Ok(Server {
            config: self.config,
            connector,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{MemoryConnector, Message};
    use tokio::sync::oneshot;

    fn course_connector() -> Arc<MemoryConnector> {
        Arc::new(
            MemoryConnector::new("Async Rust")
                .with_message(Message::text(1, "MODULE: Basics"))
                .with_video(2, Some("Futures.mp4"), vec![7u8; 4096])
                .with_video(3, Some("@chan - Pinning.mkv"), vec![8u8; 2048]),
        )
    }

    #[tokio::test]
    async fn test_prepare_indexes_course() {
        let server = ServerBuilder::new()
            .connector(course_connector())
            .build()
            .unwrap();
        assert_eq!(server.state().await, ServerState::Stopped);

        let prepared = server.prepare().await.unwrap();
        assert_eq!(prepared.title, "Async Rust");
        assert_eq!(prepared.course.lesson_count(), 2);
        assert_eq!(prepared.course.lesson(3).unwrap().1.title, "Pinning");
        assert_eq!(server.state().await, ServerState::Ready);
    }

    #[tokio::test]
    async fn test_prepare_twice_fails() {
        let server = ServerBuilder::new()
            .connector(course_connector())
            .build()
            .unwrap();
        server.prepare().await.unwrap();
        assert!(matches!(server.prepare().await, Err(Error::Server(_))));
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let connector = Arc::new(MemoryConnector::new("x").rejecting_auth());
        let server = ServerBuilder::new().connector(connector).build().unwrap();

        let result = server.prepare().await;
        assert!(matches!(result, Err(Error::Connector(_))));
        assert_eq!(server.state().await, ServerState::Stopped);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = TeloViewConfig::default();
        config.streaming.chunk_size = 0;
        let result = ServerBuilder::new()
            .config(config)
            .connector(course_connector())
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_serves_ranges_over_tcp() {
        let server = ServerBuilder::new()
            .connector(course_connector())
            .build()
            .unwrap();
        let prepared = server.prepare().await.unwrap();

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, prepared.app, async move {
            let _ = rx.await;
        }));

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/stream/2", addr))
            .header("Range", "bytes=100-199")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 206);
        assert_eq!(
            resp.headers()["content-range"].to_str().unwrap(),
            "bytes 100-199/4096"
        );
        assert_eq!(resp.bytes().await.unwrap().len(), 100);

        let resp = client
            .get(format!("http://{}/stream/42", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
