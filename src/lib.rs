//! TeloView - Local Video Course Browser
//!
//! TeloView turns a message channel used as a video course into a
//! browsable, streamable course served from localhost. The channel
//! history is read once at startup and folded into modules and lessons;
//! lessons are then streamed to the browser with HTTP byte-range support,
//! pulling only the chunks each request needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Browser / Player                        │
//! └──────────────┬───────────────────────────────┬───────────────┘
//!                │ GET /api/course               │ GET /stream/:id
//!                │                               │ Range: bytes=a-b
//! ┌──────────────▼───────────────────────────────▼───────────────┐
//! │                        TeloView API                          │
//! │  ┌──────────────────────┐    ┌─────────────────────────────┐ │
//! │  │   Course endpoints   │    │      Streaming Proxy        │ │
//! │  │  - outline JSON      │    │  - range parsing            │ │
//! │  │  - health            │    │  - chunk window (lazy)      │ │
//! │  └──────────┬───────────┘    └──────────────┬──────────────┘ │
//! │             │ Arc<CourseStructure>          │                │
//! │  ┌──────────▼───────────┐                   │                │
//! │  │   Content Indexer    │                   │                │
//! │  │  - classify messages │                   │                │
//! │  │  - normalize titles  │                   │                │
//! │  └──────────┬───────────┘                   │                │
//! └─────────────┼───────────────────────────────┼────────────────┘
//!               │ fetch_messages                │ open_chunked_download
//! ┌─────────────▼───────────────────────────────▼────────────────┐
//! │                     Channel Connector                        │
//! │        local directory  │  HTTP message gateway              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`connector`]: Message source abstraction and implementations
//! - [`course`]: Content indexer, classifier and title normalizer
//! - [`stream`]: HTTP range streaming proxy
//! - [`api`]: Unified HTTP router
//! - [`server`]: Startup lifecycle and bootstrap helpers
//! - [`library`]: Local registry of known courses
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod connector;
pub mod course;
pub mod error;
pub mod library;
pub mod server;
pub mod stream;

pub use config::TeloViewConfig;
pub use error::{Error, Result};
