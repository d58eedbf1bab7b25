//! Unified API router for TeloView
//!
//! Merges the streaming proxy with the read-only course endpoints into a
//! single axum `Router` with CORS and request tracing.
//!
//! ## Endpoint Map
//!
//! | Path                 | Description                                  |
//! |----------------------|----------------------------------------------|
//! | `/`                  | Course player page                           |
//! | `/health`            | Liveness probe                               |
//! | `/api/course`        | Course title and module/lesson outline       |
//! | `/stream/:id`        | Lesson media with byte-range support         |

use crate::course::CourseStructure;
use crate::stream::{stream_router, StreamState};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Read-only course data shared with handlers
#[derive(Clone)]
pub struct CourseState {
    pub title: Arc<str>,
    pub default_module: Arc<str>,
    pub course: Arc<CourseStructure>,
}

/// Build the complete TeloView HTTP application
pub fn build_app(
    course_state: CourseState,
    stream_state: StreamState,
    cors_origins: &[String],
) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .merge(course_router(course_state))
        .merge(stream_router(stream_state))
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn course_router(state: CourseState) -> Router {
    Router::new()
        .route("/api/course", get(get_course))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Player page; renders the outline from `/api/course`
const INDEX_HTML: &str = include_str!("../static/index.html");

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseResponse<'a> {
    title: &'a str,
    /// No section headers were found; render as a flat playlist
    flat: bool,
    lesson_count: usize,
    modules: &'a CourseStructure,
}

/// GET /api/course
async fn get_course(State(state): State<CourseState>) -> Response {
    let body = CourseResponse {
        title: &state.title,
        flat: state.course.is_flat(&state.default_module),
        lesson_count: state.course.lesson_count(),
        modules: &state.course,
    };
    match serde_json::to_value(&body) {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize course: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::RANGE, header::ACCEPT])
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
