//! Process entry: server lifecycle and bootstrap helpers

mod bootstrap;
mod lifecycle;

pub use bootstrap::{bind_first_free, browser_url, open_browser};
pub use lifecycle::{ctrl_c, serve, PreparedCourse, Server, ServerBuilder, ServerState};
