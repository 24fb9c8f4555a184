//! Web front end: axum router, page rendering and embedded assets.

pub mod flash;
pub mod render;
mod server;
pub mod templates;

pub use server::{ServerHandle, WebServer, build_router, start_server};
