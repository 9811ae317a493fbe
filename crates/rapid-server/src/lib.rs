//! HTTP server for Rapid.
//!
//! The request path is the store path: `GET /users/1` reads an item,
//! `POST /users` writes into a collection, `DELETE /users` removes the whole
//! scope. `/_health` and `/_info` are reserved for the server itself.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{RapidConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, HealthResponse};
pub use server::RapidServer;
