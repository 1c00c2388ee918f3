//! Bulldozer HTTP service
//!
//! This crate exposes the bulldozer policy engine to GitHub. It receives webhook
//! deliveries, verifies their signatures, and hands the parsed notifications to the
//! engine's [`EventRouter`] without waiting for them to be processed.
//!
//! # Routes
//!
//! - `POST /api/github/hook`: webhook intake
//! - `GET  /api/health`: liveness check
//!
//! The binary in `main.rs` reads [`settings::ServerSettings`], wires up the GitHub
//! clients and the engine, runs the startup sweep and serves the routes.

use bulldozer_core::EventRouter;
use std::sync::Arc;

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settings;

pub use errors::{ApiError, ErrorResponse};
pub use server::{ApiConfig, ApiServer};

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Routes notifications to the policy engine
    pub events: EventRouter,

    /// Webhook secret; `None` disables signature checks
    pub webhook_secret: Option<Arc<[u8]>>,
}

impl AppState {
    pub fn new(events: EventRouter, webhook_secret: Option<String>) -> Self {
        Self {
            events,
            webhook_secret: webhook_secret.map(|s| Arc::from(s.into_bytes())),
        }
    }
}
