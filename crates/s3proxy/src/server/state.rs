//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::aws::ObjectStore;
use crate::kek::Kek;

use super::forward::Forwarder;

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed or `Copy`, so Axum clones the state per
/// request without copying key material.
#[derive(Clone)]
pub struct AppState {
    /// Process-lifetime key-encryption key.
    pub kek: Arc<Kek>,
    /// Upstream for intercepted GetObject / PutObject calls.
    pub store: Arc<dyn ObjectStore>,
    /// HTTP client for every other request.
    pub forwarder: Forwarder,
    /// Forward multipart upload requests instead of blocking them.
    pub allow_multipart: bool,
}

impl AppState {
    pub fn new(
        kek: Kek,
        store: Arc<dyn ObjectStore>,
        forwarder: Forwarder,
        allow_multipart: bool,
    ) -> Self {
        Self {
            kek: Arc::new(kek),
            store,
            forwarder,
            allow_multipart,
        }
    }
}
