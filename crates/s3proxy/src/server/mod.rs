//! HTTP(S) server, request classification, and the object handlers.
//!
//! # Responsibilities
//! - Bind the listener and terminate TLS (rustls, HTTP/1.1 only).
//! - Classify every request and dispatch it to the GetObject / PutObject
//!   handlers, a multipart blocker, or the pass-through forwarder.
//! - Inject shared application state (`AppState`) into handlers.

pub mod error;
pub mod forward;
pub mod handlers;
pub mod headers;
pub mod integrity;
pub mod listener;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;

#[cfg(test)]
pub mod testing;
