//! Proxy error taxonomy shared across crates.

use thiserror::Error;

use crate::protocol::ContentSha256Mismatch;

/// Top-level per-request error type.
///
/// Variants map to HTTP status codes returned to the S3 client:
/// - [`ProxyError::BadRequest`] → 400
/// - [`ProxyError::ContentSha256Mismatch`] → 400 (S3 XML body)
/// - [`ProxyError::NotImplemented`] → 501
/// - [`ProxyError::Upstream`] → the status reported by S3
/// - [`ProxyError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The client sent something the proxy refuses before contacting S3.
    #[error("{0}")]
    BadRequest(String),

    /// The `x-amz-content-sha256` header does not match the received body.
    #[error("x-amz-content-sha256 mismatch")]
    ContentSha256Mismatch(ContentSha256Mismatch),

    /// The request uses a feature the proxy cannot serve for encrypted objects.
    #[error("{0}")]
    NotImplemented(String),

    /// S3 answered with an error status; the message is the SDK error text.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Crypto, decoding, or I/O failure inside the proxy.
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ProxyError::BadRequest(_) => 400,
            ProxyError::ContentSha256Mismatch(_) => 400,
            ProxyError::NotImplemented(_) => 501,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Internal(_) => 500,
        }
    }

    /// Render the response body.
    ///
    /// Every variant is plain text except the digest mismatch, which is the
    /// XML document S3 itself returns so that SDKs can parse it.
    pub fn body(&self) -> String {
        match self {
            ProxyError::ContentSha256Mismatch(detail) => detail
                .to_xml()
                .unwrap_or_else(|e| format!("marshalling error: {e}")),
            other => other.to_string(),
        }
    }

    /// Whether the body is an S3 XML error document.
    pub fn is_xml(&self) -> bool {
        matches!(self, ProxyError::ContentSha256Mismatch(_))
    }
}
