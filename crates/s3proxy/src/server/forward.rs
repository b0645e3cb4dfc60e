//! Pass-through forwarding of requests the proxy does not intercept.
//!
//! The inbound request is re-issued with its method, headers, and body
//! untouched, so the client's SigV4 signature stays valid. Only the target
//! URI is rebuilt from the `Host` header.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{uri::PathAndQuery, Extensions, Uri, Version},
    response::Response,
};
use common::ProxyError;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tracing::debug;

/// Scheme used towards S3.
pub const UPSTREAM_SCHEME: &str = "https";

/// Shared HTTP client for pass-through requests.
#[derive(Clone, Debug)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    scheme: Arc<str>,
}

impl Forwarder {
    /// Forwarder that re-issues every request over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS client configuration cannot be built.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_scheme(UPSTREAM_SCHEME)
    }

    /// Forwarder that re-issues every request with `scheme`.
    pub fn with_scheme(scheme: &str) -> anyhow::Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            scheme: Arc::from(scheme),
        })
    }

    /// Send `req` to `host` and stream the upstream response back.
    ///
    /// Status and every response header are copied verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] if the round-trip fails.
    pub async fn forward(&self, req: Request, host: &str) -> Result<Response, ProxyError> {
        let (mut parts, body) = req.into_parts();

        parts.uri = self.target_uri(host, parts.uri.path_and_query())?;
        parts.version = Version::HTTP_11;
        parts.extensions = Extensions::new();
        debug!(method = %parts.method, uri = %parts.uri.path(), "forwarding request");

        let upstream = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| ProxyError::Internal(format!("do request: {e}")))?;

        Ok(upstream.map(Body::new))
    }

    fn target_uri(&self, host: &str, path: Option<&PathAndQuery>) -> Result<Uri, ProxyError> {
        let path = path.map(PathAndQuery::as_str).unwrap_or("/");
        format!("{}://{host}{path}", self.scheme)
            .parse()
            .map_err(|e| ProxyError::Internal(format!("building upstream url: {e}")))
    }
}
