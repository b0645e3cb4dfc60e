//! Accept loop serving the router over HTTP/1.1, with or without TLS.
//!
//! For each accepted TCP connection the listener:
//! 1. Completes the TLS handshake when an acceptor is configured.
//! 2. Serves the connection with hyper's HTTP/1 builder, so HTTP/2 is never
//!    negotiated.
//!
//! One task per connection; a failing connection never stops the loop.

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

/// Run the accept loop until `shutdown` is cancelled.
///
/// # Errors
///
/// Currently infallible once the listener is bound; accept errors are logged
/// and the loop continues.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    tls: Option<TlsAcceptor>,
    shutdown: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, tls = tls.is_some(), "listening");
    }

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "accept error");
                    continue;
                }
            },
        };
        debug!(%peer, "accepted TCP connection");

        let router = router.clone();
        let tls = tls.clone();
        tokio::spawn(async move {
            match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(tls_stream) => serve_connection(tls_stream, router, peer).await,
                    Err(e) => warn!(%peer, error = %e, "TLS handshake failed"),
                },
                None => serve_connection(stream, router, peer).await,
            }
        });
    }
}

async fn serve_connection<I>(io: I, router: Router, peer: SocketAddr)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: Request<Incoming>| router.clone().oneshot(req));
    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .await
    {
        debug!(%peer, error = %e, "connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use http_body_util::BodyExt;
    use hyper_util::client::legacy::{connect::HttpConnector, Client};
    use hyper_util::rt::TokioExecutor;

    #[tokio::test]
    async fn serves_http1_and_stops_on_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, router, None, shutdown.clone()));

        let client: Client<HttpConnector, Body> =
            Client::builder(TokioExecutor::new()).build_http();
        let resp = client
            .get(format!("http://{addr}/ping").parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.version(), hyper::Version::HTTP_11);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "pong");

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
