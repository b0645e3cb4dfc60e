//! Axum middleware hooks applied to the router.
//!
//! Includes the per-request tracing span and the panic-to-500 conversion.

use std::any::Any;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info_span, Span};
use uuid::Uuid;

/// Span opened by `TraceLayer` around every request.
///
/// The query string is left out: presigned URLs carry credentials there.
pub fn make_request_span(req: &Request<Body>) -> Span {
    info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    )
}

/// Response sent when a handler panics.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn boom() -> &'static str {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_handler_returns_500() {
        let app = Router::new()
            .route("/", get(boom))
            .layer(CatchPanicLayer::custom(panic_response));

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn span_is_created_for_request() {
        let req = Request::builder()
            .method("PUT")
            .uri("/b/k?X-Amz-Signature=secret")
            .body(Body::empty())
            .unwrap();
        // No subscriber is installed, so the span is disabled but must still build.
        let _span = make_request_span(&req);
    }
}
