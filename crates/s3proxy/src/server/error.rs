//! HTTP rendering of [`ProxyError`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use common::ProxyError;
use tracing::{error, warn};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_XML: &str = "application/xml";

/// Response wrapper for a [`ProxyError`] raised by a handler.
#[derive(Debug)]
pub struct ErrorReply(pub ProxyError);

impl From<ProxyError> for ErrorReply {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let content_type = if self.0.is_xml() {
            APPLICATION_XML
        } else {
            TEXT_PLAIN
        };
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
            self.0.body(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use common::protocol::ContentSha256Mismatch;

    async fn render(err: ProxyError) -> (StatusCode, String, String) {
        let resp = ErrorReply(err).into_response();
        let status = resp.status();
        let ct = resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_owned();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, ct, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn plain_text_errors() {
        let (status, ct, body) = render(ProxyError::NotImplemented("nope".into())).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(ct, TEXT_PLAIN);
        assert_eq!(body, "nope");
    }

    #[tokio::test]
    async fn upstream_status_is_kept() {
        let (status, _, body) = render(ProxyError::Upstream {
            status: 403,
            message: "AccessDenied".into(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "AccessDenied");
    }

    #[tokio::test]
    async fn invalid_upstream_status_becomes_500() {
        let (status, _, _) = render(ProxyError::Upstream {
            status: 42,
            message: "odd".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn sha256_mismatch_is_xml() {
        let err = ProxyError::ContentSha256Mismatch(ContentSha256Mismatch::new(
            "00".into(),
            "ff".into(),
        ));
        let (status, ct, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ct, APPLICATION_XML);
        assert!(body.contains("<Code>XAmzContentSHA256Mismatch</Code>"));
        assert!(body.contains("<S3ComputedContentSHA256>ff</S3ComputedContentSHA256>"));
    }
}
