//! Axum request handlers: the classifying dispatcher and the intercepted
//! GetObject / PutObject paths.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use aws_sdk_s3::primitives::DateTime;
use common::protocol::{DEFAULT_CONTENT_TYPE, DEK_METADATA_KEY};
use common::ProxyError;
use tracing::debug;

use crate::aws::{GetObjectInput, PutObjectInput, S3Error};
use crate::crypto;

use super::error::ErrorReply;
use super::headers::{self, header_bytes, header_string, header_value};
use super::integrity;
use super::router::{classify, ObjectPath, QueryParams, Route};
use super::state::AppState;

/// Single entry point for every request.
pub async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    let host = request_host(&req);
    let query = QueryParams::parse(req.uri().query());
    let route = classify(
        req.method(),
        &host,
        req.uri().path(),
        &query,
        req.headers(),
        state.allow_multipart,
    );
    debug!(
        method = %req.method(),
        host = %host,
        path = %req.uri().path(),
        route = route.label(),
        "classified request"
    );

    let result = match route {
        Route::GetObject(object) => get_object(&state, object, &query, req.headers()).await,
        Route::PutObject(object) => put_object(&state, object, req).await,
        Route::Blocked(op) => Err(ProxyError::NotImplemented(format!(
            "s3proxy is configured to block {} requests",
            op.name()
        ))),
        Route::Forward => state.forwarder.forward(req, &host).await,
    };
    result.unwrap_or_else(|err| ErrorReply(err).into_response())
}

/// `Host` header, falling back to the URI authority.
fn request_host(req: &Request) -> String {
    header_value(req.headers(), header::HOST.as_str())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Fetch an object and decrypt it when it carries a wrapped DEK.
async fn get_object(
    state: &AppState,
    object: ObjectPath,
    query: &QueryParams,
    request_headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    if request_headers
        .get(header::RANGE)
        .is_some_and(|v| !v.is_empty())
    {
        return Err(ProxyError::NotImplemented(
            "s3proxy currently does not support Range headers".into(),
        ));
    }

    let input = GetObjectInput {
        bucket: object.bucket,
        key: object.key,
        version_id: query
            .get("versionId")
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
        sse: headers::sse_customer(request_headers),
    };
    let output = state.store.get_object(input).await.map_err(upstream_error)?;

    let body = match headers::metadata_entry(&output.metadata, DEK_METADATA_KEY) {
        Some(encoded) => {
            let wrapped_dek = hex::decode(encoded)
                .map_err(|e| ProxyError::Internal(format!("decoding DEK: {e}")))?;
            let plaintext = crypto::decrypt(&output.body, &wrapped_dek, state.kek.as_bytes())
                .map_err(|e| ProxyError::Internal(format!("decrypting object: {e}")))?;
            Body::from(plaintext)
        }
        None => {
            debug!("object has no DEK metadata, returning it unchanged");
            Body::from(output.body)
        }
    };

    let mut response = Response::new(body);
    headers::apply_object_headers(response.headers_mut(), &output.headers);
    if let Some(content_type) = output
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

/// Verify, encrypt, and upload an object body.
async fn put_object(
    state: &AppState,
    object: ObjectPath,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();
    let request_headers = &parts.headers;
    let body = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ProxyError::Internal(format!("reading body: {e}")))?;

    integrity::check_content_sha256(
        header_bytes(request_headers, headers::X_AMZ_CONTENT_SHA256),
        &body,
    )?;

    let mut metadata = headers::user_metadata(request_headers);
    let retain_until =
        parse_retain_until(header_bytes(request_headers, headers::X_AMZ_RETAIN_UNTIL))?;

    integrity::check_content_md5(header_bytes(request_headers, headers::CONTENT_MD5), &body)?;

    let lock_mode = header_string(request_headers, headers::X_AMZ_LOCK_MODE);
    if lock_mode.is_some() != retain_until.is_some() {
        return Err(ProxyError::BadRequest(format!(
            "{} and {} must be set together",
            headers::X_AMZ_LOCK_MODE,
            headers::X_AMZ_RETAIN_UNTIL
        )));
    }

    let envelope = crypto::encrypt(&body, state.kek.as_bytes())
        .map_err(|e| ProxyError::Internal(format!("encrypting object: {e}")))?;
    metadata.insert(DEK_METADATA_KEY.to_owned(), hex::encode(&envelope.wrapped_dek));

    let input = PutObjectInput {
        bucket: object.bucket,
        key: object.key,
        content_md5: integrity::content_md5(&envelope.ciphertext),
        body: envelope.ciphertext,
        content_type: header_string(request_headers, header::CONTENT_TYPE.as_str())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
        tagging: header_string(request_headers, headers::X_AMZ_TAGGING),
        metadata,
        object_lock_legal_hold: header_string(request_headers, headers::X_AMZ_LEGAL_HOLD),
        object_lock_mode: lock_mode,
        object_lock_retain_until: retain_until,
        sse: headers::sse_customer(request_headers),
    };
    let output = state.store.put_object(input).await.map_err(upstream_error)?;

    let mut response = Response::new(Body::empty());
    headers::apply_put_headers(response.headers_mut(), &output);
    Ok(response)
}

/// Parse an RFC 3339 retain-until date; numeric offsets are accepted.
fn parse_retain_until(raw: Option<&[u8]>) -> Result<Option<DateTime>, ProxyError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parse_error = |e: &dyn std::fmt::Display| {
        ProxyError::Internal(format!("parsing {}: {e}", headers::X_AMZ_RETAIN_UNTIL))
    };
    let raw = std::str::from_utf8(raw).map_err(|e| parse_error(&e))?;
    let parsed = chrono::DateTime::parse_from_rfc3339(raw).map_err(|e| parse_error(&e))?;
    Ok(Some(DateTime::from_secs_and_nanos(
        parsed.timestamp(),
        parsed.timestamp_subsec_nanos(),
    )))
}

fn upstream_error(err: S3Error) -> ProxyError {
    ProxyError::Upstream {
        status: err.status_code(),
        message: err.message,
    }
}
