//! Request header extraction and the response header pass-through matrix.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::aws::{ObjectHeaders, PutObjectOutput, SseCustomer};

pub const CONTENT_MD5: &str = "content-md5";
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";
pub const X_AMZ_COPY_SOURCE: &str = "x-amz-copy-source";
pub const X_AMZ_TAGGING: &str = "x-amz-tagging";
pub const X_AMZ_META_PREFIX: &str = "x-amz-meta-";
pub const X_AMZ_LEGAL_HOLD: &str = "x-amz-object-lock-legal-hold";
pub const X_AMZ_LOCK_MODE: &str = "x-amz-object-lock-mode";
pub const X_AMZ_RETAIN_UNTIL: &str = "x-amz-object-lock-retain-until-date";
pub const X_AMZ_SSE_CUSTOMER_ALGORITHM: &str = "x-amz-server-side-encryption-customer-algorithm";
pub const X_AMZ_SSE_CUSTOMER_KEY: &str = "x-amz-server-side-encryption-customer-key";
pub const X_AMZ_SSE_CUSTOMER_KEY_MD5: &str = "x-amz-server-side-encryption-customer-key-md5";
pub const X_AMZ_SSE_KMS_KEY_ID: &str = "x-amz-server-side-encryption-aws-kms-key-id";
pub const X_AMZ_SSE_CONTEXT: &str = "x-amz-server-side-encryption-context";
pub const X_AMZ_SSE: &str = "x-amz-server-side-encryption";
pub const X_AMZ_EXPIRATION: &str = "x-amz-expiration";
pub const X_AMZ_VERSION_ID: &str = "x-amz-version-id";
pub const X_AMZ_CHECKSUM_CRC32: &str = "x-amz-checksum-crc32";
pub const X_AMZ_CHECKSUM_CRC32C: &str = "x-amz-checksum-crc32c";
pub const X_AMZ_CHECKSUM_SHA1: &str = "x-amz-checksum-sha1";
pub const X_AMZ_CHECKSUM_SHA256: &str = "x-amz-checksum-sha256";

/// Value of `name` as a string; missing, empty, and non-UTF-8 values are `None`.
pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Raw bytes of `name`; missing and empty values are `None`.
///
/// Used where a present but non-UTF-8 value must still be validated.
pub fn header_bytes<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a [u8]> {
    headers
        .get(name)
        .map(HeaderValue::as_bytes)
        .filter(|v| !v.is_empty())
}

/// Owned variant of [`header_value`].
pub fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    header_value(headers, name).map(str::to_owned)
}

/// Collect `x-amz-meta-*` headers into a metadata map.
///
/// Keys are lowercased with the prefix stripped; repeated headers are joined
/// with `","`.
pub fn user_metadata(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            let key = name.as_str().strip_prefix(X_AMZ_META_PREFIX)?;
            let joined = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(",");
            Some((key.to_owned(), joined))
        })
        .collect()
}

/// SSE-C headers of the inbound request.
pub fn sse_customer(headers: &HeaderMap) -> SseCustomer {
    SseCustomer {
        algorithm: header_string(headers, X_AMZ_SSE_CUSTOMER_ALGORITHM),
        key: header_string(headers, X_AMZ_SSE_CUSTOMER_KEY),
        key_md5: header_string(headers, X_AMZ_SSE_CUSTOMER_KEY_MD5),
    }
}

/// Case-insensitive lookup in an S3 user-metadata map.
pub fn metadata_entry<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Copy every field S3 set on a GetObject/PutObject response.
pub fn apply_object_headers(target: &mut HeaderMap, src: &ObjectHeaders) {
    let fields = [
        ("etag", src.etag.as_deref().map(|e| e.trim_matches('"'))),
        (X_AMZ_EXPIRATION, src.expiration.as_deref()),
        (X_AMZ_CHECKSUM_CRC32, src.checksum_crc32.as_deref()),
        (X_AMZ_CHECKSUM_CRC32C, src.checksum_crc32c.as_deref()),
        (X_AMZ_CHECKSUM_SHA1, src.checksum_sha1.as_deref()),
        (X_AMZ_CHECKSUM_SHA256, src.checksum_sha256.as_deref()),
        (X_AMZ_SSE_CUSTOMER_ALGORITHM, src.sse_customer_algorithm.as_deref()),
        (X_AMZ_SSE_CUSTOMER_KEY_MD5, src.sse_customer_key_md5.as_deref()),
        (X_AMZ_SSE_KMS_KEY_ID, src.sse_kms_key_id.as_deref()),
        (X_AMZ_SSE_CONTEXT, src.sse_context.as_deref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            set(target, name, value);
        }
    }
}

/// Headers of a successful PutObject: the object matrix plus version id and
/// `x-amz-server-side-encryption`, which is always emitted.
pub fn apply_put_headers(target: &mut HeaderMap, output: &PutObjectOutput) {
    set(target, X_AMZ_SSE, &output.server_side_encryption);
    if let Some(version_id) = &output.version_id {
        set(target, X_AMZ_VERSION_ID, version_id);
    }
    apply_object_headers(target, &output.headers);
}

fn set(target: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            target.insert(HeaderName::from_static(name), v);
        }
        Err(_) => warn!(header = name, "dropping upstream header with invalid value"),
    }
}
