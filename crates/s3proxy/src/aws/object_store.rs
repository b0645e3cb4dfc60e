//! [`ObjectStore`] trait and its `aws-sdk-s3` implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{ObjectLockLegalHoldStatus, ObjectLockMode};
use bytes::Bytes;
use thiserror::Error;

/// Marker the SDK error text carries when S3 answered with an HTTP status.
const STATUS_MARKER: &str = "https response error StatusCode: ";

/// SSE-C parameters forwarded verbatim on both GET and PUT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseCustomer {
    pub algorithm: Option<String>,
    pub key: Option<String>,
    pub key_md5: Option<String>,
}

/// Parameters of an upstream GetObject call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetObjectInput {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub sse: SseCustomer,
}

/// Parameters of an upstream PutObject call.
///
/// `body` is already ciphertext and `content_md5` is its digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutObjectInput {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_md5: String,
    pub content_type: String,
    pub tagging: Option<String>,
    pub metadata: HashMap<String, String>,
    pub object_lock_legal_hold: Option<String>,
    pub object_lock_mode: Option<String>,
    pub object_lock_retain_until: Option<DateTime>,
    pub sse: SseCustomer,
}

/// Response fields the handlers copy to the client when S3 sets them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub etag: Option<String>,
    pub expiration: Option<String>,
    pub checksum_crc32: Option<String>,
    pub checksum_crc32c: Option<String>,
    pub checksum_sha1: Option<String>,
    pub checksum_sha256: Option<String>,
    pub sse_customer_algorithm: Option<String>,
    pub sse_customer_key_md5: Option<String>,
    pub sse_kms_key_id: Option<String>,
    pub sse_context: Option<String>,
}

/// Result of a GetObject call with the body fully read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetObjectOutput {
    pub headers: ObjectHeaders,
    pub content_type: Option<String>,
    /// User metadata with S3's lowercased keys.
    pub metadata: HashMap<String, String>,
    pub body: Bytes,
}

/// Result of a PutObject call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub headers: ObjectHeaders,
    pub version_id: Option<String>,
    /// Empty when S3 did not report a server-side encryption algorithm.
    pub server_side_encryption: String,
}

/// Error returned by an upstream S3 call.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct S3Error {
    /// HTTP status of the S3 response, when one was received.
    pub status: Option<u16>,
    /// Full error text, including the S3 error code and request id.
    pub message: String,
}

impl S3Error {
    /// Build from an SDK error, keeping the raw response status.
    fn from_sdk<E>(operation: &str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|r| r.status().as_u16());
        Self {
            status,
            message: format!("operation error S3: {operation}, {}", DisplayErrorContext(&err)),
        }
    }

    /// Status code to report downstream.
    ///
    /// Prefers the raw response status, falls back to a status embedded in the
    /// error text, and otherwise reports 500. A 2xx raw status (a response whose
    /// body failed to parse) also maps to 500.
    pub fn status_code(&self) -> u16 {
        self.status
            .filter(|s| !(200..300).contains(s))
            .or_else(|| status_from_message(&self.message))
            .unwrap_or(500)
    }
}

/// Extract `<N>` from `"https response error StatusCode: <N>"` in `message`.
pub fn status_from_message(message: &str) -> Option<u16> {
    let start = message.find(STATUS_MARKER)? + STATUS_MARKER.len();
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Typed GetObject / PutObject access to the upstream S3 endpoint.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error>;

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error>;
}

/// [`ObjectStore`] backed by an `aws-sdk-s3` client.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error> {
        let output = self
            .client
            .get_object()
            .bucket(input.bucket)
            .key(input.key)
            .set_version_id(input.version_id)
            .set_sse_customer_algorithm(input.sse.algorithm)
            .set_sse_customer_key(input.sse.key)
            .set_sse_customer_key_md5(input.sse.key_md5)
            .send()
            .await
            .map_err(|e| S3Error::from_sdk("GetObject", e))?;

        let headers = ObjectHeaders {
            etag: output.e_tag().map(str::to_owned),
            expiration: output.expiration().map(str::to_owned),
            checksum_crc32: output.checksum_crc32().map(str::to_owned),
            checksum_crc32c: output.checksum_crc32_c().map(str::to_owned),
            checksum_sha1: output.checksum_sha1().map(str::to_owned),
            checksum_sha256: output.checksum_sha256().map(str::to_owned),
            sse_customer_algorithm: output.sse_customer_algorithm().map(str::to_owned),
            sse_customer_key_md5: output.sse_customer_key_md5().map(str::to_owned),
            sse_kms_key_id: output.ssekms_key_id().map(str::to_owned),
            sse_context: output
                .server_side_encryption()
                .map(|sse| sse.as_str().to_owned())
                .filter(|s| !s.is_empty()),
        };
        let content_type = output.content_type().map(str::to_owned);
        let metadata = output.metadata().cloned().unwrap_or_default();

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| S3Error {
                status: None,
                message: format!("reading GetObject body: {e}"),
            })?
            .into_bytes();

        Ok(GetObjectOutput {
            headers,
            content_type,
            metadata,
            body,
        })
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error> {
        let output = self
            .client
            .put_object()
            .bucket(input.bucket)
            .key(input.key)
            .body(ByteStream::from(input.body))
            .content_md5(input.content_md5)
            .content_type(input.content_type)
            .set_metadata(Some(input.metadata))
            .set_tagging(input.tagging)
            .set_object_lock_legal_hold_status(
                input
                    .object_lock_legal_hold
                    .map(|s| ObjectLockLegalHoldStatus::from(s.as_str())),
            )
            .set_object_lock_mode(input.object_lock_mode.map(|s| ObjectLockMode::from(s.as_str())))
            .set_object_lock_retain_until_date(input.object_lock_retain_until)
            .set_sse_customer_algorithm(input.sse.algorithm)
            .set_sse_customer_key(input.sse.key)
            .set_sse_customer_key_md5(input.sse.key_md5)
            .send()
            .await
            .map_err(|e| S3Error::from_sdk("PutObject", e))?;

        Ok(PutObjectOutput {
            headers: ObjectHeaders {
                etag: output.e_tag().map(str::to_owned),
                expiration: output.expiration().map(str::to_owned),
                checksum_crc32: output.checksum_crc32().map(str::to_owned),
                checksum_crc32c: output.checksum_crc32_c().map(str::to_owned),
                checksum_sha1: output.checksum_sha1().map(str::to_owned),
                checksum_sha256: output.checksum_sha256().map(str::to_owned),
                sse_customer_algorithm: output.sse_customer_algorithm().map(str::to_owned),
                sse_customer_key_md5: output.sse_customer_key_md5().map(str::to_owned),
                sse_kms_key_id: output.ssekms_key_id().map(str::to_owned),
                sse_context: output.ssekms_encryption_context().map(str::to_owned),
            },
            version_id: output.version_id().map(str::to_owned),
            server_side_encryption: output
                .server_side_encryption()
                .map(|sse| sse.as_str().to_owned())
                .unwrap_or_default(),
        })
    }
}
