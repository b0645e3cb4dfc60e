//! S3 wire-level definitions the proxy must reproduce exactly.

use serde::Serialize;

/// User-metadata key holding the hex-encoded wrapped DEK of an object.
///
/// Lowercase only: S3 lowercases every metadata key in transit.
pub const DEK_METADATA_KEY: &str = "constellation-dek";

/// Keyservice identifier of the process-lifetime key-encryption key.
pub const KEK_ID: &str = "s3proxy-kek";

/// `x-amz-content-sha256` value that disables payload signing.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Content type substituted when a PutObject request carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

// ---------------------------------------------------------------------------
// Error documents
// ---------------------------------------------------------------------------

/// `XAmzContentSHA256Mismatch` error document, field for field as S3 sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "Error")]
pub struct ContentSha256Mismatch {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "ClientComputedContentSHA256")]
    pub client_computed: String,
    #[serde(rename = "S3ComputedContentSHA256")]
    pub s3_computed: String,
}

impl ContentSha256Mismatch {
    /// Build the document from the client-declared and the computed digest.
    pub fn new(client_computed: String, s3_computed: String) -> Self {
        Self {
            code: "XAmzContentSHA256Mismatch".into(),
            message: "The provided 'x-amz-content-sha256' header does not match what was computed."
                .into(),
            client_computed,
            s3_computed,
        }
    }

    /// Serialise to the XML body returned to the client.
    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        quick_xml::se::to_string(self)
    }
}
