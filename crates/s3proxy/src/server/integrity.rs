//! Pre-flight integrity checks on PutObject bodies and digest helpers.
//!
//! Both checks run on the plaintext the client sent, before any key is
//! generated and before S3 is contacted.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{ContentSha256Mismatch, UNSIGNED_PAYLOAD};
use common::ProxyError;
use md5::{Digest, Md5};
use sha2::Sha256;

/// Byte length of an MD5 digest.
const MD5_LEN: usize = 16;

/// Lowercase hex SHA-256 of `body`.
pub fn sha256_hex(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Base64 MD5 of `body`, as carried in `Content-MD5`.
pub fn content_md5(body: &[u8]) -> String {
    STANDARD.encode(Md5::digest(body))
}

/// Verify a client-declared `x-amz-content-sha256` against `body`.
///
/// An absent header and `UNSIGNED-PAYLOAD` both pass. The declared value is
/// compared as raw bytes, so a non-UTF-8 header is a mismatch.
///
/// # Errors
///
/// Returns [`ProxyError::ContentSha256Mismatch`] carrying both digests.
pub fn check_content_sha256(declared: Option<&[u8]>, body: &[u8]) -> Result<(), ProxyError> {
    let Some(declared) = declared else {
        return Ok(());
    };
    if declared == UNSIGNED_PAYLOAD.as_bytes() {
        return Ok(());
    }
    let computed = sha256_hex(body);
    if declared != computed.as_bytes() {
        return Err(ProxyError::ContentSha256Mismatch(ContentSha256Mismatch::new(
            String::from_utf8_lossy(declared).into_owned(),
            computed,
        )));
    }
    Ok(())
}

/// Verify a client-declared `Content-MD5` against `body`.
///
/// # Errors
///
/// Returns [`ProxyError::BadRequest`] if the header is not base64 (including
/// non-UTF-8 bytes), does not decode to 16 bytes, or does not match the body.
pub fn check_content_md5(declared: Option<&[u8]>, body: &[u8]) -> Result<(), ProxyError> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let expected = STANDARD
        .decode(declared)
        .map_err(|e| bad_md5(format!("decoding base64: {e}")))?;
    if expected.len() != MD5_LEN {
        return Err(bad_md5(format!(
            "content-md5 must be {MD5_LEN} bytes long, got {} bytes",
            expected.len()
        )));
    }
    let actual = Md5::digest(body);
    if actual.as_slice() != expected.as_slice() {
        return Err(bad_md5(format!(
            "content-md5 mismatch, header is {}, body is {}",
            hex::encode(&expected),
            hex::encode(actual)
        )));
    }
    Ok(())
}

fn bad_md5(reason: String) -> ProxyError {
    ProxyError::BadRequest(format!("validating content md5: {reason}"))
}
