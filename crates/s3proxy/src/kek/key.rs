//! [`Kek`]: the process-lifetime key-encryption key.

use crate::crypto::{self, KEY_LEN};

use super::KekError;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Created once at startup and shared read-only across request tasks.
/// The memory is overwritten with zeroes on drop.
pub struct Kek(Box<[u8; KEY_LEN]>);

impl Kek {
    /// Copy `bytes` into a new key buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KekError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KekError> {
        if bytes.len() != KEY_LEN {
            return Err(KekError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for Kek {
    fn drop(&mut self) {
        crypto::wipe(&mut self.0[..]);
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("Kek([REDACTED])")
    }
}
