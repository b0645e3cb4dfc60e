//! Envelope encryption of object bodies.
//!
//! Each call to [`encrypt`] draws a fresh 256-bit DEK, seals the body under it,
//! and wraps the DEK under the long-lived KEK. The DEK never leaves this module
//! in plaintext and is zeroed when dropped.

use aes_gcm::aead::{rand_core::RngCore, OsRng};

use super::cipher::{self, CipherError, KEY_LEN};

/// Output of [`encrypt`]: the sealed body plus the KEK-wrapped DEK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// `nonce || ciphertext || tag` of the object body.
    pub ciphertext: Vec<u8>,
    /// `nonce || ciphertext || tag` of the DEK under the KEK.
    pub wrapped_dek: Vec<u8>,
}

/// Single-use data encryption key, zeroed on drop.
struct DataKey([u8; KEY_LEN]);

impl DataKey {
    fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        cipher::wipe(&mut self.0);
    }
}

/// Encrypt `plaintext` under a freshly generated DEK and wrap that DEK under `kek`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `kek` is not [`KEY_LEN`] bytes.
pub fn encrypt(plaintext: &[u8], kek: &[u8]) -> Result<Envelope, CipherError> {
    let dek = DataKey::generate();
    let ciphertext = cipher::seal(plaintext, &dek.0)?;
    let wrapped_dek = cipher::seal(&dek.0, kek)?;
    Ok(Envelope {
        ciphertext,
        wrapped_dek,
    })
}

/// Unwrap `wrapped_dek` under `kek` and open `ciphertext` with the recovered DEK.
///
/// # Errors
///
/// Returns a [`CipherError`] if either open fails or the unwrapped DEK has the
/// wrong length.
pub fn decrypt(ciphertext: &[u8], wrapped_dek: &[u8], kek: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut unwrapped = cipher::open(wrapped_dek, kek)?;
    let dek = DataKey::from_slice(&unwrapped);
    cipher::wipe(&mut unwrapped);
    cipher::open(ciphertext, &dek?.0)
}
