//! AES-256-GCM envelope encryption primitives.
//!
//! This module is free of AWS and HTTP dependencies.
//!
//! # Wire format
//!
//! ```text
//! object body:  nonce(12) || ciphertext(len(plaintext)) || tag(16)
//! wrapped DEK:  nonce(12) || ciphertext(32)             || tag(16)
//! ```
//!
//! The wrapped DEK travels as lowercase hex in the `constellation-dek` user
//! metadata entry of the object.

pub mod cipher;
pub mod envelope;

pub use cipher::{wipe, KEY_LEN};
pub use envelope::{decrypt, encrypt};
