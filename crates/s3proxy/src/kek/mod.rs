//! KEK (key-encryption key) bootstrap.
//!
//! # Lifecycle
//!
//! 1. At startup, [`fetch_kek`] asks the keyservice for the key registered
//!    under `s3proxy-kek`, exactly once.
//! 2. The KEK lives only in process memory as a [`Kek`], shared read-only
//!    by every request task for the lifetime of the process.
//! 3. A failure at any step is fatal: no request is served without a KEK.
//!
//! # Security invariants
//!
//! - The KEK is **never** written to disk, logged, or included in any
//!   outbound message, header, or error.

pub mod client;
pub mod key;

pub use client::{GrpcKeyService, KeyService};
pub use key::Kek;

use common::protocol::KEK_ID;
use thiserror::Error;
use tracing::info;

use crate::crypto::{self, KEY_LEN};

/// Errors produced while acquiring the KEK.
#[derive(Debug, Error)]
pub enum KekError {
    /// The keyservice endpoint could not be reached.
    #[error("keyservice connection failed: {0}")]
    Connect(String),

    /// The keyservice answered the RPC with an error status.
    #[error("keyservice GetDataKey failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The returned key material has an unexpected length.
    #[error("KEK has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fetch the process-lifetime KEK from `service`.
///
/// # Errors
///
/// Returns an error if the RPC fails or the key is not exactly [`KEY_LEN`] bytes.
pub async fn fetch_kek(service: &dyn KeyService) -> Result<Kek, KekError> {
    let mut bytes = service.get_data_key(KEK_ID, KEY_LEN as u32).await?;
    let kek = Kek::from_slice(&bytes);
    crypto::wipe(&mut bytes);
    let kek = kek?;
    info!(key_id = KEK_ID, "KEK fetched");
    Ok(kek)
}
