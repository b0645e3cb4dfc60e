//! Common types, S3 wire definitions, and errors shared across `s3proxy` crates.

pub mod error;
pub mod protocol;

pub use error::ProxyError;
