//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No key material or object bodies** may appear in any span attribute
//!   or log field. SSE-C customer keys are never logged either.
//! - Verbosity comes from `--level` (default: `info`); `RUST_LOG` overrides it.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
