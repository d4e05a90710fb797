//! Infrastructure adapters: logging bootstrap and I/O errors.

pub mod error;
pub mod telemetry;
