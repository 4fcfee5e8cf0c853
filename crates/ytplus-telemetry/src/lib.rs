#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Logging setup shared by the YT Downloader Plus client crates.
//!
//! Layout:
//! - `init.rs`: subscriber installation and format selection
//! - `error.rs`: error type for initialisation failures

pub mod error;
pub mod init;

pub use error::{Result, TelemetryError};
pub use init::{
    CommandSpanGuard, DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, client_version, init_logging,
};
