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
#![allow(clippy::module_name_repetitions)]
//! Client-side controller for the YT Downloader Plus web backend.
//!
//! Layout:
//! - `api.rs`: backend contract (`DownloaderApi`) and its reqwest implementation
//! - `view.rs`: UI adapter contract (`StatusView`) and the view models it renders
//! - `form.rs`: download form validation
//! - `poll.rs`: adaptive poll delay state machine
//! - `reconcile.rs`: pure helpers folding status snapshots into view models
//! - `controller.rs`: the controller wiring all of the above to UI events
//! - `config.rs` / `error.rs`: tunables and the error taxonomy

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod poll;
pub mod reconcile;
pub mod view;

pub use api::{DownloaderApi, HEADER_REQUEST_ID, HttpDownloaderApi, status_within};
pub use config::{ControllerConfig, PollConfig};
pub use controller::{Activity, CancelOutcome, Controller, Reconciliation, TickOutcome, UiEvent};
pub use error::{ControllerError, ControllerResult};
pub use form::DownloadForm;
pub use poll::{PollOutcome, PollState, TickDecision};
pub use view::{
    ControlState, LogEntry, LogOrigin, NoticeLevel, PreviewView, ProgressView, StatusView,
    Visibility,
};
