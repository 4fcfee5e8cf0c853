//! Shared error type, command context, and controller wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use url::Url;
use ytplus_controller::{Controller, ControllerConfig, ControllerError, HttpDownloaderApi};

use crate::cli::{Cli, OutputFormat};
use crate::output::TerminalView;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ControllerError> for CliError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Validation(message) => Self::Validation(message),
            ControllerError::Rejected {
                status: 400 | 409 | 422,
                message,
                ..
            } => Self::Validation(message),
            other => Self::failure(other),
        }
    }
}

/// Controller type every command drives.
pub(crate) type CliController<W> = Controller<Arc<HttpDownloaderApi>, Arc<TerminalView<W>>>;

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) api: Arc<HttpDownloaderApi>,
    pub(crate) config: ControllerConfig,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Build the backend client and controller tunables from parsed flags.
    pub(crate) fn from_cli(cli: &Cli, request_id: &str) -> CliResult<Self> {
        let api = HttpDownloaderApi::connect(
            cli.api_url.clone(),
            Duration::from_secs(cli.timeout),
            request_id,
        )
        .map_err(CliError::failure)?;
        let config = ControllerConfig::default()
            .with_status_timeout(Duration::from_secs(cli.status_timeout));

        Ok(Self {
            api: Arc::new(api),
            config,
            output: cli.output,
        })
    }

    /// Controller rendering into `view`.
    pub(crate) fn controller<W>(&self, view: Arc<TerminalView<W>>) -> CliController<W>
    where
        W: Write + Send + 'static,
    {
        Controller::new(Arc::clone(&self.api), view, self.config)
    }

    /// Terminal view writing to `out` in the selected output format.
    pub(crate) fn view<W>(&self, out: W) -> Arc<TerminalView<W>>
    where
        W: Write + Send + 'static,
    {
        Arc::new(TerminalView::new(self.output, out))
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Failure for a download that ended without completing.
pub(crate) fn unfinished(status: ytplus_api_models::DownloadStatus) -> CliError {
    CliError::failure(anyhow!("download ended with status {status}"))
}
