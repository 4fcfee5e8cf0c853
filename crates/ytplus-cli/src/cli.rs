//! Command-line parsing and dispatch for the `ytplus` client.

use std::io;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;
use uuid::Uuid;
use ytplus_telemetry::{
    CommandSpanGuard, DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, TelemetryError, init_logging,
};

use crate::client::{AppContext, CliResult, parse_url};
use crate::commands::cancel::handle_cancel;
use crate::commands::download::handle_download;
use crate::commands::info::handle_info;
use crate::commands::status::handle_status;
use crate::commands::watch::handle_watch;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let log_format = cli.log_format.unwrap_or_else(LogFormat::infer);
    if let Err(err) = init_logging(&LoggingConfig {
        level: &cli.log_level,
        format: log_format,
        version: env!("CARGO_PKG_VERSION"),
    }) {
        eprintln!("warning: {err}");
    }

    let request_id = Uuid::new_v4().to_string();
    let _span = CommandSpanGuard::new(command_label(&cli.command), &request_id);

    let result = match AppContext::from_cli(&cli, &request_id) {
        Ok(ctx) => dispatch(cli.command, &ctx).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            let exit_code = err.exit_code();
            tracing::debug!(exit_code, "command failed");
            eprintln!("error: {}", err.display_message());
            exit_code
        }
    }
}

async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Info(args) => handle_info(ctx, &args.url, io::stdout()).await,
        Command::Download(args) => handle_download(ctx, &args, io::stdout()).await,
        Command::Cancel => handle_cancel(ctx, io::stdout()).await,
        Command::Status => handle_status(ctx, io::stdout()).await,
        Command::Watch => handle_watch(ctx, io::stdout()).await,
    }
}

#[derive(Parser)]
#[command(
    name = "ytplus",
    version,
    about = "Terminal client for a YT Downloader Plus backend"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "YTPLUS_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "YTPLUS_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout in seconds for every HTTP request"
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "YTPLUS_STATUS_TIMEOUT_SECS",
        default_value_t = DEFAULT_STATUS_TIMEOUT_SECS,
        help = "Timeout in seconds for a single status poll"
    )]
    pub(crate) status_timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, env = "YTPLUS_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        help = "Log format: pretty or json (defaults by build profile)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show title, kind, duration and thumbnail for a URL.
    Info(InfoArgs),
    /// Start a download and follow it until it ends.
    Download(DownloadArgs),
    /// Cancel the running download.
    Cancel,
    /// Print the backend status once.
    Status,
    /// Follow the running download until it ends.
    Watch,
}

#[derive(Args)]
pub(crate) struct InfoArgs {
    #[arg(help = "Video, playlist or channel URL")]
    pub(crate) url: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DownloadArgs {
    #[arg(help = "Video, playlist or channel URL")]
    pub(crate) url: String,
    #[arg(long, help = "Extract audio only")]
    pub(crate) audio: bool,
    #[arg(long, conflicts_with = "audio", help = "Resolution label, e.g. 1080p")]
    pub(crate) resolution: Option<String>,
    #[arg(long, help = "Destination folder on the backend host")]
    pub(crate) folder: Option<String>,
    #[arg(long)]
    pub(crate) subtitles: bool,
    #[arg(long)]
    pub(crate) embed_thumbnail: bool,
    #[arg(long, help = "Treat the URL as a channel")]
    pub(crate) channel: bool,
    #[arg(long, requires = "channel", help = "Only the most recent channel videos")]
    pub(crate) recent: bool,
    #[arg(long, requires = "recent", help = "Number of recent videos (default 10)")]
    pub(crate) count: Option<String>,
    #[arg(long, help = "Return once the backend accepts the download")]
    pub(crate) detach: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse().map_err(|err: TelemetryError| err.to_string())
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Info(_) => "info",
        Command::Download(_) => "download",
        Command::Cancel => "cancel",
        Command::Status => "status",
        Command::Watch => "watch",
    }
}
