//! Following a running download until the backend reports its end.

use std::future::Future;
use std::io::{self, Write};

use anyhow::anyhow;
use tokio::signal;
use tokio::sync::watch;
use tracing::debug;
use ytplus_api_models::DownloadStatus;
use ytplus_controller::{Activity, Visibility};

use crate::client::{AppContext, CliController, CliError, CliResult, unfinished};

pub(crate) async fn handle_watch<W>(ctx: &AppContext, out: W) -> CliResult<()>
where
    W: Write + Send + 'static,
{
    let controller = ctx.controller(ctx.view(out));
    controller.refresh_once().await?;
    if !controller.is_downloading() {
        eprintln!("no download is active");
        return Ok(());
    }
    follow(&controller, signal::ctrl_c).await
}

/// Poll until the tracked download ends.
///
/// The first interrupt asks the backend to cancel and keeps watching, even when
/// the cancel request fails; the second stops watching.
pub(crate) async fn follow<W, F, Fut>(
    controller: &CliController<W>,
    mut interrupt: F,
) -> CliResult<()>
where
    W: Write + Send + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut activity = controller.activity();
    let baseline = activity.borrow_and_update().finished_runs;

    controller.set_visibility(Visibility::Visible);
    let result = wait_for_end(controller, &mut activity, baseline, &mut interrupt).await;
    controller.set_visibility(Visibility::Hidden);
    result
}

async fn wait_for_end<W, F, Fut>(
    controller: &CliController<W>,
    activity: &mut watch::Receiver<Activity>,
    baseline: u64,
    interrupt: &mut F,
) -> CliResult<()>
where
    W: Write + Send + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut cancel_sent = false;
    loop {
        tokio::select! {
            changed = activity.changed() => {
                if changed.is_err() {
                    return Err(CliError::failure(anyhow!("controller stopped unexpectedly")));
                }
                let current = *activity.borrow_and_update();
                if current.finished_runs > baseline {
                    return match current.status {
                        Some(DownloadStatus::Completed) | None => Ok(()),
                        Some(status) => Err(unfinished(status)),
                    };
                }
            }
            signalled = interrupt() => {
                signalled.map_err(|err| CliError::failure(anyhow!("failed to listen for Ctrl-C: {err}")))?;
                if cancel_sent {
                    return Err(CliError::failure(anyhow!(
                        "stopped watching; the download may still be running"
                    )));
                }
                cancel_sent = true;
                eprintln!("cancelling; press Ctrl-C again to stop watching");
                if let Err(err) = controller.cancel().await {
                    debug!(error = %err, "cancel request failed; still watching");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::output::tests::SharedBuffer;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use ytplus_controller::{ControllerConfig, HttpDownloaderApi, PollConfig};

    fn context(server: &MockServer) -> AppContext {
        let api = HttpDownloaderApi::connect(
            server.base_url().parse().expect("valid URL"),
            Duration::from_secs(5),
            "req-1",
        )
        .expect("client");
        AppContext {
            api: Arc::new(api),
            config: ControllerConfig {
                poll: PollConfig {
                    base_delay: Duration::from_millis(20),
                    backoff_step: Duration::from_millis(20),
                    max_delay: Duration::from_millis(100),
                },
                ..ControllerConfig::default()
            },
            output: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn idle_backend_has_nothing_to_watch() {
        let server = MockServer::start_async().await;
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200)
                .json_body(json!({"is_downloading": false, "status": "idle"}));
        });

        handle_watch(&context(&server), SharedBuffer::default())
            .await
            .expect("nothing to watch");
        status.assert_calls(1);
    }

    #[tokio::test]
    async fn follow_returns_once_download_completes() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200).json_body(json!({
                "is_downloading": false,
                "status": "completed",
                "progress": 100,
                "logs": ["[download] 100%"]
            }));
        });
        let ctx = context(&server);
        let buffer = SharedBuffer::default();
        let controller = ctx.controller(ctx.view(buffer.clone()));
        controller.reconcile(&ytplus_api_models::StatusSnapshot {
            is_downloading: true,
            status: DownloadStatus::Downloading,
            ..Default::default()
        });

        follow(&controller, std::future::pending).await.expect("completed");

        assert!(!controller.is_polling());
        let text = buffer.contents();
        assert!(text.contains("100% - Completed"));
        assert!(text.contains("[download] 100%"));
    }

    #[tokio::test]
    async fn slow_initial_status_is_bounded_by_the_status_timeout() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"is_downloading": true, "status": "downloading"}));
        });
        let mut ctx = context(&server);
        ctx.config = ctx.config.with_status_timeout(Duration::from_millis(100));

        let err = handle_watch(&ctx, SharedBuffer::default())
            .await
            .expect_err("status timed out");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("timed out"));
    }

    #[tokio::test]
    async fn rejected_cancel_keeps_watching() {
        let server = MockServer::start_async().await;
        let cancel = server.mock(|when, then| {
            when.method(POST).path("/api/cancel");
            then.status(400)
                .json_body(json!({"error": "No download in progress"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200)
                .json_body(json!({"is_downloading": false, "status": "completed"}));
        });
        let ctx = context(&server);
        let buffer = SharedBuffer::default();
        let controller = ctx.controller(ctx.view(buffer.clone()));
        controller.reconcile(&ytplus_api_models::StatusSnapshot {
            is_downloading: true,
            status: DownloadStatus::Downloading,
            ..Default::default()
        });

        let mut fired = false;
        let interrupt = move || {
            let first = !fired;
            fired = true;
            async move {
                if first {
                    Ok::<(), io::Error>(())
                } else {
                    std::future::pending().await
                }
            }
        };

        follow(&controller, interrupt)
            .await
            .expect("completion is still observed");

        cancel.assert_calls(1);
        assert!(buffer.contents().contains("Cancel error: No download in progress"));
    }

    #[tokio::test]
    async fn failed_download_is_an_operational_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200)
                .json_body(json!({"is_downloading": false, "status": "error"}));
        });
        let ctx = context(&server);
        let controller = ctx.controller(ctx.view(SharedBuffer::default()));
        controller.reconcile(&ytplus_api_models::StatusSnapshot {
            is_downloading: true,
            status: DownloadStatus::Starting,
            ..Default::default()
        });

        let err = follow(&controller, std::future::pending)
            .await
            .expect_err("download failed");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "download ended with status error");
    }
}
