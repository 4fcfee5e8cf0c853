use std::io::Write;

use ytplus_controller::status_within;

use crate::client::{AppContext, CliResult};
use crate::output::render_snapshot;

pub(crate) async fn handle_status<W: Write>(ctx: &AppContext, mut out: W) -> CliResult<()> {
    let snapshot = status_within(ctx.api.as_ref(), ctx.config.status_timeout).await?;
    render_snapshot(&mut out, &snapshot, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::client::CliError;
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use ytplus_controller::{ControllerConfig, HttpDownloaderApi};

    fn context(server: &MockServer, output: OutputFormat) -> AppContext {
        let api = HttpDownloaderApi::connect(
            server.base_url().parse().expect("valid URL"),
            Duration::from_secs(5),
            "req-1",
        )
        .expect("client");
        AppContext {
            api: Arc::new(api),
            config: ControllerConfig::default(),
            output,
        }
    }

    #[tokio::test]
    async fn status_renders_snapshot_as_json() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200).json_body(json!({
                "is_downloading": false,
                "status": "completed",
                "progress": 100,
                "logs": ["done"]
            }));
        });

        let mut out = Vec::new();
        handle_status(&context(&server, OutputFormat::Json), &mut out)
            .await
            .expect("status");

        let value: Value = serde_json::from_slice(&out).expect("json output");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["logs"], json!(["done"]));
    }

    #[tokio::test]
    async fn status_failure_is_operational() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(500).body("boom");
        });

        let err = handle_status(&context(&server, OutputFormat::Table), Vec::new())
            .await
            .expect_err("server error");
        assert!(matches!(err, CliError::Failure(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
