use std::io::Write;
use std::sync::Arc;

use ytplus_controller::CancelOutcome;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::TerminalView;

pub(crate) async fn handle_cancel<W>(ctx: &AppContext, out: W) -> CliResult<()>
where
    W: Write + Send + 'static,
{
    let view = Arc::new(TerminalView::new(ctx.output, out).without_server_logs());
    let controller = ctx.controller(view);

    controller.refresh_once().await?;

    match controller.cancel().await? {
        CancelOutcome::Requested => Ok(()),
        CancelOutcome::NotActive => Err(CliError::validation("No download is active")),
    }
}
