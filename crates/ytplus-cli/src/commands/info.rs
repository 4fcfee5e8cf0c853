use std::io::Write;

use crate::client::{AppContext, CliError, CliResult};

pub(crate) async fn handle_info<W>(ctx: &AppContext, url: &str, out: W) -> CliResult<()>
where
    W: Write + Send + 'static,
{
    let controller = ctx.controller(ctx.view(out));
    match controller.preview(url).await? {
        Some(_) => Ok(()),
        None => Err(CliError::validation("Please enter a video URL!")),
    }
}
