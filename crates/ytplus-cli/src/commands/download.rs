use std::future::Future;
use std::io::{self, Write};

use tokio::signal;
use ytplus_api_models::{ChannelMode, DownloadMode, DownloadType};
use ytplus_controller::DownloadForm;

use crate::cli::DownloadArgs;
use crate::client::{AppContext, CliResult};
use crate::commands::watch::follow;

pub(crate) async fn handle_download<W>(
    ctx: &AppContext,
    args: &DownloadArgs,
    out: W,
) -> CliResult<()>
where
    W: Write + Send + 'static,
{
    run_download(ctx, args, out, signal::ctrl_c).await
}

async fn run_download<W, F, Fut>(
    ctx: &AppContext,
    args: &DownloadArgs,
    out: W,
    interrupt: F,
) -> CliResult<()>
where
    W: Write + Send + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let form = download_form(args);
    let controller = ctx.controller(ctx.view(out));
    controller.mode_changed(form.mode);
    controller.submit(&form).await?;

    if args.detach {
        return Ok(());
    }
    follow(&controller, interrupt).await
}

fn download_form(args: &DownloadArgs) -> DownloadForm {
    let mode = if args.audio {
        DownloadMode::Audio
    } else {
        DownloadMode::Video
    };
    let (download_type, channel_mode) = if args.channel {
        let channel_mode = if args.recent {
            ChannelMode::Recent
        } else {
            ChannelMode::All
        };
        (DownloadType::Channel, Some(channel_mode))
    } else {
        (DownloadType::Single, None)
    };

    DownloadForm {
        mode,
        resolution: args.resolution.clone().unwrap_or_default(),
        folder: args.folder.clone().unwrap_or_default(),
        subtitles: args.subtitles,
        embed_thumbnail: args.embed_thumbnail,
        download_type,
        channel_mode,
        video_count: args.count.clone(),
        ..DownloadForm::new(args.url.clone())
    }
}
