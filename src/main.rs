//! Main entry point for the ytfetch CLI

use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ytfetch::cli::{args::Args, output};
use ytfetch::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = Client::new()
        .await?
        .with_chunk_size(args.chunk_size)
        .with_max_routines(args.max_routines);

    if let Some(path) = &args.cookies {
        let loaded = client.load_cookies(path)?;
        info!(loaded, path = %path.display(), "cookies loaded");
    }

    if args.playlist {
        let playlist = client
            .get_playlist_with_client(&args.url, &args.client)
            .await?;
        output::print_playlist(&playlist);
        return Ok(());
    }

    let video = client
        .get_video_with_client(&args.url, &args.client)
        .await?;

    if args.info {
        output::print_video(&video);
        return Ok(());
    }

    let format = match args.itag {
        Some(itag) => video.formats.itag(itag).first().cloned(),
        // Formats arrive sorted by bitrate; take the best muxed one when
        // available, otherwise the best overall.
        None => video
            .formats
            .select(|f| f.audio_channels > 0 && f.width > 0)
            .first()
            .cloned()
            .or_else(|| video.formats.first().cloned()),
    };
    let Some(format) = format else {
        eprintln!("no matching format");
        std::process::exit(1);
    };

    info!(itag = format.itag, mime = %format.mime_type, "format selected");

    let (mut reader, total) = client.get_stream(&video, Some(&format)).await?;

    let path = args.output.unwrap_or_else(|| {
        format!("{}.{}", video.id, output::extension_for(&format)).into()
    });
    let mut file = tokio::fs::File::create(&path).await?;

    let bar = output::progress_bar(total);
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        bar.inc(n as u64);
    }
    file.flush().await?;
    bar.finish();

    println!("saved {}", path.display());
    Ok(())
}
