//! Terminal output formatting

use crate::core::playlist::Playlist;
use crate::core::video::Video;
use crate::platform::formats::Format;
use indicatif::{ProgressBar, ProgressStyle};

/// Pick a file extension from a format's MIME type.
pub fn extension_for(format: &Format) -> &'static str {
    let mime = format.mime_type.as_str();
    if mime.starts_with("video/mp4") {
        "mp4"
    } else if mime.starts_with("video/webm") {
        "webm"
    } else if mime.starts_with("audio/mp4") {
        "m4a"
    } else if mime.starts_with("audio/webm") {
        "weba"
    } else if mime.starts_with("video/3gpp") {
        "3gp"
    } else {
        "bin"
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn print_video(video: &Video) {
    println!("Title:    {}", video.title);
    println!("Author:   {}", video.author);
    println!(
        "Duration: {}",
        humantime::format_duration(video.duration)
    );
    if video.views > 0 {
        println!("Views:    {}", video.views);
    }
    if !video.publish_date.is_empty() {
        println!("Published: {}", video.publish_date);
    }
    println!();
    print_formats(video);
}

pub fn print_formats(video: &Video) {
    println!(
        "{:>6}  {:<30} {:>10} {:>12} {:>10}",
        "itag", "mime", "quality", "bitrate", "size"
    );
    for format in &video.formats {
        let mime = format
            .mime_type
            .split(';')
            .next()
            .unwrap_or(&format.mime_type);
        let quality = if format.quality_label.is_empty() {
            &format.quality
        } else {
            &format.quality_label
        };
        let size = if format.content_length > 0 {
            human_size(format.content_length)
        } else {
            "-".to_string()
        };
        println!(
            "{:>6}  {:<30} {:>10} {:>12} {:>10}",
            format.itag, mime, quality, format.bitrate, size
        );
    }
}

pub fn print_playlist(playlist: &Playlist) {
    println!("Playlist: {}", playlist.title);
    if !playlist.author.is_empty() {
        println!("Author:   {}", playlist.author);
    }
    println!("Videos:   {}", playlist.videos.len());
    println!();
    for (index, entry) in playlist.videos.iter().enumerate() {
        println!(
            "{:>4}. {} [{}] ({})",
            index + 1,
            entry.title,
            entry.id,
            humantime::format_duration(entry.duration)
        );
    }
}

/// Download progress bar; falls back to a spinner when the length is
/// unknown.
pub fn progress_bar(total: u64) -> ProgressBar {
    if total == 0 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec})")
                .expect("static template"),
        );
        return bar;
    }

    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
        )
        .expect("static template"),
    );
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        let mut format = Format::default();

        format.mime_type = "video/mp4; codecs=\"avc1.42001E\"".to_string();
        assert_eq!(extension_for(&format), "mp4");

        format.mime_type = "audio/webm; codecs=\"opus\"".to_string();
        assert_eq!(extension_for(&format), "weba");

        format.mime_type = "audio/mp4; codecs=\"mp4a.40.2\"".to_string();
        assert_eq!(extension_for(&format), "m4a");

        format.mime_type = "application/x-unknown".to_string();
        assert_eq!(extension_for(&format), "bin");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(10 * 1024 * 1024), "10.0 MiB");
    }
}
