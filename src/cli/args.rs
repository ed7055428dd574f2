//! Command line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// ytfetch - YouTube stream resolver and downloader
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video or playlist URL or ID
    pub url: String,

    /// Client profile (WEB, MWEB, YTMUSIC, WEB_EMBEDDED, TV, TV_EMBEDDED, WEB_KIDS)
    #[arg(short, long, default_value = "WEB")]
    pub client: String,

    /// Itag of the format to download (default: best available)
    #[arg(short, long)]
    pub itag: Option<i32>,

    /// Print video info and formats without downloading
    #[arg(long)]
    pub info: bool,

    /// Treat the input as a playlist and list its entries
    #[arg(long)]
    pub playlist: bool,

    /// Output file path
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Chunk size in bytes for ranged downloads
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub chunk_size: u64,

    /// Parallel range requests per download
    #[arg(long, default_value_t = 10)]
    pub max_routines: usize,

    /// Netscape cookies.txt file to load
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Default tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "ytfetch=info",
            _ => "ytfetch=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["ytfetch", "dQw4w9WgXcQ"]).unwrap();
        assert_eq!(args.url, "dQw4w9WgXcQ");
        assert_eq!(args.client, "WEB");
        assert_eq!(args.chunk_size, 10 * 1024 * 1024);
        assert_eq!(args.max_routines, 10);
        assert!(args.itag.is_none());
        assert!(!args.info);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "ytfetch",
            "--info",
            "--itag",
            "140",
            "--client",
            "TV",
            "-vv",
            "https://youtu.be/dQw4w9WgXcQ",
        ])
        .unwrap();
        assert!(args.info);
        assert_eq!(args.itag, Some(140));
        assert_eq!(args.client, "TV");
        assert_eq!(args.log_filter(), "ytfetch=debug");
    }

    #[test]
    fn test_url_required() {
        assert!(Args::try_parse_from(["ytfetch"]).is_err());
    }
}
