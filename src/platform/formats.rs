//! Stream format descriptors and selection helpers.

use serde::{Deserialize, Deserializer};

/// One downloadable rendition of a video.
///
/// Exactly one of `url` (pre-signed) and `cipher` (signature-scrambled)
/// is populated by the service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Format {
    #[serde(rename = "itag", default)]
    pub itag: i32,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub quality: String,
    #[serde(rename = "signatureCipher", default)]
    pub cipher: String,
    #[serde(default)]
    pub bitrate: i64,
    #[serde(default)]
    pub fps: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(rename = "lastModified", default)]
    pub last_modified: String,
    #[serde(rename = "contentLength", default, deserialize_with = "string_or_u64")]
    pub content_length: u64,
    #[serde(rename = "qualityLabel", default)]
    pub quality_label: String,
    #[serde(rename = "projectionType", default)]
    pub projection_type: String,
    #[serde(rename = "averageBitrate", default)]
    pub average_bitrate: i64,
    #[serde(rename = "audioQuality", default)]
    pub audio_quality: String,
    #[serde(rename = "approxDurationMs", default)]
    pub approx_duration_ms: String,
    #[serde(rename = "audioSampleRate", default)]
    pub audio_sample_rate: String,
    #[serde(rename = "audioChannels", default)]
    pub audio_channels: i32,
    #[serde(rename = "initRange", default)]
    pub init_range: Option<ByteRange>,
    #[serde(rename = "indexRange", default)]
    pub index_range: Option<ByteRange>,
    #[serde(rename = "audioTrack", default)]
    pub audio_track: Option<AudioTrack>,
}

/// Byte sub-range of an adaptive format (init / index segments).
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ByteRange {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// Audio-track metadata on multi-language videos.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct AudioTrack {
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "audioIsDefault", default)]
    pub audio_is_default: bool,
}

/// The service encodes content length as a JSON string.
fn string_or_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Number(u64),
        Text(String),
    }

    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n),
        Value::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl Format {
    pub fn language_display_name(&self) -> &str {
        self.audio_track
            .as_ref()
            .map(|track| track.display_name.as_str())
            .unwrap_or("")
    }
}

/// Ordered list of formats with chained filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormatList(pub Vec<Format>);

impl FormatList {
    pub fn select(&self, predicate: impl Fn(&Format) -> bool) -> FormatList {
        FormatList(self.0.iter().filter(|f| predicate(f)).cloned().collect())
    }

    pub fn itag(&self, itag: i32) -> FormatList {
        self.select(|f| f.itag == itag)
    }

    pub fn with_mime_type(&self, value: &str) -> FormatList {
        self.select(|f| f.mime_type.contains(value))
    }

    pub fn language(&self, display_name: &str) -> FormatList {
        self.select(|f| f.language_display_name() == display_name)
    }

    /// Filter by quality, quality label or itag (not audio quality).
    pub fn quality(&self, quality: &str) -> FormatList {
        let itag: i32 = quality.parse().unwrap_or(0);
        self.select(|f| {
            itag == f.itag || f.quality.contains(quality) || f.quality_label.contains(quality)
        })
    }

    pub fn audio_channels(&self, channels: i32) -> FormatList {
        self.select(|f| f.audio_channels == channels)
    }

    pub fn with_audio_channels(&self) -> FormatList {
        self.select(|f| f.audio_channels > 0)
    }

    pub fn first(&self) -> Option<&Format> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Format> {
        self.0.iter()
    }

    /// Stable order: video by resolution, FPS, codec (av01, vp9, avc1),
    /// bitrate; audio by default track, codec (mp4, opus), channels,
    /// bitrate, sample rate.
    pub fn sort(&mut self) {
        self.0.sort_by(compare_formats);
    }

    pub fn sort_by_bitrate_desc(&mut self) {
        self.0.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
    }
}

impl IntoIterator for FormatList {
    type Item = Format;
    type IntoIter = std::vec::IntoIter<Format>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormatList {
    type Item = &'a Format;
    type IntoIter = std::slice::Iter<'a, Format>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn video_codec_rank(mime_type: &str) -> i32 {
    if mime_type.contains("av01") {
        1
    } else if mime_type.contains("vp9") {
        2
    } else if mime_type.contains("avc1") {
        3
    } else {
        4
    }
}

fn audio_codec_rank(mime_type: &str) -> i32 {
    if mime_type.contains("mp4") {
        1
    } else if mime_type.contains("opus") {
        2
    } else {
        3
    }
}

/// Composite ordering. Itag 137 is deprioritised on width ties (it
/// downloads slowly).
fn compare_formats(a: &Format, b: &Format) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    if a.width != b.width {
        return b.width.cmp(&a.width);
    }

    if a.itag == 137 {
        return Ordering::Greater;
    }
    if b.itag == 137 {
        return Ordering::Less;
    }

    if a.fps != b.fps {
        return b.fps.cmp(&a.fps);
    }

    let audio = a.fps == 0 && a.audio_channels > 0 && b.audio_channels > 0;
    if audio {
        let a_default = a.audio_track.as_ref().is_some_and(|t| t.audio_is_default);
        let b_default = b.audio_track.as_ref().is_some_and(|t| t.audio_is_default);
        let comparable = (a.audio_track.is_none() && b.audio_track.is_none())
            || (a.audio_track.is_some() && b.audio_track.is_some() && a_default == b_default);

        if !comparable {
            return if a_default {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        let rank = (audio_codec_rank(&a.mime_type), audio_codec_rank(&b.mime_type));
        if rank.0 != rank.1 {
            return rank.0.cmp(&rank.1);
        }
        if a.audio_channels != b.audio_channels {
            return b.audio_channels.cmp(&a.audio_channels);
        }
        if a.bitrate != b.bitrate {
            return b.bitrate.cmp(&a.bitrate);
        }
        return b.audio_sample_rate.cmp(&a.audio_sample_rate);
    }

    let rank = (video_codec_rank(&a.mime_type), video_codec_rank(&b.mime_type));
    if rank.0 != rank.1 {
        return rank.0.cmp(&rank.1);
    }
    b.bitrate.cmp(&a.bitrate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(itag: i32, width: i32, fps: i32, mime: &str, bitrate: i64) -> Format {
        Format {
            itag,
            width,
            fps,
            mime_type: mime.to_string(),
            bitrate,
            ..Default::default()
        }
    }

    fn audio(itag: i32, mime: &str, channels: i32, bitrate: i64, rate: &str) -> Format {
        Format {
            itag,
            mime_type: mime.to_string(),
            audio_channels: channels,
            bitrate,
            audio_sample_rate: rate.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_content_length_from_string() {
        let json = r#"{"itag": 18, "contentLength": "2621440"}"#;
        let format: Format = serde_json::from_str(json).unwrap();
        assert_eq!(format.content_length, 2_621_440);

        let json = r#"{"itag": 18, "contentLength": 1024}"#;
        let format: Format = serde_json::from_str(json).unwrap();
        assert_eq!(format.content_length, 1024);

        let json = r#"{"itag": 18}"#;
        let format: Format = serde_json::from_str(json).unwrap();
        assert_eq!(format.content_length, 0);
    }

    #[test]
    fn test_format_url_cipher_exclusive() {
        let json = r#"{"itag": 22, "url": "https://example/22"}"#;
        let format: Format = serde_json::from_str(json).unwrap();
        assert!(!format.url.is_empty());
        assert!(format.cipher.is_empty());

        let json = r#"{"itag": 22, "signatureCipher": "s=abc&url=x"}"#;
        let format: Format = serde_json::from_str(json).unwrap();
        assert!(format.url.is_empty());
        assert!(!format.cipher.is_empty());
    }

    #[test]
    fn test_filters() {
        let list = FormatList(vec![
            video(137, 1920, 30, "video/mp4; codecs=\"avc1\"", 1_000_000),
            video(248, 1920, 30, "video/webm; codecs=\"vp9\"", 800_000),
            audio(140, "audio/mp4; codecs=\"mp4a\"", 2, 128_000, "44100"),
        ]);

        assert_eq!(list.itag(140).len(), 1);
        assert_eq!(list.with_mime_type("webm").len(), 1);
        assert_eq!(list.with_audio_channels().len(), 1);
        assert_eq!(list.audio_channels(2).len(), 1);
        assert_eq!(list.quality("137").len(), 1);
        assert!(list.itag(9999).is_empty());
    }

    #[test]
    fn test_sort_video_resolution_then_codec() {
        let mut list = FormatList(vec![
            video(134, 640, 30, "video/mp4; codecs=\"avc1\"", 300_000),
            video(247, 1280, 30, "video/webm; codecs=\"vp9\"", 700_000),
            video(136, 1280, 30, "video/mp4; codecs=\"avc1\"", 750_000),
            video(399, 1280, 30, "video/mp4; codecs=\"av01\"", 600_000),
        ]);
        list.sort();

        let itags: Vec<i32> = list.iter().map(|f| f.itag).collect();
        // 1280p before 640p; within 1280p av01 < vp9 < avc1.
        assert_eq!(itags, vec![399, 247, 136, 134]);
    }

    #[test]
    fn test_sort_deprioritises_itag_137() {
        let mut list = FormatList(vec![
            video(137, 1920, 30, "video/mp4; codecs=\"avc1\"", 4_000_000),
            video(248, 1920, 30, "video/webm; codecs=\"vp9\"", 2_500_000),
        ]);
        list.sort();
        assert_eq!(list.first().unwrap().itag, 248);
    }

    #[test]
    fn test_sort_audio_by_channels_and_bitrate() {
        let mut list = FormatList(vec![
            audio(249, "audio/webm; codecs=\"opus\"", 2, 50_000, "48000"),
            audio(140, "audio/mp4; codecs=\"mp4a\"", 2, 128_000, "44100"),
            audio(251, "audio/webm; codecs=\"opus\"", 2, 160_000, "48000"),
        ]);
        list.sort();

        let itags: Vec<i32> = list.iter().map(|f| f.itag).collect();
        // mp4 codec ranks first, then opus by bitrate.
        assert_eq!(itags, vec![140, 251, 249]);
    }

    #[test]
    fn test_sort_by_bitrate_desc() {
        let mut list = FormatList(vec![
            video(1, 0, 0, "", 100),
            video(2, 0, 0, "", 300),
            video(3, 0, 0, "", 200),
        ]);
        list.sort_by_bitrate_desc();
        let itags: Vec<i32> = list.iter().map(|f| f.itag).collect();
        assert_eq!(itags, vec![2, 3, 1]);
    }

    #[test]
    fn test_language_display_name() {
        let mut format = audio(140, "audio/mp4", 2, 128_000, "44100");
        assert_eq!(format.language_display_name(), "");

        format.audio_track = Some(AudioTrack {
            display_name: "English original".to_string(),
            id: "en.4".to_string(),
            audio_is_default: true,
        });
        assert_eq!(format.language_display_name(), "English original");

        let list = FormatList(vec![format]);
        assert_eq!(list.language("English original").len(), 1);
        assert!(list.language("Deutsch").is_empty());
    }
}
