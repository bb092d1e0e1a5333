//! YouTube thumbnail links.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ThumbnailError {
    #[error("no YouTube video id found in '{0}'")]
    NoVideoId(String),
    #[error("unknown thumbnail quality '{0}' (default, medium, high, standard, maxres)")]
    UnknownQuality(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quality {
    Default,
    Medium,
    High,
    Standard,
    MaxRes,
}

impl Quality {
    pub(crate) fn all() -> &'static [Quality] {
        &[
            Self::Default,
            Self::Medium,
            Self::High,
            Self::Standard,
            Self::MaxRes,
        ]
    }

    /// File name stem on img.youtube.com.
    pub(crate) fn file_stem(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Medium => "mqdefault",
            Self::High => "hqdefault",
            Self::Standard => "sddefault",
            Self::MaxRes => "maxresdefault",
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        match self {
            Self::Default => (120, 90),
            Self::Medium => (320, 180),
            Self::High => (480, 360),
            Self::Standard => (640, 480),
            Self::MaxRes => (1280, 720),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Standard => "Standard",
            Self::MaxRes => "Max resolution",
        }
    }

    pub(crate) fn parse(s: &str) -> Result<Self, ThumbnailError> {
        match s.trim().to_lowercase().as_str() {
            "default" | "d" => Ok(Self::Default),
            "medium" | "mq" | "mqdefault" => Ok(Self::Medium),
            "high" | "hq" | "hqdefault" => Ok(Self::High),
            "standard" | "sd" | "sddefault" => Ok(Self::Standard),
            "maxres" | "max" | "maxresdefault" => Ok(Self::MaxRes),
            _ => Err(ThumbnailError::UnknownQuality(s.to_string())),
        }
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|shorts/|live/|v/)|youtube-nocookie\.com/embed/|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
        )
        .ok()
    })
    .as_ref()
}

fn bare_id() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").ok())
        .as_ref()
}

/// Video id from a watch/short/embed URL or a bare 11-character id.
pub(crate) fn extract_video_id(input: &str) -> Result<String, ThumbnailError> {
    let input = input.trim();
    if bare_id().is_some_and(|re| re.is_match(input)) {
        return Ok(input.to_string());
    }
    url_pattern()
        .and_then(|re| re.captures(input))
        .map(|c| c[1].to_string())
        .ok_or_else(|| ThumbnailError::NoVideoId(input.to_string()))
}

pub(crate) fn thumbnail_url(video_id: &str, quality: Quality) -> String {
    format!(
        "https://img.youtube.com/vi/{video_id}/{}.jpg",
        quality.file_stem()
    )
}

/// Every quality with its link, smallest first.
pub(crate) fn all_thumbnails(video_id: &str) -> Vec<(Quality, String)> {
    Quality::all()
        .iter()
        .map(|q| (*q, thumbnail_url(video_id, *q)))
        .collect()
}
