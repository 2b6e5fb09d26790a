use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Media type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

/// The MIME types the catalog accepts. Anything else is rejected before bytes are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaMimeType {
    #[serde(rename = "image/jpeg")]
    ImageJpeg,
    #[serde(rename = "image/png")]
    ImagePng,
    #[serde(rename = "video/mp4")]
    VideoMp4,
    #[serde(rename = "video/webm")]
    VideoWebm,
    #[serde(rename = "audio/mpeg")]
    AudioMpeg,
    #[serde(rename = "audio/wav")]
    AudioWav,
}

impl MediaMimeType {
    pub const ALL: [MediaMimeType; 6] = [
        MediaMimeType::ImageJpeg,
        MediaMimeType::ImagePng,
        MediaMimeType::VideoMp4,
        MediaMimeType::VideoWebm,
        MediaMimeType::AudioMpeg,
        MediaMimeType::AudioWav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMimeType::ImageJpeg => "image/jpeg",
            MediaMimeType::ImagePng => "image/png",
            MediaMimeType::VideoMp4 => "video/mp4",
            MediaMimeType::VideoWebm => "video/webm",
            MediaMimeType::AudioMpeg => "audio/mpeg",
            MediaMimeType::AudioWav => "audio/wav",
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            MediaMimeType::ImageJpeg | MediaMimeType::ImagePng => MediaType::Image,
            MediaMimeType::VideoMp4 | MediaMimeType::VideoWebm => MediaType::Video,
            MediaMimeType::AudioMpeg | MediaMimeType::AudioWav => MediaType::Audio,
        }
    }

    /// File extensions recognised for this type; the first one is canonical.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaMimeType::ImageJpeg => &["jpg", "jpeg"],
            MediaMimeType::ImagePng => &["png"],
            MediaMimeType::VideoMp4 => &["mp4", "m4v"],
            MediaMimeType::VideoWebm => &["webm"],
            MediaMimeType::AudioMpeg => &["mp3", "mpeg"],
            MediaMimeType::AudioWav => &["wav"],
        }
    }

    pub fn canonical_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Extension to store an upload under: the original filename's extension when it
    /// belongs to this type, the canonical one otherwise.
    pub fn extension_for(&self, original_filename: &str) -> &'static str {
        let candidate = original_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        self.extensions()
            .iter()
            .copied()
            .find(|ext| *ext == candidate)
            .unwrap_or_else(|| self.canonical_extension())
    }

    /// Detect the type of a stored object from its key's extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mime| mime.extensions().contains(&extension.as_str()))
    }

    /// Parse a Content-Type header value against the allow-list.
    ///
    /// Parameters are stripped before comparison (`image/png; charset=binary` is
    /// `image/png`), and `audio/x-wav`/`audio/wave` are accepted as `audio/wav`.
    pub fn parse(content_type: &str) -> Result<Self, AppError> {
        let normalized = content_type
            .split(';')
            .next()
            .map(|s| s.trim())
            .unwrap_or(content_type)
            .to_lowercase();

        match normalized.as_str() {
            "image/jpeg" => Ok(MediaMimeType::ImageJpeg),
            "image/png" => Ok(MediaMimeType::ImagePng),
            "video/mp4" => Ok(MediaMimeType::VideoMp4),
            "video/webm" => Ok(MediaMimeType::VideoWebm),
            "audio/mpeg" => Ok(MediaMimeType::AudioMpeg),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Ok(MediaMimeType::AudioWav),
            _ => Err(AppError::UnsupportedMediaType(content_type.to_string())),
        }
    }
}

impl FromStr for MediaMimeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for MediaMimeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
