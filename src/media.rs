use std::collections::BTreeMap;

use crate::{
    clip::ClipKind,
    core::VideoSize,
    error::{DraftlineError, DraftlineResult},
};

/// Already-probed metadata for a media source.
///
/// Probing itself (ffprobe, AVAsset, ...) lives outside this crate; a draft only
/// ever sees resolved durations and sizes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaInfo {
    /// Intrinsic duration of the source in seconds. Zero for still images.
    pub duration_sec: f64,
    /// Pixel size for visual sources, `None` for audio-only ones.
    pub size: Option<VideoSize>,
}

impl MediaInfo {
    pub fn av(duration_sec: f64, size: VideoSize) -> Self {
        Self {
            duration_sec,
            size: Some(size),
        }
    }

    pub fn audio(duration_sec: f64) -> Self {
        Self {
            duration_sec,
            size: None,
        }
    }

    pub fn image(size: VideoSize) -> Self {
        Self {
            duration_sec: 0.0,
            size: Some(size),
        }
    }
}

/// Seam to the external media-probing collaborator.
///
/// Failures map to [`DraftlineError::MediaResolution`] so callers can tell
/// "the source cannot be opened" apart from timeline validation errors.
pub trait MediaResolver {
    fn resolve(&self, source: &str, kind: ClipKind) -> DraftlineResult<MediaInfo>;
}

/// In-memory resolver for embedders that probe sources up front, and for tests.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    entries: BTreeMap<String, MediaInfo>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, info: MediaInfo) {
        self.entries.insert(source.into(), info);
    }

    pub fn with(mut self, source: impl Into<String>, info: MediaInfo) -> Self {
        self.insert(source, info);
        self
    }
}

impl MediaResolver for StaticResolver {
    fn resolve(&self, source: &str, _kind: ClipKind) -> DraftlineResult<MediaInfo> {
        self.entries.get(source).cloned().ok_or_else(|| {
            DraftlineError::media_resolution(format!("cannot open source '{source}'"))
        })
    }
}
