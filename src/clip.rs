use crate::{
    core::{TIME_EPSILON, TimeRange},
    error::{DraftlineError, DraftlineResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClipKind {
    Video,
    Audio,
    Image,
}

/// A clip on the sequential main track.
///
/// Main-track clips have no placement of their own: their start offsets are
/// derived from list order, so the track is gap-free and overlap-free by
/// construction. The trim (`source_range`) is expressed in source-original
/// time; a degenerate trim means "the whole source". Image sources have no
/// intrinsic duration, so their trim duration doubles as display duration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MainTrackClip {
    /// Caller-assigned stable identifier, unique within the draft's main track.
    pub id: String,
    pub kind: ClipKind,
    /// Source locator: file path or URL, resolved by the embedding application.
    pub source: String,
    /// Intrinsic source duration in seconds, as probed. Zero for still images.
    pub source_duration: f64,
    /// Trim within the source. Degenerate means untrimmed.
    pub source_range: TimeRange,
}

impl MainTrackClip {
    pub fn new(
        id: impl Into<String>,
        kind: ClipKind,
        source: impl Into<String>,
        source_duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            source_duration,
            source_range: TimeRange::unspecified(),
        }
    }

    pub fn with_source_range(mut self, range: TimeRange) -> Self {
        self.source_range = range;
        self
    }

    /// Trimmed duration this clip contributes to the main track.
    pub fn duration(&self) -> f64 {
        if self.source_range.is_degenerate() {
            self.source_duration
        } else {
            self.source_range.duration
        }
    }

    /// Maps a clip-local time (0 = clip start) to source-original time.
    pub fn source_time_at(&self, local: f64) -> f64 {
        self.source_range.start + local
    }

    pub(crate) fn check_well_formed(&self) -> DraftlineResult<()> {
        check_clip_common(
            &self.id,
            self.kind,
            &self.source,
            self.source_duration,
            self.source_range,
            "main track clip",
        )
    }
}

/// An overlay clip, independently placed against the main timeline.
///
/// Mix clips may overlap each other and the main track freely; list order is
/// compositing order for the external renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MixTrackClip {
    /// Caller-assigned stable identifier, unique among the draft's mix clips.
    pub id: String,
    pub kind: ClipKind,
    pub source: String,
    pub source_duration: f64,
    pub source_range: TimeRange,
    /// Placement start on the main timeline, in seconds.
    pub start_at_main_track: f64,
    /// Playback volume, `0..=2` with 1.0 = unity gain. Mutable without a full
    /// transaction; see the draft's volume-change transaction.
    pub volume: f64,
}

impl MixTrackClip {
    pub fn new(
        id: impl Into<String>,
        kind: ClipKind,
        source: impl Into<String>,
        source_duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            source_duration,
            source_range: TimeRange::unspecified(),
            start_at_main_track: 0.0,
            volume: 1.0,
        }
    }

    pub fn with_source_range(mut self, range: TimeRange) -> Self {
        self.source_range = range;
        self
    }

    pub fn place_at(mut self, start_at_main_track: f64) -> Self {
        self.start_at_main_track = start_at_main_track;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn duration(&self) -> f64 {
        if self.source_range.is_degenerate() {
            self.source_duration
        } else {
            self.source_range.duration
        }
    }

    /// Placement span on the main timeline.
    pub fn range_at_main_track(&self) -> TimeRange {
        TimeRange {
            start: self.start_at_main_track,
            duration: self.duration(),
        }
    }

    pub fn source_time_at(&self, local: f64) -> f64 {
        self.source_range.start + local
    }

    pub(crate) fn check_well_formed(&self) -> DraftlineResult<()> {
        check_clip_common(
            &self.id,
            self.kind,
            &self.source,
            self.source_duration,
            self.source_range,
            "mix track clip",
        )?;
        if !self.start_at_main_track.is_finite() || self.start_at_main_track < 0.0 {
            return Err(DraftlineError::validation(format!(
                "mix track clip '{}' placement start must be finite and >= 0",
                self.id
            )));
        }
        check_volume(&self.id, self.volume)
    }
}

pub(crate) fn check_volume(id: &str, volume: f64) -> DraftlineResult<()> {
    if !volume.is_finite() || !(0.0..=2.0).contains(&volume) {
        return Err(DraftlineError::validation(format!(
            "clip '{id}' volume must be within 0..=2"
        )));
    }
    Ok(())
}

fn check_clip_common(
    id: &str,
    kind: ClipKind,
    source: &str,
    source_duration: f64,
    source_range: TimeRange,
    what: &str,
) -> DraftlineResult<()> {
    if id.trim().is_empty() {
        return Err(DraftlineError::validation(format!(
            "{what} id must be non-empty"
        )));
    }
    if source.trim().is_empty() {
        return Err(DraftlineError::validation(format!(
            "{what} '{id}' source must be non-empty"
        )));
    }
    if !source_duration.is_finite() || source_duration < 0.0 {
        return Err(DraftlineError::validation(format!(
            "{what} '{id}' source duration must be finite and >= 0"
        )));
    }
    source_range.check_well_formed(&format!("{what} '{id}'"))?;

    // Still images carry no intrinsic duration to trim against.
    if kind != ClipKind::Image
        && !source_range.is_degenerate()
        && source_range.end() > source_duration + TIME_EPSILON
    {
        return Err(DraftlineError::validation(format!(
            "{what} '{id}' trim exceeds its source duration"
        )));
    }

    let duration = if source_range.is_degenerate() {
        source_duration
    } else {
        source_range.duration
    };
    if duration <= 0.0 {
        return Err(DraftlineError::validation(format!(
            "{what} '{id}' must have positive duration"
        )));
    }
    Ok(())
}
