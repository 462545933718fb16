use std::collections::{BTreeMap, BTreeSet};

use crate::{
    clip::{ClipKind, MainTrackClip, MixTrackClip, check_volume},
    core::{Color, TIME_EPSILON, TimeRange, VideoSize},
    effect::{BasicEffect, TimeEffect},
    error::{DraftlineError, DraftlineResult},
    mapping::TimeMapping,
    media::MediaResolver,
};

/// Display duration a still-image main-track clip gets when none is set.
pub const DEFAULT_IMAGE_DURATION_SEC: f64 = 3.0;

/// Fallback output size when the first source carries no pixel size.
pub const DEFAULT_VIDEO_SIZE: VideoSize = VideoSize {
    width: 1280,
    height: 720,
};

/// The committed value of a draft: everything callers set, nothing derived.
///
/// `DraftState` is a plain value; cloning it is what gives transactions their
/// snapshot/rollback behavior and drafts their deep-copy semantics.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DraftState {
    pub background_color: Color,
    /// Sequential backbone; concatenation order defines the timeline.
    pub main_track_clips: Vec<MainTrackClip>,
    /// Overlay clips; list order is compositing order.
    pub mix_track_clips: Vec<MixTrackClip>,
    /// Visual effects, windows in effected time.
    pub basic_effects: Vec<BasicEffect>,
    /// Duration transforms, ranges in original time, pairwise non-overlapping.
    pub time_effects: Vec<TimeEffect>,
    pub video_size: VideoSize,
    /// Render-time visual reversal; never affects time mapping or audio.
    pub reverse_video: bool,
    /// Valid sub-range in effected time; degenerate means the whole timeline.
    /// Not auto-adjusted when time effects change.
    pub time_range: TimeRange,
}

impl DraftState {
    /// Sum of main-track trimmed durations, before time effects.
    pub fn original_duration(&self) -> f64 {
        self.main_track_clips.iter().map(|c| c.duration()).sum()
    }

    /// One full structural walk; returns the first violated invariant by name.
    pub fn validate(&self) -> DraftlineResult<()> {
        if self.video_size.width == 0 || self.video_size.height == 0 {
            return Err(DraftlineError::validation(
                "video size must have non-zero width and height",
            ));
        }
        self.background_color.check_well_formed()?;

        let mut main_ids = BTreeSet::new();
        for clip in &self.main_track_clips {
            clip.check_well_formed()?;
            if !main_ids.insert(clip.id.as_str()) {
                return Err(DraftlineError::validation(format!(
                    "duplicate main track clip id '{}'",
                    clip.id
                )));
            }
        }

        let mut mix_ids = BTreeSet::new();
        for clip in &self.mix_track_clips {
            clip.check_well_formed()?;
            if !mix_ids.insert(clip.id.as_str()) {
                return Err(DraftlineError::validation(format!(
                    "duplicate mix track clip id '{}'",
                    clip.id
                )));
            }
        }

        let original_duration = self.original_duration();
        let mut fx_ids = BTreeSet::new();
        for fx in &self.time_effects {
            fx.check_well_formed()?;
            if !fx_ids.insert(fx.id.as_str()) {
                return Err(DraftlineError::validation(format!(
                    "duplicate time effect id '{}'",
                    fx.id
                )));
            }
            if fx.time_range.end() > original_duration + TIME_EPSILON {
                return Err(DraftlineError::validation(format!(
                    "time effect '{}' range exceeds the original duration",
                    fx.id
                )));
            }
        }
        let mut ordered: Vec<&TimeEffect> = self.time_effects.iter().collect();
        ordered.sort_by(|a, b| a.time_range.start.total_cmp(&b.time_range.start));
        for pair in ordered.windows(2) {
            if pair[0].time_range.overlaps(pair[1].time_range) {
                return Err(DraftlineError::validation(format!(
                    "time effects '{}' and '{}' have overlapping original ranges",
                    pair[0].id, pair[1].id
                )));
            }
        }

        // Effected-domain checks use the duration implied by this same state,
        // so a transaction that retimes and re-filters validates coherently.
        let duration =
            TimeMapping::build(&self.time_effects, original_duration).effected_duration();

        let mut basic_ids = BTreeSet::new();
        for fx in &self.basic_effects {
            fx.check_well_formed()?;
            if !basic_ids.insert(fx.id.as_str()) {
                return Err(DraftlineError::validation(format!(
                    "duplicate basic effect id '{}'",
                    fx.id
                )));
            }
            if !fx.time_range.is_degenerate() && fx.time_range.end() > duration + TIME_EPSILON {
                return Err(DraftlineError::validation(format!(
                    "basic effect '{}' range exceeds the draft duration",
                    fx.id
                )));
            }
        }

        self.time_range.check_well_formed("draft valid sub-range")?;
        if !self.time_range.is_degenerate() && self.time_range.end() > duration + TIME_EPSILON {
            return Err(DraftlineError::validation(
                "draft valid sub-range exceeds the draft duration",
            ));
        }

        Ok(())
    }
}

impl Default for DraftState {
    fn default() -> Self {
        Self {
            background_color: Color::BLACK,
            main_track_clips: Vec::new(),
            mix_track_clips: Vec::new(),
            basic_effects: Vec::new(),
            time_effects: Vec::new(),
            video_size: DEFAULT_VIDEO_SIZE,
            reverse_video: false,
            time_range: TimeRange::unspecified(),
        }
    }
}

/// The aggregate root: committed state, derived state, and the two transaction
/// protocols.
///
/// A draft has a single logical owner; `&mut self` mutation entry points make
/// commit atomic with respect to readers by construction. Outside a
/// transaction every mutation validates and commits on its own; inside one,
/// mutations stage into a pending snapshot that `commit_change` validates as a
/// whole and publishes by swap. `Clone` yields a fully independent copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    committed: DraftState,
    original_duration: f64,
    duration: f64,
    mapping: TimeMapping,
    pending: Option<DraftState>,
    pending_volumes: Option<BTreeMap<String, f64>>,
}

impl Draft {
    /// Creates a draft whose main track holds one audio/video clip covering
    /// the whole source.
    pub fn from_av_source(source: &str, resolver: &dyn MediaResolver) -> DraftlineResult<Self> {
        Self::from_source(ClipKind::Video, source, resolver)
    }

    /// Creates a draft whose main track holds one still image shown for
    /// [`DEFAULT_IMAGE_DURATION_SEC`].
    pub fn from_image_source(source: &str, resolver: &dyn MediaResolver) -> DraftlineResult<Self> {
        Self::from_source(ClipKind::Image, source, resolver)
    }

    /// Creates a draft from an explicit clip kind and source.
    pub fn from_source(
        kind: ClipKind,
        source: &str,
        resolver: &dyn MediaResolver,
    ) -> DraftlineResult<Self> {
        if source.trim().is_empty() {
            return Err(DraftlineError::invalid_argument("source must be non-empty"));
        }
        let info = resolver.resolve(source, kind)?;

        let mut clip = MainTrackClip::new("main-0", kind, source, info.duration_sec);
        if kind == ClipKind::Image {
            clip = clip.with_source_range(TimeRange::new(0.0, DEFAULT_IMAGE_DURATION_SEC)?);
        }

        Self::from_state(DraftState {
            main_track_clips: vec![clip],
            video_size: info.size.unwrap_or(DEFAULT_VIDEO_SIZE),
            ..DraftState::default()
        })
    }

    /// Builds a draft around an already-assembled state, validating it first.
    pub fn from_state(state: DraftState) -> DraftlineResult<Self> {
        let mut draft = Self {
            committed: DraftState::default(),
            original_duration: 0.0,
            duration: 0.0,
            mapping: TimeMapping::identity(0.0),
            pending: None,
            pending_volumes: None,
        };
        draft.commit_state(state)?;
        Ok(draft)
    }

    // ------------------------------------------------------------------
    // Read surface (committed state only; an open transaction is invisible
    // until commit).
    // ------------------------------------------------------------------

    pub fn state(&self) -> &DraftState {
        &self.committed
    }

    pub fn main_track_clips(&self) -> &[MainTrackClip] {
        &self.committed.main_track_clips
    }

    pub fn mix_track_clips(&self) -> &[MixTrackClip] {
        &self.committed.mix_track_clips
    }

    pub fn basic_effects(&self) -> &[BasicEffect] {
        &self.committed.basic_effects
    }

    pub fn time_effects(&self) -> &[TimeEffect] {
        &self.committed.time_effects
    }

    pub fn background_color(&self) -> Color {
        self.committed.background_color
    }

    pub fn video_size(&self) -> VideoSize {
        self.committed.video_size
    }

    pub fn reverse_video(&self) -> bool {
        self.committed.reverse_video
    }

    pub fn time_range(&self) -> TimeRange {
        self.committed.time_range
    }

    /// Total duration before time effects.
    pub fn original_duration(&self) -> f64 {
        self.original_duration
    }

    /// Total duration with time effects applied.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The active original↔effected transform table.
    pub fn mapping(&self) -> &TimeMapping {
        &self.mapping
    }

    /// Start offset of each main-track clip, derived from list order.
    pub fn main_track_offsets(&self) -> Vec<f64> {
        let mut offsets = Vec::with_capacity(self.committed.main_track_clips.len());
        let mut acc = 0.0;
        for clip in &self.committed.main_track_clips {
            offsets.push(acc);
            acc += clip.duration();
        }
        offsets
    }

    /// Resolves which main-track clip an original-time instant falls in,
    /// together with the source-original time at that instant. `Ok(None)` only
    /// at the exact end of the timeline.
    pub fn clip_at_original_time(
        &self,
        original_time: f64,
    ) -> DraftlineResult<Option<(&MainTrackClip, f64)>> {
        if !original_time.is_finite()
            || original_time < -TIME_EPSILON
            || original_time > self.original_duration + TIME_EPSILON
        {
            return Err(DraftlineError::invalid_time(format!(
                "original time {original_time} is outside [0, {}]",
                self.original_duration
            )));
        }
        let t = original_time.clamp(0.0, self.original_duration);

        let mut acc = 0.0;
        for clip in &self.committed.main_track_clips {
            let end = acc + clip.duration();
            if t < end {
                return Ok(Some((clip, clip.source_time_at(t - acc))));
            }
            acc = end;
        }
        Ok(None)
    }

    /// Basic effects active at an effected-time instant, in list order.
    pub fn basic_effects_at(&self, effected_time: f64) -> DraftlineResult<Vec<&BasicEffect>> {
        if !effected_time.is_finite()
            || effected_time < -TIME_EPSILON
            || effected_time > self.duration + TIME_EPSILON
        {
            return Err(DraftlineError::invalid_time(format!(
                "effected time {effected_time} is outside [0, {}]",
                self.duration
            )));
        }
        let t = effected_time.clamp(0.0, self.duration);
        Ok(self
            .committed
            .basic_effects
            .iter()
            .filter(|fx| fx.is_active_at(t))
            .collect())
    }

    /// Basic effects overlapping an effected-time range, in list order. A
    /// degenerate query range is treated as an instant.
    pub fn basic_effects_in_range(&self, range: TimeRange) -> DraftlineResult<Vec<&BasicEffect>> {
        if !range.start.is_finite() || !range.duration.is_finite() || range.start < 0.0 {
            return Err(DraftlineError::invalid_time(
                "effected range must be finite and start >= 0",
            ));
        }
        if range.is_degenerate() {
            return self.basic_effects_at(range.start);
        }
        if range.end() > self.duration + TIME_EPSILON {
            return Err(DraftlineError::invalid_time(format!(
                "effected range [{}, {}] is outside [0, {}]",
                range.start,
                range.end(),
                self.duration
            )));
        }
        Ok(self
            .committed
            .basic_effects
            .iter()
            .filter(|fx| fx.time_range.is_degenerate() || fx.time_range.overlaps(range))
            .collect())
    }

    // Time utilities, delegating to the committed mapping table.

    pub fn original_to_effected_time(&self, original_time: f64) -> DraftlineResult<f64> {
        self.mapping.original_to_effected(original_time)
    }

    pub fn effected_to_original_time(&self, effected_time: f64) -> DraftlineResult<f64> {
        self.mapping.effected_to_original(effected_time)
    }

    pub fn original_range_to_effected(&self, range: TimeRange) -> DraftlineResult<TimeRange> {
        self.mapping.original_range_to_effected(range)
    }

    pub fn effected_range_to_original(&self, range: TimeRange) -> DraftlineResult<TimeRange> {
        self.mapping.effected_range_to_original(range)
    }

    // ------------------------------------------------------------------
    // Mutation surface. Structural changes replace whole collections; scalar
    // setters stage or auto-commit under the same rules.
    // ------------------------------------------------------------------

    pub fn update_main_track_clips(&mut self, clips: Vec<MainTrackClip>) -> DraftlineResult<()> {
        self.apply(|state| state.main_track_clips = clips)
    }

    pub fn update_mix_track_clips(&mut self, clips: Vec<MixTrackClip>) -> DraftlineResult<()> {
        self.apply(|state| state.mix_track_clips = clips)
    }

    pub fn update_basic_effects(&mut self, effects: Vec<BasicEffect>) -> DraftlineResult<()> {
        self.apply(|state| state.basic_effects = effects)
    }

    pub fn update_time_effects(&mut self, effects: Vec<TimeEffect>) -> DraftlineResult<()> {
        self.apply(|state| state.time_effects = effects)
    }

    pub fn update_background_color(&mut self, color: Color) -> DraftlineResult<()> {
        self.apply(|state| state.background_color = color)
    }

    pub fn set_video_size(&mut self, size: VideoSize) -> DraftlineResult<()> {
        self.apply(|state| state.video_size = size)
    }

    pub fn set_reverse_video(&mut self, reverse: bool) -> DraftlineResult<()> {
        self.apply(|state| state.reverse_video = reverse)
    }

    /// Sets the valid sub-range, in effected time. After retiming edits the
    /// caller re-expresses this range; the engine never adjusts it.
    pub fn set_time_range(&mut self, range: TimeRange) -> DraftlineResult<()> {
        self.apply(|state| state.time_range = range)
    }

    // ------------------------------------------------------------------
    // General change transaction: Idle -> InTransaction -> Idle.
    // ------------------------------------------------------------------

    pub fn in_change_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Opens a transaction; subsequent mutations stage until commit or cancel.
    /// Nesting is an error.
    pub fn begin_change_transaction(&mut self) -> DraftlineResult<()> {
        if self.pending.is_some() {
            return Err(DraftlineError::invalid_state(
                "a change transaction is already open",
            ));
        }
        self.pending = Some(self.committed.clone());
        Ok(())
    }

    /// Discards all staged mutations, reverting to the committed snapshot.
    pub fn cancel_change_transaction(&mut self) -> DraftlineResult<()> {
        if self.pending.take().is_none() {
            return Err(DraftlineError::invalid_state(
                "no change transaction to cancel",
            ));
        }
        Ok(())
    }

    /// Validates the full staged snapshot, recomputes derived state once, and
    /// publishes it. On violation the staged state is dropped and the prior
    /// committed state stays untouched.
    pub fn commit_change(&mut self) -> DraftlineResult<()> {
        let Some(next) = self.pending.take() else {
            return Err(DraftlineError::invalid_state(
                "no change transaction to commit",
            ));
        };
        self.commit_state(next)
    }

    // ------------------------------------------------------------------
    // Volume change transaction: batches per-clip volume writes without the
    // full structural walk, independently of the general transaction.
    // ------------------------------------------------------------------

    pub fn in_volume_change_transaction(&self) -> bool {
        self.pending_volumes.is_some()
    }

    pub fn begin_volume_change_transaction(&mut self) -> DraftlineResult<()> {
        if self.pending_volumes.is_some() {
            return Err(DraftlineError::invalid_state(
                "a volume change transaction is already open",
            ));
        }
        self.pending_volumes = Some(BTreeMap::new());
        Ok(())
    }

    /// Sets a mix clip's volume. Applies immediately when no volume
    /// transaction is open, without a structural walk; otherwise buffers until
    /// [`Draft::commit_volume_change`]. With a general transaction open, the
    /// write lands in its staged state.
    pub fn set_mix_clip_volume(&mut self, id: &str, volume: f64) -> DraftlineResult<()> {
        check_volume(id, volume)?;
        if !self.working().mix_track_clips.iter().any(|c| c.id == id) {
            return Err(DraftlineError::invalid_argument(format!(
                "no mix track clip with id '{id}'"
            )));
        }
        if let Some(buffer) = &mut self.pending_volumes {
            buffer.insert(id.to_string(), volume);
            return Ok(());
        }
        let target = self.pending.as_mut().unwrap_or(&mut self.committed);
        write_volume(target, id, volume);
        Ok(())
    }

    /// Applies all buffered volume writes in one pass, independently of the
    /// general transaction: the writes land in the committed state (and in any
    /// staged snapshot, so a later general commit does not clobber them).
    pub fn commit_volume_change(&mut self) -> DraftlineResult<()> {
        let Some(buffer) = self.pending_volumes.take() else {
            return Err(DraftlineError::invalid_state(
                "no volume change transaction to commit",
            ));
        };
        for (id, volume) in &buffer {
            check_volume(id, *volume)?;
            if !self.working().mix_track_clips.iter().any(|c| c.id == *id) {
                return Err(DraftlineError::validation(format!(
                    "no mix track clip with id '{id}'"
                )));
            }
        }
        for (id, volume) in buffer {
            write_volume(&mut self.committed, &id, volume);
            if let Some(pending) = &mut self.pending {
                write_volume(pending, &id, volume);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn working(&self) -> &DraftState {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    /// Stages a mutation into the open transaction, or validates and commits
    /// it on its own.
    fn apply<F>(&mut self, mutate: F) -> DraftlineResult<()>
    where
        F: FnOnce(&mut DraftState),
    {
        let mut next = self.working().clone();
        mutate(&mut next);
        if self.pending.is_some() {
            self.pending = Some(next);
            Ok(())
        } else {
            self.commit_state(next)
        }
    }

    #[tracing::instrument(skip_all)]
    fn commit_state(&mut self, next: DraftState) -> DraftlineResult<()> {
        next.validate()?;
        let original_duration = next.original_duration();
        let mapping = TimeMapping::build(&next.time_effects, original_duration);
        self.duration = mapping.effected_duration();
        self.original_duration = original_duration;
        self.mapping = mapping;
        self.committed = next;
        Ok(())
    }
}

fn write_volume(state: &mut DraftState, id: &str, volume: f64) {
    if let Some(clip) = state.mix_track_clips.iter_mut().find(|c| c.id == id) {
        clip.volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaInfo, StaticResolver};

    fn resolver() -> StaticResolver {
        StaticResolver::new()
            .with("intro.mp4", MediaInfo::av(10.0, VideoSize::new(1920, 1080)))
            .with("music.aac", MediaInfo::audio(30.0))
            .with("sticker.png", MediaInfo::image(VideoSize::new(256, 256)))
    }

    fn draft_10s() -> Draft {
        Draft::from_av_source("intro.mp4", &resolver()).unwrap()
    }

    #[test]
    fn from_av_source_builds_one_clip_draft() {
        let draft = draft_10s();
        assert_eq!(draft.main_track_clips().len(), 1);
        assert_eq!(draft.original_duration(), 10.0);
        assert_eq!(draft.duration(), 10.0);
        assert_eq!(draft.video_size(), VideoSize::new(1920, 1080));
        assert_eq!(draft.background_color(), Color::BLACK);
    }

    #[test]
    fn from_image_source_gets_default_display_duration() {
        let draft = Draft::from_image_source("sticker.png", &resolver()).unwrap();
        assert_eq!(draft.original_duration(), DEFAULT_IMAGE_DURATION_SEC);
        assert_eq!(draft.video_size(), VideoSize::new(256, 256));
    }

    #[test]
    fn unknown_source_surfaces_media_resolution_error() {
        let err = Draft::from_av_source("missing.mp4", &resolver()).unwrap_err();
        assert!(matches!(err, DraftlineError::MediaResolution(_)));

        let err = Draft::from_av_source("  ", &resolver()).unwrap_err();
        assert!(matches!(err, DraftlineError::InvalidArgument(_)));
    }

    #[test]
    fn auto_commit_rejects_invalid_update_and_keeps_prior_state() {
        let mut draft = draft_10s();
        let overlapping = vec![
            TimeEffect::speed("a", TimeRange::new(1.0, 3.0).unwrap(), 2.0),
            TimeEffect::repeat("b", TimeRange::new(2.0, 2.0).unwrap(), 2),
        ];
        let err = draft.update_time_effects(overlapping).unwrap_err();
        assert!(matches!(err, DraftlineError::Validation(_)));
        assert!(draft.time_effects().is_empty());
        assert_eq!(draft.duration(), 10.0);
    }

    #[test]
    fn transaction_batches_and_commits_once() {
        let mut draft = draft_10s();
        draft.begin_change_transaction().unwrap();
        draft
            .update_time_effects(vec![TimeEffect::speed(
                "s0",
                TimeRange::new(2.0, 2.0).unwrap(),
                2.0,
            )])
            .unwrap();
        draft
            .update_basic_effects(vec![BasicEffect::lut(
                "lut0",
                TimeRange::new(0.0, 9.0).unwrap(),
                "tables/warm.png",
            )])
            .unwrap();

        // Readers still see the committed state while the transaction is open.
        assert!(draft.time_effects().is_empty());
        assert_eq!(draft.duration(), 10.0);

        draft.commit_change().unwrap();
        assert_eq!(draft.duration(), 9.0);
        assert_eq!(draft.basic_effects().len(), 1);
    }

    #[test]
    fn staged_effects_validate_against_staged_duration() {
        // A 9.5s basic effect is only valid together with the retiming that
        // keeps duration at 10s; staged coherently, it must commit.
        let mut draft = draft_10s();
        draft.begin_change_transaction().unwrap();
        draft
            .update_basic_effects(vec![BasicEffect::lut(
                "lut0",
                TimeRange::new(0.0, 9.5).unwrap(),
                "tables/warm.png",
            )])
            .unwrap();
        draft.commit_change().unwrap();

        let mut draft = draft_10s();
        draft.begin_change_transaction().unwrap();
        draft
            .update_time_effects(vec![TimeEffect::speed(
                "s0",
                TimeRange::new(0.0, 10.0).unwrap(),
                2.0,
            )])
            .unwrap();
        draft
            .update_basic_effects(vec![BasicEffect::lut(
                "lut0",
                TimeRange::new(0.0, 9.5).unwrap(),
                "tables/warm.png",
            )])
            .unwrap();
        let err = draft.commit_change().unwrap_err();
        assert!(matches!(err, DraftlineError::Validation(_)));
        // Rolled back whole: neither staged collection survived.
        assert!(draft.time_effects().is_empty());
        assert!(draft.basic_effects().is_empty());
    }

    #[test]
    fn cancel_reverts_to_pre_begin_state() {
        let mut draft = draft_10s();
        let before = draft.main_track_clips().to_vec();

        draft.begin_change_transaction().unwrap();
        draft
            .update_main_track_clips(vec![
                before[0].clone(),
                MainTrackClip::new("m1", ClipKind::Video, "intro.mp4", 10.0)
                    .with_source_range(TimeRange::new(0.0, 4.0).unwrap()),
            ])
            .unwrap();
        draft.cancel_change_transaction().unwrap();

        assert_eq!(draft.main_track_clips(), before.as_slice());
        assert!(!draft.in_change_transaction());
    }

    #[test]
    fn transaction_protocol_misuse_is_invalid_state() {
        let mut draft = draft_10s();
        assert!(matches!(
            draft.commit_change().unwrap_err(),
            DraftlineError::InvalidState(_)
        ));
        assert!(matches!(
            draft.cancel_change_transaction().unwrap_err(),
            DraftlineError::InvalidState(_)
        ));

        draft.begin_change_transaction().unwrap();
        assert!(matches!(
            draft.begin_change_transaction().unwrap_err(),
            DraftlineError::InvalidState(_)
        ));
        draft.cancel_change_transaction().unwrap();

        assert!(matches!(
            draft.commit_volume_change().unwrap_err(),
            DraftlineError::InvalidState(_)
        ));
    }

    #[test]
    fn empty_transaction_commit_is_idempotent() {
        let mut draft = draft_10s();
        draft
            .update_time_effects(vec![TimeEffect::repeat(
                "r0",
                TimeRange::new(0.0, 2.0).unwrap(),
                2,
            )])
            .unwrap();

        let before = draft.clone();
        draft.begin_change_transaction().unwrap();
        draft.commit_change().unwrap();
        assert_eq!(draft, before);
    }

    #[test]
    fn volume_applies_immediately_outside_transaction() {
        let mut draft = draft_10s();
        draft
            .update_mix_track_clips(vec![
                MixTrackClip::new("x0", ClipKind::Audio, "music.aac", 30.0)
                    .with_source_range(TimeRange::new(0.0, 8.0).unwrap()),
            ])
            .unwrap();

        draft.set_mix_clip_volume("x0", 0.25).unwrap();
        assert_eq!(draft.mix_track_clips()[0].volume, 0.25);

        assert!(matches!(
            draft.set_mix_clip_volume("x0", 3.0).unwrap_err(),
            DraftlineError::Validation(_)
        ));
        assert!(matches!(
            draft.set_mix_clip_volume("nope", 1.0).unwrap_err(),
            DraftlineError::InvalidArgument(_)
        ));
    }

    #[test]
    fn volume_transaction_batches_writes() {
        let mut draft = draft_10s();
        draft
            .update_mix_track_clips(vec![
                MixTrackClip::new("x0", ClipKind::Audio, "music.aac", 30.0)
                    .with_source_range(TimeRange::new(0.0, 8.0).unwrap()),
                MixTrackClip::new("x1", ClipKind::Audio, "music.aac", 30.0)
                    .with_source_range(TimeRange::new(8.0, 8.0).unwrap()),
            ])
            .unwrap();

        draft.begin_volume_change_transaction().unwrap();
        draft.set_mix_clip_volume("x0", 0.5).unwrap();
        draft.set_mix_clip_volume("x1", 1.5).unwrap();
        // Buffered, not yet applied.
        assert_eq!(draft.mix_track_clips()[0].volume, 1.0);

        draft.commit_volume_change().unwrap();
        assert_eq!(draft.mix_track_clips()[0].volume, 0.5);
        assert_eq!(draft.mix_track_clips()[1].volume, 1.5);
        assert!(!draft.in_volume_change_transaction());
    }

    #[test]
    fn committed_volume_survives_general_transaction_cancel() {
        let mut draft = draft_10s();
        draft
            .update_mix_track_clips(vec![
                MixTrackClip::new("x0", ClipKind::Audio, "music.aac", 30.0)
                    .with_source_range(TimeRange::new(0.0, 8.0).unwrap()),
            ])
            .unwrap();

        draft.begin_change_transaction().unwrap();
        draft.begin_volume_change_transaction().unwrap();
        draft.set_mix_clip_volume("x0", 0.5).unwrap();
        draft.commit_volume_change().unwrap();

        // Committed independently: visible before the general commit, and a
        // general cancel must not revert it.
        assert_eq!(draft.mix_track_clips()[0].volume, 0.5);
        draft.cancel_change_transaction().unwrap();
        assert_eq!(draft.mix_track_clips()[0].volume, 0.5);
    }

    #[test]
    fn general_commit_keeps_volume_committed_underneath() {
        let mut draft = draft_10s();
        draft
            .update_mix_track_clips(vec![
                MixTrackClip::new("x0", ClipKind::Audio, "music.aac", 30.0)
                    .with_source_range(TimeRange::new(0.0, 8.0).unwrap()),
            ])
            .unwrap();

        draft.begin_change_transaction().unwrap();
        draft.set_reverse_video(true).unwrap();
        draft.begin_volume_change_transaction().unwrap();
        draft.set_mix_clip_volume("x0", 0.25).unwrap();
        draft.commit_volume_change().unwrap();
        draft.commit_change().unwrap();

        assert!(draft.reverse_video());
        assert_eq!(draft.mix_track_clips()[0].volume, 0.25);
    }

    #[test]
    fn main_track_offsets_follow_list_order() {
        let mut draft = draft_10s();
        draft
            .update_main_track_clips(vec![
                MainTrackClip::new("m0", ClipKind::Video, "intro.mp4", 10.0)
                    .with_source_range(TimeRange::new(0.0, 4.0).unwrap()),
                MainTrackClip::new("m1", ClipKind::Video, "intro.mp4", 10.0)
                    .with_source_range(TimeRange::new(4.0, 6.0).unwrap()),
            ])
            .unwrap();

        assert_eq!(draft.main_track_offsets(), vec![0.0, 4.0]);
        assert_eq!(draft.original_duration(), 10.0);

        // 5s falls 1s into the second clip, which is trimmed to start at 4s.
        let (clip, source_time) = draft.clip_at_original_time(5.0).unwrap().unwrap();
        assert_eq!(clip.id, "m1");
        assert_eq!(source_time, 5.0);

        assert!(draft.clip_at_original_time(10.0).unwrap().is_none());
        assert!(draft.clip_at_original_time(10.5).is_err());
    }

    #[test]
    fn effect_queries_respect_windows_and_domain() {
        let mut draft = draft_10s();
        draft
            .update_basic_effects(vec![
                BasicEffect::lut("whole", TimeRange::unspecified(), "tables/warm.png"),
                BasicEffect::filter(
                    "windowed",
                    TimeRange::new(2.0, 3.0).unwrap(),
                    serde_json::json!({ "strength": 0.7 }),
                ),
            ])
            .unwrap();

        let at_1 = draft.basic_effects_at(1.0).unwrap();
        assert_eq!(at_1.len(), 1);
        assert_eq!(at_1[0].id, "whole");

        let at_3 = draft.basic_effects_at(3.0).unwrap();
        assert_eq!(at_3.len(), 2);

        let in_range = draft
            .basic_effects_in_range(TimeRange::new(4.0, 2.0).unwrap())
            .unwrap();
        assert_eq!(in_range.len(), 2);

        let past = draft
            .basic_effects_in_range(TimeRange::new(6.0, 2.0).unwrap())
            .unwrap();
        assert_eq!(past.len(), 1);

        assert!(draft.basic_effects_at(10.5).is_err());
    }

    #[test]
    fn scalar_setters_validate_atomically() {
        let mut draft = draft_10s();
        assert!(matches!(
            draft.set_video_size(VideoSize::new(0, 720)).unwrap_err(),
            DraftlineError::Validation(_)
        ));
        assert_eq!(draft.video_size(), VideoSize::new(1920, 1080));

        draft.set_video_size(VideoSize::new(720, 1280)).unwrap();
        assert_eq!(draft.video_size(), VideoSize::new(720, 1280));

        draft.set_reverse_video(true).unwrap();
        assert!(draft.reverse_video());
        // Reversal never touches the time mapping.
        assert_eq!(draft.original_to_effected_time(3.0).unwrap(), 3.0);

        assert!(matches!(
            draft
                .set_time_range(TimeRange::new(5.0, 6.0).unwrap())
                .unwrap_err(),
            DraftlineError::Validation(_)
        ));
        draft.set_time_range(TimeRange::new(2.0, 6.0).unwrap()).unwrap();
        assert_eq!(draft.time_range(), TimeRange::new(2.0, 6.0).unwrap());
    }

    #[test]
    fn clone_is_fully_independent() {
        let mut original = draft_10s();
        let mut copy = original.clone();

        copy.update_time_effects(vec![TimeEffect::speed(
            "s0",
            TimeRange::new(0.0, 10.0).unwrap(),
            2.0,
        )])
        .unwrap();
        assert_eq!(copy.duration(), 5.0);
        assert_eq!(original.duration(), 10.0);
        assert!(original.time_effects().is_empty());

        original.update_background_color(Color::rgb(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(copy.background_color(), Color::BLACK);
    }

    #[test]
    fn empty_main_track_is_a_zero_length_draft() {
        let mut draft = draft_10s();
        draft.update_main_track_clips(Vec::new()).unwrap();
        assert_eq!(draft.original_duration(), 0.0);
        assert_eq!(draft.duration(), 0.0);
        // Any time effect now exceeds the original duration.
        let err = draft
            .update_time_effects(vec![TimeEffect::repeat(
                "r0",
                TimeRange::new(0.0, 1.0).unwrap(),
                2,
            )])
            .unwrap_err();
        assert!(matches!(err, DraftlineError::Validation(_)));
    }
}
