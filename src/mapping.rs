use crate::{
    core::{TIME_EPSILON, TimeRange},
    effect::{TimeEffect, TimeTransform},
    error::{DraftlineError, DraftlineResult},
};

/// One transformed span of the original timeline, with its effected placement
/// precomputed at build time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MappingSegment {
    /// Affected span in original time.
    pub original: TimeRange,
    pub transform: TimeTransform,
    /// Effected time of `original.start`.
    pub effected_start: f64,
    /// Effected length of the span under `transform`.
    pub effected_duration: f64,
}

impl MappingSegment {
    fn effected_end(&self) -> f64 {
        self.effected_start + self.effected_duration
    }
}

/// Bidirectional mapping between original and effected time.
///
/// Built from a draft's committed time-effect set: segments sorted by original
/// start, non-overlapping (the draft enforces this before building), with
/// identity gaps between them. Queries fail fast on out-of-domain input
/// instead of clamping; callers pre-validate against the two durations.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeMapping {
    segments: Vec<MappingSegment>,
    original_duration: f64,
    effected_duration: f64,
}

impl TimeMapping {
    /// Builds the segment table. `time_effects` must already be validated:
    /// pairwise non-overlapping and within `[0, original_duration]`.
    pub fn build(time_effects: &[TimeEffect], original_duration: f64) -> Self {
        let mut ordered: Vec<&TimeEffect> = time_effects.iter().collect();
        ordered.sort_by(|a, b| a.time_range.start.total_cmp(&b.time_range.start));

        let mut segments = Vec::with_capacity(ordered.len());
        // Running difference between effected and original time.
        let mut delta = 0.0;
        for fx in ordered {
            let effected_duration = fx.transform.transformed_duration(fx.time_range.duration);
            segments.push(MappingSegment {
                original: fx.time_range,
                transform: fx.transform,
                effected_start: fx.time_range.start + delta,
                effected_duration,
            });
            delta += effected_duration - fx.time_range.duration;
        }

        Self {
            segments,
            original_duration,
            effected_duration: original_duration + delta,
        }
    }

    /// Mapping with no time effects.
    pub fn identity(original_duration: f64) -> Self {
        Self::build(&[], original_duration)
    }

    pub fn segments(&self) -> &[MappingSegment] {
        &self.segments
    }

    pub fn original_duration(&self) -> f64 {
        self.original_duration
    }

    pub fn effected_duration(&self) -> f64 {
        self.effected_duration
    }

    /// Maps an original-time instant to effected time.
    ///
    /// Inside a repeat segment the instant maps to its first repetition, which
    /// keeps `effected_to_original` an exact inverse. A point exactly at a
    /// segment boundary belongs to the later segment.
    pub fn original_to_effected(&self, original_time: f64) -> DraftlineResult<f64> {
        let t = check_domain(original_time, self.original_duration, "original")?;

        // Sorted and non-overlapping, so binary search by original start.
        let idx = self.segments.partition_point(|s| s.original.start <= t);
        let Some(seg) = idx.checked_sub(1).map(|i| &self.segments[i]) else {
            return Ok(t);
        };

        if t < seg.original.end() {
            let local = t - seg.original.start;
            let mapped = match seg.transform {
                TimeTransform::Repeat { .. } => local,
                TimeTransform::Speed { factor } => local / factor,
            };
            Ok(seg.effected_start + mapped)
        } else {
            Ok(seg.effected_end() + (t - seg.original.end()))
        }
    }

    /// Maps an effected-time instant back to original time.
    ///
    /// Any repetition of a repeat segment folds back onto the same original
    /// span.
    pub fn effected_to_original(&self, effected_time: f64) -> DraftlineResult<f64> {
        let t = check_domain(effected_time, self.effected_duration, "effected")?;

        let idx = self.segments.partition_point(|s| s.effected_start <= t);
        let Some(seg) = idx.checked_sub(1).map(|i| &self.segments[i]) else {
            return Ok(t);
        };

        if t < seg.effected_end() {
            let local = t - seg.effected_start;
            let mapped = match seg.transform {
                TimeTransform::Repeat { .. } => local % seg.original.duration,
                TimeTransform::Speed { factor } => local * factor,
            };
            Ok(seg.original.start + mapped)
        } else {
            Ok(seg.original.end() + (t - seg.effected_end()))
        }
    }

    /// Maps an original-time range to effected time, both endpoints mapped
    /// independently.
    pub fn original_range_to_effected(&self, range: TimeRange) -> DraftlineResult<TimeRange> {
        let start = self.original_to_effected(range.start)?;
        let end = self.original_to_effected(range.end())?;
        TimeRange::new(start, (end - start).max(0.0))
    }

    /// Maps an effected-time range back to original time.
    ///
    /// Endpoints map independently. Inside a repeat segment the inverse wraps
    /// at each repetition boundary, so a range straddling one has an end image
    /// before its start image; the result is then the covered original span,
    /// which is the repeat segment's whole range.
    pub fn effected_range_to_original(&self, range: TimeRange) -> DraftlineResult<TimeRange> {
        let start = self.effected_to_original(range.start)?;
        let end = self.effected_to_original(range.end())?;
        if end < start {
            let t = range.start.clamp(0.0, self.effected_duration);
            if let Some(seg) = self.segment_containing_effected(t) {
                return Ok(seg.original);
            }
        }
        TimeRange::new(start, (end - start).max(0.0))
    }

    fn segment_containing_effected(&self, t: f64) -> Option<&MappingSegment> {
        let idx = self.segments.partition_point(|s| s.effected_start <= t);
        idx.checked_sub(1)
            .map(|i| &self.segments[i])
            .filter(|s| t < s.effected_end())
    }
}

fn check_domain(t: f64, duration: f64, domain: &str) -> DraftlineResult<f64> {
    if !t.is_finite() || t < -TIME_EPSILON || t > duration + TIME_EPSILON {
        return Err(DraftlineError::invalid_time(format!(
            "{domain} time {t} is outside [0, {duration}]"
        )));
    }
    Ok(t.clamp(0.0, duration))
}
