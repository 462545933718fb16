use crate::{
    core::TimeRange,
    error::{DraftlineError, DraftlineResult},
};

/// A visual effect active over an effected-time window.
///
/// The window is expressed in effected (post-time-effect) coordinates; a
/// degenerate window means "the whole timeline". Parameters are opaque to the
/// timeline engine, which only validates and schedules the effect; execution
/// belongs to the external renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasicEffect {
    /// Caller-assigned identifier, unique among the draft's basic effects.
    pub id: String,
    /// Active window in effected time. Degenerate means the whole timeline.
    pub time_range: TimeRange,
    pub kind: BasicEffectKind,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BasicEffectKind {
    /// Parametric filter; params are renderer-defined.
    Filter { params: serde_json::Value },
    /// Color lookup table, referenced by source locator.
    Lut { table_source: String },
    /// Image overlay, referenced by source locator.
    ImageOverlay { source: String },
}

impl BasicEffect {
    pub fn filter(id: impl Into<String>, time_range: TimeRange, params: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            time_range,
            kind: BasicEffectKind::Filter { params },
        }
    }

    pub fn lut(
        id: impl Into<String>,
        time_range: TimeRange,
        table_source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            time_range,
            kind: BasicEffectKind::Lut {
                table_source: table_source.into(),
            },
        }
    }

    pub fn image_overlay(
        id: impl Into<String>,
        time_range: TimeRange,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            time_range,
            kind: BasicEffectKind::ImageOverlay {
                source: source.into(),
            },
        }
    }

    /// True when the effect is active at the given effected-time instant.
    pub fn is_active_at(&self, effected_time: f64) -> bool {
        self.time_range.is_degenerate() || self.time_range.contains(effected_time)
    }

    pub(crate) fn check_well_formed(&self) -> DraftlineResult<()> {
        if self.id.trim().is_empty() {
            return Err(DraftlineError::validation("basic effect id must be non-empty"));
        }
        self.time_range
            .check_well_formed(&format!("basic effect '{}'", self.id))?;
        match &self.kind {
            BasicEffectKind::Filter { .. } => Ok(()),
            BasicEffectKind::Lut { table_source } if table_source.trim().is_empty() => {
                Err(DraftlineError::validation(format!(
                    "basic effect '{}' LUT table source must be non-empty",
                    self.id
                )))
            }
            BasicEffectKind::ImageOverlay { source } if source.trim().is_empty() => {
                Err(DraftlineError::validation(format!(
                    "basic effect '{}' overlay source must be non-empty",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A duration-transforming effect over an original-time range.
///
/// Time effects never overlap each other in original time; the draft enforces
/// this at commit so the mapping segment table stays well defined.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeEffect {
    /// Caller-assigned identifier, unique among the draft's time effects.
    pub id: String,
    /// Affected span in original time. Must be non-degenerate.
    pub time_range: TimeRange,
    pub transform: TimeTransform,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TimeTransform {
    /// Play the span `count` times back to back.
    Repeat { count: u32 },
    /// Play the span at `factor` times normal speed.
    Speed { factor: f64 },
}

impl TimeTransform {
    /// Effected duration of a span of `duration` seconds under this transform.
    pub fn transformed_duration(self, duration: f64) -> f64 {
        match self {
            TimeTransform::Repeat { count } => duration * f64::from(count),
            TimeTransform::Speed { factor } => duration / factor,
        }
    }

    pub(crate) fn check_well_formed(self) -> DraftlineResult<()> {
        match self {
            TimeTransform::Repeat { count } if count == 0 => Err(DraftlineError::validation(
                "repeat effect count must be >= 1",
            )),
            TimeTransform::Speed { factor } if !factor.is_finite() || factor <= 0.0 => Err(
                DraftlineError::validation("speed effect factor must be finite and > 0"),
            ),
            _ => Ok(()),
        }
    }
}

impl TimeEffect {
    pub fn repeat(id: impl Into<String>, time_range: TimeRange, count: u32) -> Self {
        Self {
            id: id.into(),
            time_range,
            transform: TimeTransform::Repeat { count },
        }
    }

    pub fn speed(id: impl Into<String>, time_range: TimeRange, factor: f64) -> Self {
        Self {
            id: id.into(),
            time_range,
            transform: TimeTransform::Speed { factor },
        }
    }

    pub(crate) fn check_well_formed(&self) -> DraftlineResult<()> {
        if self.id.trim().is_empty() {
            return Err(DraftlineError::validation("time effect id must be non-empty"));
        }
        self.time_range
            .check_well_formed(&format!("time effect '{}'", self.id))?;
        if self.time_range.is_degenerate() {
            return Err(DraftlineError::validation(format!(
                "time effect '{}' range must have positive duration",
                self.id
            )));
        }
        self.transform.check_well_formed()
    }
}
