use crate::error::{DraftlineError, DraftlineResult};

/// Absolute tolerance for comparing floating-point times (seconds).
pub const TIME_EPSILON: f64 = 1e-9;

/// A span on a timeline, in seconds. Half-open: `[start, start + duration)`.
///
/// A zero-duration range is read as "unspecified / whole" wherever a range is
/// optional (a clip's trim, a draft's valid sub-range, a basic effect's window).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start: f64, duration: f64) -> DraftlineResult<Self> {
        if !start.is_finite() || !duration.is_finite() {
            return Err(DraftlineError::invalid_argument(
                "TimeRange start and duration must be finite",
            ));
        }
        if start < 0.0 || duration < 0.0 {
            return Err(DraftlineError::invalid_argument(
                "TimeRange start and duration must be >= 0",
            ));
        }
        Ok(Self { start, duration })
    }

    /// The zero range at t=0, read as "unspecified / whole".
    pub fn unspecified() -> Self {
        Self {
            start: 0.0,
            duration: 0.0,
        }
    }

    pub fn end(self) -> f64 {
        self.start + self.duration
    }

    pub fn is_degenerate(self) -> bool {
        self.duration == 0.0
    }

    /// Start-inclusive, end-exclusive containment.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end()
    }

    /// True when the two spans share more than a touching boundary.
    pub fn overlaps(self, other: TimeRange) -> bool {
        self.start + TIME_EPSILON < other.end() && other.start + TIME_EPSILON < self.end()
    }

    pub(crate) fn check_well_formed(self, what: &str) -> DraftlineResult<()> {
        if !self.start.is_finite() || !self.duration.is_finite() {
            return Err(DraftlineError::validation(format!(
                "{what} has a non-finite time range"
            )));
        }
        if self.start < 0.0 || self.duration < 0.0 {
            return Err(DraftlineError::validation(format!(
                "{what} has a negative time range"
            )));
        }
        Ok(())
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::unspecified()
    }
}

/// Output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Straight (non-premultiplied) RGBA, each component in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn check_well_formed(self) -> DraftlineResult<()> {
        for c in [self.r, self.g, self.b, self.a] {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(DraftlineError::validation(
                    "color components must be finite and within 0..=1",
                ));
            }
        }
        Ok(())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
