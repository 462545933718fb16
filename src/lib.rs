//! Non-linear video-editing timeline core.
//!
//! A [`Draft`] is a mutable, inspectable project model: a sequential main
//! track, freely overlapping mix tracks, visual effects on the effected
//! timeline and duration-transforming effects on the original one, with a
//! bidirectional time mapping between the two. Mutations validate atomically,
//! either one at a time or batched in commit-or-cancel transactions.
//!
//! Rendering, compositing, encoding and media probing are external
//! collaborators; they consume the committed draft through read-only queries
//! and feed resolved metadata in through [`MediaResolver`].

#![forbid(unsafe_code)]

pub mod clip;
pub mod core;
pub mod draft;
pub mod effect;
pub mod error;
pub mod mapping;
pub mod media;

pub use crate::clip::{ClipKind, MainTrackClip, MixTrackClip};
pub use crate::core::{Color, TIME_EPSILON, TimeRange, VideoSize};
pub use crate::draft::{DEFAULT_IMAGE_DURATION_SEC, DEFAULT_VIDEO_SIZE, Draft, DraftState};
pub use crate::effect::{BasicEffect, BasicEffectKind, TimeEffect, TimeTransform};
pub use crate::error::{DraftlineError, DraftlineResult};
pub use crate::mapping::{MappingSegment, TimeMapping};
pub use crate::media::{MediaInfo, MediaResolver, StaticResolver};
