// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Session configuration.
//!
//! This module defines the [`SessionConfig`] struct, which controls the pose count, the
//! similarity threshold that advances a pose, the keypoint confidence cutoff, the
//! distance-to-score scale, camera constraints and sampling cadence.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::backend::{Backend, DEFAULT_BACKENDS};
use crate::error::{Result, TrainerError};

/// Default number of reference poses in a session.
pub const DEFAULT_TOTAL_POSES: usize = 7;

/// Default similarity score a live pose must exceed to advance.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Default confidence a keypoint must exceed to be compared or drawn.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Default pixel distance scale used to map mean distance to a score.
pub const DEFAULT_DISTANCE_SCALE: f32 = 100.0;

/// Default ideal capture resolution (width, height).
pub const DEFAULT_RESOLUTION: (u32, u32) = (640, 480);

/// Default delay between sampling iterations (~30 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Front camera, facing the user.
    User,
    /// Rear camera, facing away from the user.
    #[default]
    Environment,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

impl FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "front" => Ok(Self::User),
            "environment" | "rear" | "back" => Ok(Self::Environment),
            _ => Err(format!("Unknown camera facing: {s}")),
        }
    }
}

/// Constraints passed to a camera provider when acquiring a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Required camera facing.
    pub facing: Facing,
    /// Preferred frame width in pixels.
    pub ideal_width: u32,
    /// Preferred frame height in pixels.
    pub ideal_height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            ideal_width: DEFAULT_RESOLUTION.0,
            ideal_height: DEFAULT_RESOLUTION.1,
        }
    }
}

/// Thresholds used when comparing two skeletons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    /// Keypoints at or below this confidence are ignored.
    pub confidence_threshold: f32,
    /// Pixel distance that halves the similarity score.
    pub distance_scale: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            distance_scale: DEFAULT_DISTANCE_SCALE,
        }
    }
}

/// Configuration for a pose-matching session.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_trainer::SessionConfig;
///
/// let config = SessionConfig::new()
///     .with_total_poses(5)
///     .with_similarity_threshold(0.9)
///     .with_resolution(1280, 720);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of reference poses, ids `1..=total_poses`.
    pub total_poses: usize,
    /// A score strictly above this value advances to the next pose (0.0 to 1.0).
    pub similarity_threshold: f32,
    /// Keypoint confidence cutoff and distance scale.
    pub scoring: ScoringConfig,
    /// Camera constraints.
    pub capture: CaptureConstraints,
    /// Inference backends, tried in order until one initializes.
    pub backends: Vec<Backend>,
    /// Minimum delay between sampling iterations. Zero only yields to the scheduler.
    pub frame_interval: Duration,
    /// Whether the display is mirrored. Never affects scoring coordinates.
    pub mirror: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_poses: DEFAULT_TOTAL_POSES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scoring: ScoringConfig::default(),
            capture: CaptureConstraints::default(),
            backends: DEFAULT_BACKENDS.to_vec(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            mirror: true,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of poses in the session.
    #[must_use]
    pub const fn with_total_poses(mut self, total: usize) -> Self {
        self.total_poses = total;
        self
    }

    /// Set the similarity threshold.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Score a live pose must exceed to advance (0.0 to 1.0).
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the keypoint confidence cutoff.
    ///
    /// Keypoints whose confidence is not strictly greater are neither scored nor drawn.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.scoring.confidence_threshold = threshold;
        self
    }

    /// Set the distance-to-score scale constant.
    #[must_use]
    pub const fn with_distance_scale(mut self, scale: f32) -> Self {
        self.scoring.distance_scale = scale;
        self
    }

    /// Set the ideal capture resolution.
    #[must_use]
    pub const fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.capture.ideal_width = width;
        self.capture.ideal_height = height;
        self
    }

    /// Set the required camera facing.
    #[must_use]
    pub const fn with_facing(mut self, facing: Facing) -> Self {
        self.capture.facing = facing;
        self
    }

    /// Set the ordered list of inference backends.
    #[must_use]
    pub fn with_backends(mut self, backends: Vec<Backend>) -> Self {
        self.backends = backends;
        self
    }

    /// Set the delay between sampling iterations.
    #[must_use]
    pub const fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Enable or disable mirrored display.
    #[must_use]
    pub const fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Check the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(TrainerError::ConfigError(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.scoring.confidence_threshold) {
            return Err(TrainerError::ConfigError(format!(
                "confidence threshold must be within [0, 1], got {}",
                self.scoring.confidence_threshold
            )));
        }
        if !(self.scoring.distance_scale > 0.0 && self.scoring.distance_scale.is_finite()) {
            return Err(TrainerError::ConfigError(format!(
                "distance scale must be positive, got {}",
                self.scoring.distance_scale
            )));
        }
        if self.capture.ideal_width == 0 || self.capture.ideal_height == 0 {
            return Err(TrainerError::ConfigError(
                "capture resolution must be non-zero".to_string(),
            ));
        }
        if self.backends.is_empty() {
            return Err(TrainerError::ConfigError(
                "at least one inference backend is required".to_string(),
            ));
        }
        Ok(())
    }
}
