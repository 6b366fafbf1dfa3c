// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoints and skeletons.
//!
//! A [`Skeleton`] is an ordered list of [`Keypoint`]s with a stable index-to-body-part
//! mapping. Two skeletons are only comparable index by index, so every producer must use the
//! same ordering; the crate follows the COCO-17 convention listed in [`KEYPOINT_NAMES`].

use ndarray::{Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// COCO-17 keypoint names, in index order.
pub const KEYPOINT_NAMES: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// A single body landmark in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// X coordinate in pixels.
    pub x: f32,
    /// Y coordinate in pixels.
    pub y: f32,
    /// Detection confidence (0.0 to 1.0).
    pub score: f32,
}

impl Keypoint {
    /// Create a new keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    /// Whether the keypoint is reliable enough to compare or draw.
    ///
    /// The comparison is strict: a score equal to the threshold is not usable.
    #[must_use]
    pub fn is_usable(&self, confidence_threshold: f32) -> bool {
        self.score > confidence_threshold
    }

    /// Euclidean distance to another keypoint.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An ordered sequence of keypoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skeleton {
    keypoints: Vec<Keypoint>,
}

impl Skeleton {
    /// Create a skeleton from keypoints in body-part order.
    #[must_use]
    pub const fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Build a skeleton from a `(K, 2)` or `(K, 3)` array of `x, y[, conf]` rows.
    ///
    /// Rows without a confidence column are treated as fully confident.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::InferenceError`] if the array has fewer than 2 columns.
    pub fn from_array(rows: ArrayView2<'_, f32>) -> Result<Self> {
        let cols = rows.ncols();
        if cols < 2 {
            return Err(TrainerError::InferenceError(format!(
                "keypoint rows need at least 2 columns (x, y), got {cols}"
            )));
        }
        let keypoints = rows
            .axis_iter(Axis(0))
            .map(|row| Keypoint::new(row[0], row[1], if cols > 2 { row[2] } else { 1.0 }))
            .collect();
        Ok(Self { keypoints })
    }

    /// Split an `(N, K, 2|3)` pose array, the layout pose models emit, into one skeleton per
    /// detected person.
    ///
    /// # Errors
    ///
    /// Returns an error if the last axis has fewer than 2 entries.
    pub fn from_pose_array(data: &Array3<f32>) -> Result<Vec<Self>> {
        data.axis_iter(Axis(0)).map(Self::from_array).collect()
    }

    /// Number of keypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Check if there are no keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Keypoint at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    /// Iterate over keypoints in body-part order.
    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint> {
        self.keypoints.iter()
    }

    /// All keypoints as a slice.
    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Indices and keypoints above the confidence cutoff.
    pub fn usable(&self, confidence_threshold: f32) -> impl Iterator<Item = (usize, &Keypoint)> {
        self.keypoints
            .iter()
            .enumerate()
            .filter(move |(_, kp)| kp.is_usable(confidence_threshold))
    }

    /// Copy with every keypoint shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.keypoints
                .iter()
                .map(|kp| Keypoint::new(kp.x + dx, kp.y + dy, kp.score))
                .collect(),
        )
    }
}

impl From<Vec<Keypoint>> for Skeleton {
    fn from(keypoints: Vec<Keypoint>) -> Self {
        Self::new(keypoints)
    }
}

impl<'a> IntoIterator for &'a Skeleton {
    type Item = &'a Keypoint;
    type IntoIter = std::slice::Iter<'a, Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.keypoints.iter()
    }
}
