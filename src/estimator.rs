// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation seam.
//!
//! The engine treats inference as opaque: a [`PoseEstimator`] turns a frame into zero or more
//! skeletons, and an [`EstimatorFactory`] builds one on a given [`Backend`].
//! [`RecordedEstimator`] replays detections captured earlier, one list per frame index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::Backend;
use crate::camera::Frame;
use crate::error::{Result, TrainerError};
use crate::keypoint::Skeleton;

/// Produces skeletons for a frame.
#[allow(async_fn_in_trait)]
pub trait PoseEstimator {
    /// Estimate the poses visible in `frame`.
    ///
    /// An empty list means nobody was detected; that is not an error.
    async fn estimate_poses(&mut self, frame: &Frame) -> Result<Vec<Skeleton>>;
}

/// Builds estimators on a requested backend.
#[allow(async_fn_in_trait)]
pub trait EstimatorFactory {
    /// Estimator type produced on success.
    type Estimator: PoseEstimator;

    /// Initialize an estimator on `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is not available.
    async fn create(&mut self, backend: Backend) -> Result<Self::Estimator>;
}

/// Replays recorded detections: entry `i` holds the skeletons seen in frame `i`.
#[derive(Debug, Clone)]
pub struct RecordedEstimator {
    frames: Arc<Vec<Vec<Skeleton>>>,
    backend: Backend,
}

impl RecordedEstimator {
    /// Create from in-memory detections.
    #[must_use]
    pub fn new(frames: Vec<Vec<Skeleton>>, backend: Backend) -> Self {
        Self {
            frames: Arc::new(frames),
            backend,
        }
    }

    /// Backend this estimator was created on.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseEstimator for RecordedEstimator {
    async fn estimate_poses(&mut self, frame: &Frame) -> Result<Vec<Skeleton>> {
        Ok(self.frames.get(frame.index).cloned().unwrap_or_default())
    }
}

/// Loads a detections file (`[[skeleton, ...], ...]`) and hands out [`RecordedEstimator`]s.
///
/// The file is parsed once; later backends reuse it.
#[derive(Debug, Clone)]
pub struct RecordedEstimatorFactory {
    path: PathBuf,
    unavailable: Vec<Backend>,
    loaded: Option<Arc<Vec<Vec<Skeleton>>>>,
}

impl RecordedEstimatorFactory {
    /// Create a factory for the detections file at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            unavailable: Vec::new(),
            loaded: None,
        }
    }

    /// Mark backends that should refuse to initialize, e.g. to rehearse fallback.
    #[must_use]
    pub fn with_unavailable(mut self, backends: Vec<Backend>) -> Self {
        self.unavailable = backends;
        self
    }

    async fn frames(&mut self) -> Result<Arc<Vec<Vec<Skeleton>>>> {
        if let Some(frames) = &self.loaded {
            return Ok(Arc::clone(frames));
        }
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TrainerError::InferenceError(format!(
                "Cannot read detections {}: {e}",
                self.path.display()
            ))
        })?;
        let frames: Vec<Vec<Skeleton>> = serde_json::from_str(&text).map_err(|e| {
            TrainerError::InferenceError(format!(
                "Malformed detections {}: {e}",
                self.path.display()
            ))
        })?;
        let frames = Arc::new(frames);
        self.loaded = Some(Arc::clone(&frames));
        Ok(frames)
    }
}

impl EstimatorFactory for RecordedEstimatorFactory {
    type Estimator = RecordedEstimator;

    async fn create(&mut self, backend: Backend) -> Result<RecordedEstimator> {
        if self.unavailable.contains(&backend) {
            return Err(TrainerError::InferenceError(format!(
                "backend '{backend}' is disabled"
            )));
        }
        let frames = self.frames().await?;
        Ok(RecordedEstimator { frames, backend })
    }
}
