// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Reference pose set.
//!
//! Reference poses are looked up by id through a [`PoseSource`] and loaded strictly in session
//! order by [`load_poses`]. [`DirectoryPoseSource`] reads them from disk:
//!
//! ```text
//! poses/
//! ├── pose1.json   {"keypoints": [{"x": .., "y": .., "score": ..}, ...]}  or a bare array
//! ├── pose1.png
//! ├── pose2.json
//! ├── pose2.PNG    upper-case extensions are found too
//! └── ...
//! ```

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::Deserialize;

use crate::error::{Result, TrainerError};
use crate::keypoint::Skeleton;
use crate::utils::FallbackAttempts;
use crate::verbose;

/// Asset file extensions probed in order for each pose.
pub const ASSET_EXTENSIONS: [&str; 2] = ["png", "PNG"];

/// Resolved location of a pose's display asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef(PathBuf);

impl AssetRef {
    /// Wrap a resolved asset path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Asset path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A target pose: canonical skeleton plus the picture shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePose {
    /// Pose id, `1..=N`.
    pub id: u32,
    /// Canonical keypoints.
    pub skeleton: Skeleton,
    /// Display asset.
    pub asset: AssetRef,
}

/// Looks up reference pose data by id.
#[allow(async_fn_in_trait)]
pub trait PoseSource {
    /// Fetch the canonical skeleton for pose `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::PoseLoadError`] when the definition is missing or malformed.
    async fn fetch_pose_definition(&self, id: u32) -> Result<Skeleton>;

    /// Resolve the display asset for pose `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::AssetError`] when no asset candidate loads.
    async fn resolve_display_asset(&self, id: u32) -> Result<AssetRef>;
}

/// Load every pose in `order`, one at a time and in that order.
///
/// Stops at the first failure; a partial list is never returned, so `poses[i].id == order[i]`
/// holds for every successfully loaded session.
///
/// # Errors
///
/// Propagates the first definition or asset error.
pub async fn load_poses<P: PoseSource + ?Sized>(
    source: &P,
    order: &[u32],
) -> Result<Vec<ReferencePose>> {
    let mut poses = Vec::with_capacity(order.len());
    for &id in order {
        let skeleton = source.fetch_pose_definition(id).await?;
        let asset = source.resolve_display_asset(id).await?;
        verbose!("Loaded pose {id}: {} keypoints, asset {asset}", skeleton.len());
        poses.push(ReferencePose { id, skeleton, asset });
    }
    Ok(poses)
}

/// On-disk pose definition: either wrapped in an object or a bare keypoint array.
#[derive(Deserialize)]
#[serde(untagged)]
enum PoseDefinition {
    Wrapped { keypoints: Skeleton },
    Bare(Skeleton),
}

impl From<PoseDefinition> for Skeleton {
    fn from(definition: PoseDefinition) -> Self {
        match definition {
            PoseDefinition::Wrapped { keypoints } | PoseDefinition::Bare(keypoints) => keypoints,
        }
    }
}

/// Parse a pose definition document.
///
/// # Errors
///
/// Returns [`TrainerError::JsonError`] if the text matches neither accepted layout.
pub fn parse_pose_definition(text: &str) -> Result<Skeleton> {
    let definition: PoseDefinition = serde_json::from_str(text)?;
    Ok(definition.into())
}

/// Pose source backed by a directory of `pose{id}.json` and `pose{id}.png` files.
#[derive(Debug, Clone)]
pub struct DirectoryPoseSource {
    root: PathBuf,
}

impl DirectoryPoseSource {
    /// Create a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory the poses are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn definition_path(&self, id: u32) -> PathBuf {
        self.root.join(format!("pose{id}.json"))
    }

    /// Candidate asset paths for `id`, in probe order.
    #[must_use]
    pub fn asset_candidates(&self, id: u32) -> Vec<PathBuf> {
        ASSET_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("pose{id}.{ext}")))
            .collect()
    }
}

/// Check that `path` holds a decodable image header.
async fn probe_image(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(())
}

impl PoseSource for DirectoryPoseSource {
    async fn fetch_pose_definition(&self, id: u32) -> Result<Skeleton> {
        let path = self.definition_path(id);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            TrainerError::PoseLoadError(format!("Cannot read {}: {e}", path.display()))
        })?;
        parse_pose_definition(&text).map_err(|e| {
            TrainerError::PoseLoadError(format!("Malformed {}: {e}", path.display()))
        })
    }

    async fn resolve_display_asset(&self, id: u32) -> Result<AssetRef> {
        let mut attempts = FallbackAttempts::new();
        for candidate in self.asset_candidates(id) {
            match probe_image(&candidate).await {
                Ok(()) => return Ok(AssetRef::new(candidate)),
                Err(e) => attempts.record(candidate.display(), e),
            }
        }
        Err(TrainerError::AssetError(format!(
            "pose {id}: {}",
            attempts.summary()
        )))
    }
}
