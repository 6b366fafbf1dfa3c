// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Camera acquisition and frame sources.
//!
//! The engine only needs two things from a camera: a one-time stream acquisition that honors
//! [`CaptureConstraints`], and a stream that yields one [`Frame`] per sampling iteration.
//! [`ReplayCamera`] implements both over a directory or glob of image files, which stands in
//! for a live device when running sessions offline.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};

use crate::config::{CaptureConstraints, Facing};
use crate::error::{Result, TrainerError};
use crate::utils::pluralize_count;
use crate::verbose;

/// A single captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based position in the stream.
    pub index: usize,
    /// Pixel data.
    pub image: DynamicImage,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub const fn new(index: usize, image: DynamicImage) -> Self {
        Self { index, image }
    }

    /// Frame size as (width, height).
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Source of frames for the sampling loop.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Grab the next frame. `Ok(None)` means the stream has ended.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Provider of camera streams.
#[allow(async_fn_in_trait)]
pub trait CameraProvider {
    /// Stream type produced on success.
    type Stream: FrameSource;

    /// Acquire a stream matching `constraints`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::AcquisitionError`] when no matching camera is available or
    /// access is denied.
    async fn acquire_stream(&mut self, constraints: &CaptureConstraints) -> Result<Self::Stream>;
}

/// Camera provider that replays image files as a stream.
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    pattern: String,
    facing: Facing,
}

impl ReplayCamera {
    /// Create a replay camera over a directory (`frames/`) or simple glob (`frames/*.jpg`).
    ///
    /// The replayed footage is treated as coming from the rear camera.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            facing: Facing::Environment,
        }
    }

    /// Declare which way the recorded camera faced.
    #[must_use]
    pub const fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Collect image paths from a directory.
    fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| {
                TrainerError::AcquisitionError(format!("Cannot read {}: {e}", dir.display()))
            })?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Collect image paths from a glob pattern.
    ///
    /// Only patterns like "dir/*.jpg" are supported.
    fn collect_images_from_glob(pattern: &str) -> Result<Vec<PathBuf>> {
        let Some(star_pos) = pattern.find('*') else {
            let path = PathBuf::from(pattern);
            if !path.is_file() || !is_image_file(&path) {
                return Err(TrainerError::AcquisitionError(format!(
                    "no image file at '{pattern}'"
                )));
            }
            return Ok(vec![path]);
        };

        let dir_part = &pattern[..star_pos];
        let dir = if dir_part.is_empty() {
            Path::new(".")
        } else {
            Path::new(dir_part.trim_end_matches('/').trim_end_matches('\\'))
        };

        // "*.jpg" -> "jpg"
        let ext_filter: Option<String> = pattern[star_pos..]
            .strip_prefix("*.")
            .map(str::to_lowercase);

        if !dir.is_dir() {
            return Err(TrainerError::AcquisitionError(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                ext_filter.as_ref().map_or_else(
                    || is_image_file(path),
                    |ext| {
                        path.extension()
                            .is_some_and(|e| e.to_string_lossy().to_lowercase() == *ext)
                    },
                )
            })
            .collect();

        paths.sort();
        Ok(paths)
    }
}

impl CameraProvider for ReplayCamera {
    type Stream = ReplayStream;

    async fn acquire_stream(&mut self, constraints: &CaptureConstraints) -> Result<ReplayStream> {
        if constraints.facing != self.facing {
            return Err(TrainerError::AcquisitionError(format!(
                "no camera facing '{}' (replay source faces '{}')",
                constraints.facing, self.facing
            )));
        }

        let path = Path::new(&self.pattern);
        let paths = if path.is_dir() {
            Self::collect_images_from_dir(path)?
        } else {
            Self::collect_images_from_glob(&self.pattern)?
        };

        if paths.is_empty() {
            return Err(TrainerError::AcquisitionError(format!(
                "no frames found in '{}'",
                self.pattern
            )));
        }

        verbose!(
            "Replaying {} {} from '{}' (ideal {}x{}, facing {})",
            paths.len(),
            pluralize_count(paths.len(), "frame"),
            self.pattern,
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing
        );

        Ok(ReplayStream {
            paths,
            current_frame: 0,
        })
    }
}

/// Stream over replayed image files.
#[derive(Debug)]
pub struct ReplayStream {
    paths: Vec<PathBuf>,
    current_frame: usize,
}

impl ReplayStream {
    /// Total frames in the stream.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ReplayStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.current_frame) else {
            return Ok(None);
        };
        let index = self.current_frame;
        self.current_frame += 1;

        let bytes = tokio::fs::read(path).await?;
        let image = image::load_from_memory(&bytes).map_err(|e| {
            TrainerError::ImageError(format!("Failed to load {}: {e}", path.display()))
        })?;
        Ok(Some(Frame::new(index, image)))
    }
}

/// Check if a path is an image file based on extension.
fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(ext.as_str(), "jpg" | "jpeg" | "png")
    })
}
