// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Display sink seam.
//!
//! Every sampling iteration hands the sink a frame plus an ordered list of [`DrawCommand`]s:
//! first the camera frame, then the reference skeleton in [`REFERENCE_STYLE`], then the live
//! skeleton (if any) in [`LIVE_STYLE`]. Pose changes and completion are reported separately.

use crate::camera::Frame;
use crate::error::Result;
use crate::keypoint::Skeleton;
use crate::pose_set::AssetRef;
use crate::visualizer::Color;
use crate::{info, success, verbose};

/// How a skeleton is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// Fill color.
    pub color: Color,
    /// Keypoint radius in pixels.
    pub radius: i32,
    /// Opacity (0.0 to 1.0).
    pub alpha: f32,
}

/// Reference pose: translucent blue.
pub const REFERENCE_STYLE: Style = Style {
    color: Color::BLUE,
    radius: 6,
    alpha: 0.5,
};

/// Live detection: opaque red.
pub const LIVE_STYLE: Style = Style {
    color: Color::RED,
    radius: 6,
    alpha: 1.0,
};

/// One drawing step for a frame.
#[derive(Debug, Clone, Copy)]
pub enum DrawCommand<'a> {
    /// Draw the camera frame itself.
    Frame,
    /// Draw the keypoints of `skeleton` whose confidence exceeds `min_score`.
    Skeleton {
        /// Keypoints to draw.
        skeleton: &'a Skeleton,
        /// Drawing style.
        style: Style,
        /// Confidence cutoff; keypoints at or below it are skipped.
        min_score: f32,
    },
}

/// Receives drawing commands and session notifications.
pub trait DisplaySink {
    /// Present `frame` with the overlays described by `commands`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be rendered or presented.
    fn draw(&mut self, frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()>;

    /// Show the asset of the pose at `index` (of `total`).
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be presented.
    fn show_asset(&mut self, asset: &AssetRef, index: usize, total: usize) -> Result<()>;

    /// Announce that every pose has been completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be delivered.
    fn complete(&mut self) -> Result<()>;
}

/// Sink that only logs pose changes and completion.
#[derive(Debug, Default, Clone)]
pub struct LogSink {
    frames: usize,
}

impl LogSink {
    /// Create a new log sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: 0 }
    }

    /// Frames drawn so far.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }
}

impl DisplaySink for LogSink {
    fn draw(&mut self, frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()> {
        self.frames += 1;
        let skeletons = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Skeleton { .. }))
            .count();
        verbose!("frame {}: {} overlay(s)", frame.index, skeletons);
        Ok(())
    }

    fn show_asset(&mut self, asset: &AssetRef, index: usize, total: usize) -> Result<()> {
        info!("Pose {}/{}: {asset}", index + 1, total);
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        success!("All poses complete!");
        Ok(())
    }
}

/// Fan-out: every sink sees every call, in order. Stops at the first failing sink.
impl DisplaySink for Vec<Box<dyn DisplaySink>> {
    fn draw(&mut self, frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.draw(frame, commands))
    }

    fn show_asset(&mut self, asset: &AssetRef, index: usize, total: usize) -> Result<()> {
        self.iter_mut()
            .try_for_each(|sink| sink.show_asset(asset, index, total))
    }

    fn complete(&mut self) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.complete())
    }
}
