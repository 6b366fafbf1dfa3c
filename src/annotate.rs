// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame annotation: draws reference and live skeletons over camera frames.

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage, imageops};
use imageproc::drawing::{Blend, draw_filled_circle_mut, draw_line_segment_mut};

use crate::camera::Frame;
use crate::display::{DisplaySink, DrawCommand, Style};
use crate::error::{Result, TrainerError};
use crate::keypoint::Skeleton;
use crate::pose_set::AssetRef;
use crate::utils::pluralize_count;
use crate::visualizer::LIMBS;
use crate::{info, verbose};

/// Find the next available run directory (session, session2, session3, etc.)
#[must_use]
pub fn find_next_run_dir(base: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let base_path = base.as_ref();

    let first = base_path.join(prefix);
    if !first.exists() {
        return first;
    }

    (2..)
        .map(|i| base_path.join(format!("{prefix}{i}")))
        .find(|numbered| !numbered.exists())
        .unwrap_or(first)
}

/// Render `commands` over `frame`.
///
/// Overlays are drawn in the frame's own coordinates and the finished canvas is flipped
/// afterwards when `mirror` is set, so mirroring never touches keypoint coordinates.
#[must_use]
pub fn render_frame(frame: &Frame, commands: &[DrawCommand<'_>], mirror: bool) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let mut canvas = Blend(RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255])));

    for command in commands {
        match *command {
            DrawCommand::Frame => canvas.0 = frame.image.to_rgba8(),
            DrawCommand::Skeleton {
                skeleton,
                style,
                min_score,
            } => draw_skeleton(&mut canvas, skeleton, style, min_score),
        }
    }

    let mut image = canvas.0;
    if mirror {
        imageops::flip_horizontal_in_place(&mut image);
    }
    image
}

/// Draw usable keypoints as filled circles joined by limbs.
#[allow(clippy::cast_possible_truncation)]
fn draw_skeleton(canvas: &mut Blend<RgbaImage>, skeleton: &Skeleton, style: Style, min_score: f32) {
    let color = style.color.with_alpha(style.alpha);

    for [a, b] in LIMBS {
        if let (Some(p), Some(q)) = (skeleton.get(a), skeleton.get(b))
            && p.is_usable(min_score)
            && q.is_usable(min_score)
        {
            draw_line_segment_mut(canvas, (p.x, p.y), (q.x, q.y), color);
        }
    }

    for (_, kp) in skeleton.usable(min_score) {
        let center = (kp.x.round() as i32, kp.y.round() as i32);
        draw_filled_circle_mut(canvas, center, style.radius, color);
    }
}

/// Sink that saves every annotated frame to a run directory.
#[derive(Debug)]
pub struct AnnotatedFrameSink {
    dir: PathBuf,
    mirror: bool,
    saved: usize,
    created: bool,
    asset: Option<AssetRef>,
}

impl AnnotatedFrameSink {
    /// Create a sink writing into `dir`.
    ///
    /// The directory is created when the first frame is drawn.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, mirror: bool) -> Self {
        Self {
            dir: dir.into(),
            mirror,
            saved: 0,
            created: false,
            asset: None,
        }
    }

    fn ensure_dir(&mut self) -> Result<()> {
        if !self.created {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                TrainerError::RenderError(format!("Failed to create {}: {e}", self.dir.display()))
            })?;
            self.created = true;
        }
        Ok(())
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames written.
    #[must_use]
    pub const fn saved(&self) -> usize {
        self.saved
    }

    /// Asset of the pose currently shown.
    #[must_use]
    pub const fn current_asset(&self) -> Option<&AssetRef> {
        self.asset.as_ref()
    }
}

impl DisplaySink for AnnotatedFrameSink {
    fn draw(&mut self, frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()> {
        self.ensure_dir()?;
        let annotated = render_frame(frame, commands, self.mirror);
        let path = self.dir.join(format!("frame{:05}.jpg", frame.index));
        DynamicImage::ImageRgba8(annotated)
            .to_rgb8()
            .save(&path)
            .map_err(|e| {
                TrainerError::RenderError(format!("Failed to save {}: {e}", path.display()))
            })?;
        self.saved += 1;
        verbose!("Saved {}", path.display());
        Ok(())
    }

    fn show_asset(&mut self, asset: &AssetRef, _index: usize, _total: usize) -> Result<()> {
        self.asset = Some(asset.clone());
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        info!(
            "{} annotated {} saved to {}",
            self.saved,
            pluralize_count(self.saved, "frame"),
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{LIVE_STYLE, REFERENCE_STYLE};
    use crate::keypoint::Keypoint;
    use image::Rgba;

    fn frame() -> Frame {
        Frame::new(3, DynamicImage::new_rgb8(40, 20))
    }

    fn single_point(x: f32, y: f32, score: f32) -> Skeleton {
        Skeleton::new(vec![Keypoint::new(x, y, score)])
    }

    #[test]
    fn test_live_point_drawn_opaque() {
        let live = single_point(10.0, 10.0, 0.9);
        let commands = [
            DrawCommand::Frame,
            DrawCommand::Skeleton {
                skeleton: &live,
                style: LIVE_STYLE,
                min_score: 0.4,
            },
        ];
        let image = render_frame(&frame(), &commands, false);
        assert_eq!(*image.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_reference_point_translucent_and_low_conf_skipped() {
        let reference = Skeleton::new(vec![
            Keypoint::new(10.0, 10.0, 0.9),
            Keypoint::new(30.0, 10.0, 0.4),
        ]);
        let commands = [
            DrawCommand::Frame,
            DrawCommand::Skeleton {
                skeleton: &reference,
                style: REFERENCE_STYLE,
                min_score: 0.4,
            },
        ];
        let image = render_frame(&frame(), &commands, false);
        let blended = image.get_pixel(10, 10);
        assert!(blended[2] > 0 && blended[2] < 255, "{blended:?}");
        assert_eq!(image.get_pixel(30, 10)[2], 0);
    }

    #[test]
    fn test_mirror_flips_canvas_only() {
        let live = single_point(5.0, 10.0, 0.9);
        let commands = [DrawCommand::Skeleton {
            skeleton: &live,
            style: LIVE_STYLE,
            min_score: 0.4,
        }];
        let image = render_frame(&frame(), &commands, true);
        assert_eq!(image.get_pixel(34, 10)[0], 255);
        assert_eq!(image.get_pixel(5, 10)[0], 0);
        // Coordinates handed to the renderer are untouched
        assert!((live.get(0).unwrap().x - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sink_saves_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = AnnotatedFrameSink::new(dir.path().join("session"), true);
        sink.draw(&frame(), &[DrawCommand::Frame]).unwrap();
        sink.show_asset(&AssetRef::new("pose2.png"), 1, 3).unwrap();
        assert_eq!(sink.saved(), 1);
        assert!(sink.dir().join("frame00003.jpg").exists());
        assert_eq!(sink.current_asset(), Some(&AssetRef::new("pose2.png")));
    }

    #[test]
    fn test_sink_creates_dir_on_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("runs").join("session");
        let mut sink = AnnotatedFrameSink::new(&out, false);

        sink.show_asset(&AssetRef::new("pose1.png"), 0, 2).unwrap();
        sink.complete().unwrap();
        assert!(!out.exists());

        sink.draw(&frame(), &[DrawCommand::Frame]).unwrap();
        assert!(out.join("frame00003.jpg").exists());
    }

    #[test]
    fn test_find_next_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_next_run_dir(dir.path(), "session"), dir.path().join("session"));
        std::fs::create_dir(dir.path().join("session")).unwrap();
        assert_eq!(find_next_run_dir(dir.path(), "session"), dir.path().join("session2"));
    }
}
