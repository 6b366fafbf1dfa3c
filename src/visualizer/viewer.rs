// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Live session window.

use std::time::{Duration, Instant};

use image::RgbaImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::annotate::render_frame;
use crate::camera::Frame;
use crate::display::{DisplaySink, DrawCommand};
use crate::error::{Result, TrainerError};
use crate::pose_set::AssetRef;
use crate::sampling::{CancelHandle, SkipHandle};

/// How long the finished session stays on screen.
const COMPLETE_HOLD: Duration = Duration::from_secs(2);

/// A window showing the annotated camera feed.
///
/// Space requests a manual skip. Escape, Q or closing the window cancels the session.
pub struct Viewer {
    window: Window,
    title: String,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
    mirror: bool,
    skip: SkipHandle,
    cancel: CancelHandle,
}

impl Viewer {
    /// Create a new viewer window.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::RenderError`] if the window cannot be created.
    pub fn new(
        title: &str,
        width: usize,
        height: usize,
        mirror: bool,
        skip: SkipHandle,
        cancel: CancelHandle,
    ) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| TrainerError::RenderError(format!("Failed to create window: {e}")))?;

        // Limit update rate
        window.set_target_fps(60);

        Ok(Self {
            window,
            title: title.to_string(),
            width,
            height,
            buffer: Vec::new(),
            mirror,
            skip,
            cancel,
        })
    }

    /// Translate key presses and window state into session signals.
    fn poll_input(&self) {
        if !self.window.is_open()
            || self.window.is_key_down(Key::Escape)
            || self.window.is_key_down(Key::Q)
        {
            self.cancel.cancel();
            return;
        }
        if self.window.is_key_pressed(Key::Space, KeyRepeat::No) {
            self.skip.skip();
        }
    }

    fn present(&mut self, image: &RgbaImage) -> Result<()> {
        let (img_width, img_height) = (image.width() as usize, image.height() as usize);

        let num_pixels = img_width * img_height;
        if self.buffer.len() != num_pixels {
            self.buffer.resize(num_pixels, 0);
        }

        // Pack as 0x00RRGGBB
        for (dst, pixel) in self.buffer.iter_mut().zip(image.pixels()) {
            *dst = (u32::from(pixel[0]) << 16) | (u32::from(pixel[1]) << 8) | u32::from(pixel[2]);
        }

        self.width = img_width;
        self.height = img_height;

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| TrainerError::RenderError(format!("Failed to update window: {e}")))
    }

    /// Keep the last image on screen for `duration` or until the window is closed.
    fn hold(&mut self, duration: Duration) {
        if self.buffer.is_empty() {
            return;
        }

        let start = Instant::now();
        while start.elapsed() < duration && self.window.is_open() {
            if self.window.is_key_down(Key::Escape) || self.window.is_key_down(Key::Q) {
                break;
            }
            let _ = self
                .window
                .update_with_buffer(&self.buffer, self.width, self.height);
        }
    }
}

impl DisplaySink for Viewer {
    fn draw(&mut self, frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()> {
        let annotated = render_frame(frame, commands, self.mirror);
        self.present(&annotated)?;
        self.poll_input();
        Ok(())
    }

    fn show_asset(&mut self, asset: &AssetRef, index: usize, total: usize) -> Result<()> {
        self.window
            .set_title(&format!("{} - pose {}/{} ({asset})", self.title, index + 1, total));
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        self.window
            .set_title(&format!("{} - all poses complete!", self.title));
        self.hold(COMPLETE_HOLD);
        Ok(())
    }
}
