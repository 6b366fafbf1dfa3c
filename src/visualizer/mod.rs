// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Visualization helpers for session frames.

/// Color definitions.
pub mod color;

/// Limb topology for drawing skeletons.
pub mod skeleton;

#[cfg(feature = "visualize")]
pub mod viewer;

pub use color::Color;
pub use skeleton::LIMBS;

#[cfg(feature = "visualize")]
pub use viewer::Viewer;
