// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Trainer
//!
//! Pose-matching exercise engine. The user is shown a reference body pose, the live camera feed
//! is compared against it frame by frame, and the session moves through a shuffled sequence of
//! poses as each one is matched (or skipped).
//!
//! ## Features
//!
//! - **Shuffled Sessions** - Fisher–Yates order over pose ids `1..=N`, reproducible with a seed
//! - **Keypoint Similarity** - Mean distance over confident keypoint pairs, mapped to `[0, 1]`
//! - **Progression** - Advance above the threshold, manual skips, terminal completion
//! - **Async Sampling** - One frame per iteration, cooperative cancellation
//! - **Backend Fallback** - Inference backends tried in order until one initializes
//! - **Pluggable Seams** - Camera, inference, pose data and display are traits
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_trainer::{
//!     DirectoryPoseSource, LogSink, LoopOutcome, RecordedEstimatorFactory, ReplayCamera,
//!     SessionConfig, Trainer,
//! };
//! use rand::SeedableRng;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//!     runtime.block_on(async {
//!         let config = SessionConfig::new().with_total_poses(5);
//!         let mut trainer = Trainer::new(config, LogSink::new());
//!         let mut rng = rand::rngs::StdRng::from_entropy();
//!
//!         let ready = trainer
//!             .start(
//!                 &mut ReplayCamera::new("frames/"),
//!                 &mut RecordedEstimatorFactory::new("detections.json"),
//!                 &DirectoryPoseSource::new("poses/"),
//!                 &mut rng,
//!             )
//!             .await?;
//!
//!         if trainer.run(ready.stream, ready.estimator).await? == LoopOutcome::Completed {
//!             println!("Done!");
//!         }
//!         Ok::<_, pose_trainer::TrainerError>(())
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Replay recorded frames and detections against poses/pose{1..7}.json
//! pose-trainer run --poses poses/ --source frames/ --detections detections.json
//!
//! # Three poses, stricter threshold, reproducible order
//! pose-trainer run -p poses/ -s frames/ -d detections.json --count 3 --threshold 0.9 --seed 42
//!
//! # Save annotated frames to runs/session
//! pose-trainer run -p poses/ -s "frames/*.jpg" -d detections.json --save
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use pose_trainer::{Backend, SessionConfig};
//!
//! let config = SessionConfig::new()
//!     .with_total_poses(7)               // Poses per session
//!     .with_similarity_threshold(0.85)   // Score needed to advance
//!     .with_confidence(0.4)              // Keypoint confidence cutoff
//!     .with_backends(vec![Backend::Wasm, Backend::Cpu])
//!     .with_frame_interval(Duration::from_millis(33));
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | [`Trainer`] controller and [`SessionState`] |
//! | [`sampling`] | [`SamplingLoop`], [`CancelHandle`], [`SkipHandle`] |
//! | [`progression`] | [`Progression`] state machine |
//! | [`similarity`] | Keypoint similarity [`score`] |
//! | [`sequencer`] | Pose order shuffling |
//! | [`pose_set`] | Reference poses and [`PoseSource`] |
//! | [`camera`] | [`CameraProvider`] and [`FrameSource`] |
//! | [`estimator`] | [`PoseEstimator`] and recorded detections |
//! | [`backend`] | [`Backend`] list and fallback selection |
//! | [`display`] | [`DisplaySink`] and draw commands |
//! | [`error`] | Error types ([`TrainerError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Overlay rendering and saved annotated frames (default) |
//! | `visualize` | Live preview window |

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod backend;
pub mod camera;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod estimator;
pub mod keypoint;
pub mod pose_set;
pub mod progression;
pub mod sampling;
pub mod sequencer;
pub mod session;
pub mod similarity;
pub mod utils;
pub mod visualizer;

// Re-export main types for convenience
pub use backend::{Backend, select_backend};
pub use camera::{CameraProvider, Frame, FrameSource, ReplayCamera};
pub use config::{CaptureConstraints, Facing, ScoringConfig, SessionConfig};
pub use display::{DisplaySink, DrawCommand, LogSink};
pub use error::{Result, TrainerError};
pub use estimator::{EstimatorFactory, PoseEstimator, RecordedEstimator, RecordedEstimatorFactory};
pub use keypoint::{Keypoint, Skeleton};
pub use pose_set::{AssetRef, DirectoryPoseSource, PoseSource, ReferencePose};
pub use progression::{PoseProgress, Progression, Transition};
pub use sampling::{CancelHandle, LoopOutcome, SamplingLoop, SkipHandle};
pub use session::{Ready, SessionState, Trainer};
pub use similarity::score;

#[cfg(feature = "annotate")]
pub use annotate::AnnotatedFrameSink;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
