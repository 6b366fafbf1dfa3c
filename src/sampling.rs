// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The sampling loop.
//!
//! One iteration grabs a frame, awaits inference on it, draws the overlays, scores the live
//! skeleton against the current reference and feeds the result to the progression. Iterations
//! never overlap: each one finishes (inference included) before the next frame is taken.
//!
//! The loop stops when the session completes, when cancellation is requested through a
//! [`CancelHandle`], or when the frame source runs dry. Manual skips arrive through a
//! [`SkipHandle`] and are applied at most one per iteration, and only in an iteration that did
//! not already advance on its own.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use crate::camera::FrameSource;
use crate::config::{ScoringConfig, SessionConfig};
use crate::display::{DisplaySink, DrawCommand, LIVE_STYLE, REFERENCE_STYLE};
use crate::error::Result;
use crate::estimator::PoseEstimator;
use crate::progression::Transition;
use crate::session::SessionState;
use crate::similarity::score;
use crate::{verbose, warn};

/// Shared stop flag for a running loop.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop at its next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sender side of the manual advance signal.
#[derive(Debug, Clone)]
pub struct SkipHandle(mpsc::UnboundedSender<()>);

impl SkipHandle {
    /// Create a handle and the receiver the loop drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Ask to move on to the next pose. Never blocks.
    pub fn skip(&self) {
        // A closed receiver means no session is listening anymore
        let _ = self.0.send(());
    }
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Every pose was cleared.
    Completed,
    /// Cancellation was requested before the session completed.
    Cancelled,
    /// The frame source ended before the session completed.
    Exhausted,
}

impl fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Exhausted => write!(f, "stopped (no more frames)"),
        }
    }
}

/// Per-frame sampling over a stream and an estimator.
#[derive(Debug)]
pub struct SamplingLoop<F, E> {
    stream: F,
    estimator: E,
    threshold: f32,
    scoring: ScoringConfig,
    frame_interval: Duration,
    cancel: CancelHandle,
    iterations: u64,
    comparisons: u64,
}

impl<F: FrameSource, E: PoseEstimator> SamplingLoop<F, E> {
    /// Create a loop over `stream` and `estimator` with thresholds taken from `config`.
    #[must_use]
    pub fn new(stream: F, estimator: E, config: &SessionConfig, cancel: CancelHandle) -> Self {
        Self {
            stream,
            estimator,
            threshold: config.similarity_threshold,
            scoring: config.scoring,
            frame_interval: config.frame_interval,
            cancel,
            iterations: 0,
            comparisons: 0,
        }
    }

    /// Iterations that produced an inference result.
    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Similarity comparisons made.
    #[must_use]
    pub const fn comparisons(&self) -> u64 {
        self.comparisons
    }

    /// Give back the stream and estimator.
    pub fn into_parts(self) -> (F, E) {
        (self.stream, self.estimator)
    }

    /// Run until the session completes, is cancelled, or frames run out.
    ///
    /// # Arguments
    ///
    /// * `state` - Session state, mutated only through its progression.
    /// * `sink` - Receives overlays for every frame and the pose change notifications.
    /// * `skips` - Pending manual skips.
    ///
    /// # Errors
    ///
    /// Propagates frame, inference and display failures; the session stays where it was.
    pub async fn run<D: DisplaySink + ?Sized>(
        &mut self,
        state: &mut SessionState,
        sink: &mut D,
        skips: &mut mpsc::UnboundedReceiver<()>,
    ) -> Result<LoopOutcome> {
        let mut ticker = self.ticker();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(LoopOutcome::Cancelled);
            }
            if state.is_completed() {
                return Ok(LoopOutcome::Completed);
            }

            match ticker.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => tokio::task::yield_now().await,
            }

            let Some(frame) = self.stream.next_frame().await? else {
                warn!(
                    "Frame source ended at pose {}/{}",
                    state.current_index() + 1,
                    state.len()
                );
                return Ok(LoopOutcome::Exhausted);
            };

            let detections = self.estimator.estimate_poses(&frame).await?;
            // Results that land after cancellation must not touch the session
            if self.cancel.is_cancelled() {
                return Ok(LoopOutcome::Cancelled);
            }
            let cycle = state.next_cycle();
            self.iterations += 1;

            let live = detections.into_iter().next();
            let similarity = {
                let Some(reference) = state.current_pose() else {
                    return Ok(LoopOutcome::Completed);
                };
                let mut commands = vec![
                    DrawCommand::Frame,
                    DrawCommand::Skeleton {
                        skeleton: &reference.skeleton,
                        style: REFERENCE_STYLE,
                        min_score: self.scoring.confidence_threshold,
                    },
                ];
                if let Some(live) = &live {
                    commands.push(DrawCommand::Skeleton {
                        skeleton: live,
                        style: LIVE_STYLE,
                        min_score: self.scoring.confidence_threshold,
                    });
                }
                sink.draw(&frame, &commands)?;

                live.as_ref()
                    .map(|live| score(live, &reference.skeleton, &self.scoring))
            };

            let mut transition = Transition::Stay;
            if let Some(similarity) = similarity {
                self.comparisons += 1;
                verbose!("frame {}: similarity {similarity:.3}", frame.index);
                transition = state.progression_mut().observe(similarity, self.threshold, cycle);
            }
            if !transition.is_advance() && skips.try_recv().is_ok() {
                transition = state.progression_mut().skip(cycle);
            }

            state.publish(transition, sink)?;
            if transition == Transition::Finished {
                self.cancel.cancel();
                return Ok(LoopOutcome::Completed);
            }
        }
    }

    fn ticker(&self) -> Option<Interval> {
        if self.frame_interval.is_zero() {
            return None;
        }
        let mut interval = tokio::time::interval(self.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Frame;
    use crate::error::TrainerError;
    use crate::keypoint::{Keypoint, Skeleton};
    use crate::pose_set::{AssetRef, ReferencePose};
    use image::DynamicImage;
    use std::collections::VecDeque;

    struct Frames(usize, usize);

    impl FrameSource for Frames {
        async fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.0 >= self.1 {
                return Ok(None);
            }
            self.0 += 1;
            Ok(Some(Frame::new(self.0 - 1, DynamicImage::new_rgb8(4, 4))))
        }
    }

    /// Returns the scripted detections in order, then nothing.
    struct Scripted {
        detections: VecDeque<Vec<Skeleton>>,
        cancel_on_call: Option<(usize, CancelHandle)>,
        calls: usize,
    }

    impl Scripted {
        fn new(detections: Vec<Vec<Skeleton>>) -> Self {
            Self {
                detections: detections.into(),
                cancel_on_call: None,
                calls: 0,
            }
        }
    }

    impl PoseEstimator for Scripted {
        async fn estimate_poses(&mut self, _frame: &Frame) -> Result<Vec<Skeleton>> {
            self.calls += 1;
            if let Some((call, handle)) = &self.cancel_on_call
                && *call == self.calls
            {
                handle.cancel();
            }
            Ok(self.detections.pop_front().unwrap_or_default())
        }
    }

    struct Failing;

    impl PoseEstimator for Failing {
        async fn estimate_poses(&mut self, _frame: &Frame) -> Result<Vec<Skeleton>> {
            Err(TrainerError::InferenceError("device lost".to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: usize,
        assets: Vec<usize>,
        completions: usize,
        last_commands: usize,
    }

    impl DisplaySink for Recorder {
        fn draw(&mut self, _frame: &Frame, commands: &[DrawCommand<'_>]) -> Result<()> {
            self.frames += 1;
            self.last_commands = commands.len();
            Ok(())
        }

        fn show_asset(&mut self, _asset: &AssetRef, index: usize, _total: usize) -> Result<()> {
            self.assets.push(index);
            Ok(())
        }

        fn complete(&mut self) -> Result<()> {
            self.completions += 1;
            Ok(())
        }
    }

    fn body() -> Skeleton {
        Skeleton::new(vec![
            Keypoint::new(100.0, 100.0, 0.9),
            Keypoint::new(120.0, 140.0, 0.9),
        ])
    }

    fn state(n: u32) -> SessionState {
        let order: Vec<u32> = (1..=n).collect();
        let poses = order
            .iter()
            .map(|&id| ReferencePose {
                id,
                skeleton: body(),
                asset: AssetRef::new(format!("pose{id}.png")),
            })
            .collect();
        SessionState::new(order, poses).unwrap()
    }

    fn config() -> SessionConfig {
        SessionConfig::new().with_frame_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_completes_on_matching_frames() {
        let mut state = state(3);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let cancel = CancelHandle::new();
        let estimator = Scripted::new(vec![vec![body()]; 5]);
        let mut sampling = SamplingLoop::new(Frames(0, 10), estimator, &config(), cancel.clone());

        let outcome = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        assert_eq!(outcome, LoopOutcome::Completed);
        assert_eq!(sampling.iterations(), 3);
        assert_eq!(sink.assets, vec![1, 2]);
        assert_eq!(sink.completions, 1);
        assert!(cancel.is_cancelled());
        assert!(state.is_completed());
    }

    #[tokio::test]
    async fn test_no_detection_stays_and_exhausts() {
        let mut state = state(2);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let mut sampling =
            SamplingLoop::new(Frames(0, 4), Scripted::new(vec![]), &config(), CancelHandle::new());

        let outcome = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        assert_eq!(outcome, LoopOutcome::Exhausted);
        assert_eq!(sampling.comparisons(), 0);
        assert_eq!(sink.frames, 4);
        // Frame and reference only
        assert_eq!(sink.last_commands, 2);
        assert_eq!(state.current_index(), 0);
    }

    #[tokio::test]
    async fn test_one_advance_per_cycle() {
        let mut state = state(3);
        let mut sink = Recorder::default();
        let (tx, mut rx) = SkipHandle::channel();
        tx.skip();
        let estimator = Scripted::new(vec![vec![body()], vec![], vec![], vec![]]);
        let mut sampling =
            SamplingLoop::new(Frames(0, 2), estimator, &config(), CancelHandle::new());

        let outcome = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        // Cycle 0 advanced on the match, so the skip waited for cycle 1
        assert_eq!(outcome, LoopOutcome::Exhausted);
        assert_eq!(sink.assets, vec![1, 2]);
        assert_eq!(state.current_index(), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let mut state = state(3);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let cancel = CancelHandle::new();
        cancel.cancel();
        let mut sampling = SamplingLoop::new(
            Frames(0, 10),
            Scripted::new(vec![vec![body()]; 10]),
            &config(),
            cancel,
        );

        let outcome = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        assert_eq!(outcome, LoopOutcome::Cancelled);
        assert_eq!(sampling.comparisons(), 0);
        assert_eq!(sink.frames, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_inference_discards_result() {
        let mut state = state(3);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let cancel = CancelHandle::new();
        let mut estimator = Scripted::new(vec![vec![body()]; 10]);
        estimator.cancel_on_call = Some((2, cancel.clone()));
        let mut sampling = SamplingLoop::new(Frames(0, 10), estimator, &config(), cancel);

        let outcome = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        assert_eq!(outcome, LoopOutcome::Cancelled);
        assert_eq!(state.current_index(), 1);
        assert_eq!(sampling.comparisons(), 1);
    }

    #[tokio::test]
    async fn test_inference_error_propagates() {
        let mut state = state(1);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let mut sampling = SamplingLoop::new(Frames(0, 3), Failing, &config(), CancelHandle::new());

        let err = sampling.run(&mut state, &mut sink, &mut rx).await.unwrap_err();

        assert!(matches!(err, TrainerError::InferenceError(_)));
        assert_eq!(state.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_paces_frames() {
        let mut state = state(1);
        let mut sink = Recorder::default();
        let (_tx, mut rx) = SkipHandle::channel();
        let config = SessionConfig::new().with_frame_interval(Duration::from_millis(33));
        let start = tokio::time::Instant::now();
        let mut sampling =
            SamplingLoop::new(Frames(0, 3), Scripted::new(vec![]), &config, CancelHandle::new());

        sampling.run(&mut state, &mut sink, &mut rx).await.unwrap();

        // First tick fires immediately
        assert!(start.elapsed() >= Duration::from_millis(66));
    }
}
