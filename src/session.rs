// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Session controller.
//!
//! [`Trainer`] owns the session: it acquires the camera, picks an inference backend, fixes the
//! pose order, loads the reference poses and then lends the [`SessionState`] to the
//! [`SamplingLoop`] until the session completes or is cancelled.

use rand::Rng;
use tokio::sync::mpsc;

use crate::backend::{Backend, select_backend};
use crate::camera::{CameraProvider, FrameSource};
use crate::config::SessionConfig;
use crate::display::DisplaySink;
use crate::error::{Result, TrainerError};
use crate::estimator::{EstimatorFactory, PoseEstimator};
use crate::pose_set::{PoseSource, ReferencePose, load_poses};
use crate::progression::{Progression, Transition};
use crate::sampling::{CancelHandle, LoopOutcome, SamplingLoop, SkipHandle};
use crate::sequencer::shuffle_order;
use crate::utils::pluralize_count;
use crate::{info, section, verbose};

/// The pose order, the loaded poses and how far the user got.
///
/// `poses[i].id == order[i]` for every `i`.
#[derive(Debug, Clone)]
pub struct SessionState {
    order: Vec<u32>,
    poses: Vec<ReferencePose>,
    progression: Progression,
    cycle: u64,
}

impl SessionState {
    /// Build a state from an order and the poses loaded for it.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::PoseLoadError`] if the poses do not match the order one to one.
    pub fn new(order: Vec<u32>, poses: Vec<ReferencePose>) -> Result<Self> {
        if order.len() != poses.len() {
            return Err(TrainerError::PoseLoadError(format!(
                "expected {} poses, loaded {}",
                order.len(),
                poses.len()
            )));
        }
        if let Some((i, pose)) = poses
            .iter()
            .enumerate()
            .find(|(i, pose)| pose.id != order[*i])
        {
            return Err(TrainerError::PoseLoadError(format!(
                "pose at position {i} has id {}, expected {}",
                pose.id, order[i]
            )));
        }
        let progression = Progression::new(poses.len());
        Ok(Self {
            order,
            poses,
            progression,
            cycle: 0,
        })
    }

    /// Pose ids in presentation order.
    #[must_use]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Loaded poses, aligned with [`order`](Self::order).
    #[must_use]
    pub fn poses(&self) -> &[ReferencePose] {
        &self.poses
    }

    /// Number of poses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Check if the session has no poses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Progress through the poses.
    #[must_use]
    pub const fn progression(&self) -> &Progression {
        &self.progression
    }

    pub(crate) const fn progression_mut(&mut self) -> &mut Progression {
        &mut self.progression
    }

    /// Index of the pose being matched (equals `len()` once complete).
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.progression.current_index()
    }

    /// The pose being matched, or `None` once complete.
    #[must_use]
    pub fn current_pose(&self) -> Option<&ReferencePose> {
        self.poses.get(self.progression.current_index())
    }

    /// Whether every pose has been cleared.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.progression.is_completed()
    }

    /// Number of the next sampling cycle.
    pub(crate) const fn next_cycle(&mut self) -> u64 {
        let cycle = self.cycle;
        self.cycle += 1;
        cycle
    }

    /// Tell `sink` about a transition: the next asset on advance, completion on finish.
    pub(crate) fn publish<D: DisplaySink + ?Sized>(
        &self,
        transition: Transition,
        sink: &mut D,
    ) -> Result<()> {
        match transition {
            Transition::Advanced { index } => {
                if let Some(pose) = self.poses.get(index) {
                    sink.show_asset(&pose.asset, index, self.len())?;
                }
            }
            Transition::Finished => sink.complete()?,
            Transition::Stay | Transition::Ignored | Transition::Deferred => {}
        }
        Ok(())
    }
}

/// Everything start-up produced, ready to hand to [`Trainer::run`].
#[derive(Debug)]
pub struct Ready<S, E> {
    /// Acquired camera stream.
    pub stream: S,
    /// Estimator on the selected backend.
    pub estimator: E,
    /// Backend that initialized.
    pub backend: Backend,
}

/// Drives one pose-matching session.
///
/// # Example
///
/// ```no_run
/// use pose_trainer::{
///     DirectoryPoseSource, LogSink, RecordedEstimatorFactory, ReplayCamera, SessionConfig,
///     Trainer,
/// };
/// use rand::SeedableRng;
///
/// # async fn demo() -> pose_trainer::Result<()> {
/// let mut trainer = Trainer::new(SessionConfig::new(), LogSink::new());
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let ready = trainer
///     .start(
///         &mut ReplayCamera::new("frames/"),
///         &mut RecordedEstimatorFactory::new("detections.json"),
///         &DirectoryPoseSource::new("poses/"),
///         &mut rng,
///     )
///     .await?;
/// let outcome = trainer.run(ready.stream, ready.estimator).await?;
/// println!("{outcome}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Trainer<D: DisplaySink> {
    config: SessionConfig,
    sink: D,
    state: Option<SessionState>,
    cancel: CancelHandle,
    skip_tx: SkipHandle,
    skip_rx: mpsc::UnboundedReceiver<()>,
}

impl<D: DisplaySink> Trainer<D> {
    /// Create a controller with no session loaded.
    #[must_use]
    pub fn new(config: SessionConfig, sink: D) -> Self {
        let (skip_tx, skip_rx) = SkipHandle::channel();
        Self {
            config,
            sink,
            state: None,
            cancel: CancelHandle::new(),
            skip_tx,
            skip_rx,
        }
    }

    /// Create a controller whose sink needs the session's skip and cancel handles,
    /// e.g. an interactive window.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `make_sink`.
    pub fn with_sink<F>(config: SessionConfig, make_sink: F) -> Result<Self>
    where
        F: FnOnce(SkipHandle, CancelHandle) -> Result<D>,
    {
        let (skip_tx, skip_rx) = SkipHandle::channel();
        let cancel = CancelHandle::new();
        let sink = make_sink(skip_tx.clone(), cancel.clone())?;
        Ok(Self {
            config,
            sink,
            state: None,
            cancel,
            skip_tx,
            skip_rx,
        })
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle that stops a running session.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Handle that requests a manual advance.
    #[must_use]
    pub fn skip_handle(&self) -> SkipHandle {
        self.skip_tx.clone()
    }

    /// The loaded session, if any.
    #[must_use]
    pub const fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    /// Display sink.
    #[must_use]
    pub const fn sink(&self) -> &D {
        &self.sink
    }

    /// Consume the controller and return its sink.
    pub fn into_sink(self) -> D {
        self.sink
    }

    /// Advance to the next pose right away, as if the user tapped "skip".
    ///
    /// Returns [`Transition::Ignored`] when no session is loaded or it already completed.
    ///
    /// # Errors
    ///
    /// Propagates display failures while announcing the new pose.
    pub fn skip(&mut self) -> Result<Transition> {
        let Some(state) = self.state.as_mut() else {
            verbose!("Skip ignored: no session loaded");
            return Ok(Transition::Ignored);
        };
        let cycle = state.next_cycle();
        let transition = state.progression_mut().skip(cycle);
        state.publish(transition, &mut self.sink)?;
        if transition == Transition::Finished {
            self.cancel.cancel();
        }
        Ok(transition)
    }

    /// Shuffle the pose order and load every pose in it.
    ///
    /// On success the first pose's asset is shown and skips requested before now are dropped.
    /// On failure no session is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::ConfigError`] for an invalid configuration, or the first pose
    /// definition or asset error.
    pub async fn load<P, R>(&mut self, source: &P, rng: &mut R) -> Result<()>
    where
        P: PoseSource + ?Sized,
        R: Rng + ?Sized,
    {
        self.state = None;
        self.config.validate()?;

        let order = shuffle_order(self.config.total_poses, rng);
        let poses = load_poses(source, &order).await?;
        let state = SessionState::new(order, poses)?;
        info!("Loaded {} {}", state.len(), pluralize_count(state.len(), "pose"));

        match state.poses().first() {
            Some(first) => self.sink.show_asset(&first.asset, 0, state.len())?,
            None => self.sink.complete()?,
        }

        let mut dropped = 0;
        while self.skip_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            verbose!("Dropped {dropped} skip(s) requested before the poses loaded");
        }

        self.state = Some(state);
        Ok(())
    }

    /// Run start-up: acquire the camera, select a backend, then [`load`](Self::load) poses.
    ///
    /// Any failure aborts start-up and leaves no session loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::AcquisitionError`], [`TrainerError::BackendError`],
    /// [`TrainerError::PoseLoadError`] or [`TrainerError::AssetError`] for the step that failed.
    pub async fn start<C, F, P, R>(
        &mut self,
        camera: &mut C,
        factory: &mut F,
        source: &P,
        rng: &mut R,
    ) -> Result<Ready<C::Stream, F::Estimator>>
    where
        C: CameraProvider,
        F: EstimatorFactory,
        P: PoseSource + ?Sized,
        R: Rng + ?Sized,
    {
        section!("Starting session");
        self.state = None;
        self.config.validate()?;

        let stream = camera.acquire_stream(&self.config.capture).await?;
        let capture = self.config.capture;
        info!(
            "Camera ready ({}, {}x{})",
            capture.facing, capture.ideal_width, capture.ideal_height
        );

        let (backend, estimator) = select_backend(&self.config.backends, factory).await?;
        info!("Inference backend: {backend}");

        self.load(source, rng).await?;

        Ok(Ready {
            stream,
            estimator,
            backend,
        })
    }

    /// Sample frames until the loaded session completes, is cancelled, or frames run out.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::ConfigError`] when no session is loaded, otherwise propagates
    /// loop failures.
    pub async fn run<S, E>(&mut self, stream: S, estimator: E) -> Result<LoopOutcome>
    where
        S: FrameSource,
        E: PoseEstimator,
    {
        let Some(state) = self.state.as_mut() else {
            return Err(TrainerError::ConfigError(
                "no session loaded; call load() or start() first".to_string(),
            ));
        };

        let mut sampling = SamplingLoop::new(stream, estimator, &self.config, self.cancel.clone());
        let outcome = sampling
            .run(state, &mut self.sink, &mut self.skip_rx)
            .await?;

        info!(
            "Session {outcome} at pose {}/{} after {} frame(s)",
            (state.current_index() + 1).min(state.len()),
            state.len(),
            sampling.iterations()
        );
        Ok(outcome)
    }
}
