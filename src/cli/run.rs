// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

#[cfg(feature = "annotate")]
use crate::annotate::{AnnotatedFrameSink, find_next_run_dir};
use crate::backend::parse_backend_list;
use crate::camera::{Frame, FrameSource, ReplayCamera};
use crate::cli::args::RunArgs;
use crate::cli::logging;
use crate::config::SessionConfig;
use crate::display::{DisplaySink, LogSink};
use crate::error::{Result, TrainerError};
use crate::estimator::RecordedEstimatorFactory;
use crate::pose_set::DirectoryPoseSource;
use crate::sampling::{CancelHandle, LoopOutcome, SkipHandle};
use crate::session::Trainer;
#[cfg(feature = "visualize")]
use crate::visualizer::Viewer;
use crate::{VERSION, error, info, verbose, warn};

type Sinks = Vec<Box<dyn DisplaySink>>;

/// Run a pose-matching session from the command line.
///
/// Exits the process with status 1 when the session fails to start or stops on an error.
pub fn run_session(args: &RunArgs) {
    logging::set_verbosity(logging::verbosity_from_flags(args.verbose, args.quiet));
    info!("Pose Trainer {VERSION}");

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    match runtime.block_on(drive(args, config)) {
        Ok(LoopOutcome::Completed) => {}
        Ok(outcome) => warn!("Session {outcome}"),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

/// Build the session configuration from CLI arguments.
///
/// # Errors
///
/// Returns [`TrainerError::ConfigError`] for an unknown backend or out-of-range value.
pub fn build_config(args: &RunArgs) -> Result<SessionConfig> {
    let mut config = SessionConfig::new()
        .with_total_poses(args.count)
        .with_similarity_threshold(args.threshold)
        .with_confidence(args.conf)
        .with_distance_scale(args.scale)
        .with_resolution(args.width, args.height)
        .with_facing(args.facing)
        .with_frame_interval(Duration::from_millis(args.interval))
        .with_mirror(!args.no_mirror);

    if let Some(list) = &args.backend {
        config = config.with_backends(parse_backend_list(list)?);
    }

    config.validate()?;
    Ok(config)
}

async fn drive(args: &RunArgs, config: SessionConfig) -> Result<LoopOutcome> {
    let mut trainer = Trainer::with_sink(config, |skip, cancel| make_sinks(args, skip, cancel))?;

    let mut camera = ReplayCamera::new(&args.source).with_facing(args.facing);
    let mut factory = RecordedEstimatorFactory::new(&args.detections);
    if let Some(list) = &args.disable_backend {
        factory = factory.with_unavailable(parse_backend_list(list)?);
    }
    let source = DirectoryPoseSource::new(&args.poses);
    let mut rng = args
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let ready = trainer
        .start(&mut camera, &mut factory, &source, &mut rng)
        .await?;
    verbose!("Session ready on '{}'", ready.backend);

    match args.skip_every {
        Some(every) => {
            let taps = TapSimulator::new(ready.stream, every, trainer.skip_handle())?;
            trainer.run(taps, ready.estimator).await
        }
        None => trainer.run(ready.stream, ready.estimator).await,
    }
}

#[allow(unused_variables, unused_mut)]
fn make_sinks(args: &RunArgs, skip: SkipHandle, cancel: CancelHandle) -> Result<Sinks> {
    let mut sinks: Sinks = vec![Box::new(LogSink::new())];

    if args.save {
        #[cfg(feature = "annotate")]
        {
            let dir = find_next_run_dir("runs", "session");
            info!("Saving annotated frames to {}", dir.display());
            sinks.push(Box::new(AnnotatedFrameSink::new(dir, !args.no_mirror)));
        }
        #[cfg(not(feature = "annotate"))]
        warn!("--save requires the 'annotate' feature; frames will not be saved");
    }

    if args.show {
        #[cfg(feature = "visualize")]
        sinks.push(Box::new(Viewer::new(
            "Pose Trainer",
            args.width as usize,
            args.height as usize,
            !args.no_mirror,
            skip,
            cancel,
        )?));
        #[cfg(not(feature = "visualize"))]
        warn!("--show requires the 'visualize' feature; running without a window");
    }

    Ok(sinks)
}

/// Frame source that requests a skip after every `every` frames, standing in for a user
/// tapping the skip button.
struct TapSimulator<S> {
    inner: S,
    every: usize,
    frames: usize,
    skip: SkipHandle,
}

impl<S: FrameSource> TapSimulator<S> {
    fn new(inner: S, every: usize, skip: SkipHandle) -> Result<Self> {
        if every == 0 {
            return Err(TrainerError::ConfigError(
                "--skip-every must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            inner,
            every,
            frames: 0,
            skip,
        })
    }
}

impl<S: FrameSource> FrameSource for TapSimulator<S> {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.inner.next_frame().await?;
        if frame.is_some() {
            self.frames += 1;
            if self.frames % self.every == 0 {
                verbose!("Simulated skip after {} frame(s)", self.frames);
                self.skip.skip();
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;
    use image::DynamicImage;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["app", "run", "-p", "poses", "-s", "frames", "-d", "det.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
        }
    }

    #[test]
    fn test_build_config() {
        let args = run_args(&["--count", "3", "--backend", "wasm,cpu", "--no-mirror"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.total_poses, 3);
        assert_eq!(config.backends, vec![Backend::Wasm, Backend::Cpu]);
        assert!(!config.mirror);
        assert_eq!(config.frame_interval, Duration::from_millis(33));
    }

    #[test]
    fn test_build_config_rejects() {
        assert!(build_config(&run_args(&["--backend", "quantum"])).is_err());
        assert!(build_config(&run_args(&["--threshold", "2.0"])).is_err());
    }

    struct Blank(usize);

    impl FrameSource for Blank {
        async fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(Frame::new(self.0, DynamicImage::new_rgb8(1, 1))))
        }
    }

    #[tokio::test]
    async fn test_tap_simulator() {
        let (skip, mut rx) = SkipHandle::channel();
        let mut taps = TapSimulator::new(Blank(5), 2, skip).unwrap();
        while taps.next_frame().await.unwrap().is_some() {}

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 2);
        assert!(TapSimulator::new(Blank(1), 0, SkipHandle::channel().0).is_err());
    }
}
