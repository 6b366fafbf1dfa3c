// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DISTANCE_SCALE, DEFAULT_RESOLUTION,
    DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOTAL_POSES, Facing,
};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Run Options:
    --poses, -p <DIR>          Directory with pose{id}.json and pose{id}.png
    --source, -s <SOURCE>      Frames to replay (directory or glob like "frames/*.jpg")
    --detections, -d <FILE>    Recorded keypoints, one list of skeletons per frame
    --count <N>                Poses per session [default: 7]
    --threshold <F>            Similarity needed to advance [default: 0.85]
    --conf <F>                 Keypoint confidence cutoff [default: 0.4]
    --backend <LIST>           Backends to try in order [default: webgl,wasm,cpu]
    --skip-every <N>           Simulate a skip tap every N frames
    --save                     Save annotated frames to runs/session
    --show                     Display frames in a window (Space skips, Esc quits)
    --seed <S>                 Fix the pose order
    --quiet, -q                Only warnings, errors and the completion banner

Examples:
    pose-trainer run --poses poses/ --source frames/ --detections detections.json
    pose-trainer run -p poses/ -s "frames/*.jpg" -d detections.json --count 3 --seed 42
    pose-trainer run -p poses/ -s frames/ -d detections.json --backend wasm,cpu --save
    pose-trainer run -p poses/ -s frames/ -d detections.json --skip-every 30 --no-mirror"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pose-matching session
    Run(RunArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Directory holding pose{id}.json definitions and pose{id}.png assets
    #[arg(short, long)]
    pub poses: String,

    /// Frames to replay (directory or glob)
    #[arg(short, long)]
    pub source: String,

    /// Recorded detections JSON file
    #[arg(short, long)]
    pub detections: String,

    /// Number of poses in the session
    #[arg(long, default_value_t = DEFAULT_TOTAL_POSES)]
    pub count: usize,

    /// Similarity a pose must exceed to advance
    #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    pub threshold: f32,

    /// Keypoint confidence cutoff
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub conf: f32,

    /// Pixel distance that halves the similarity
    #[arg(long, default_value_t = DEFAULT_DISTANCE_SCALE)]
    pub scale: f32,

    /// Ideal capture width
    #[arg(long, default_value_t = DEFAULT_RESOLUTION.0)]
    pub width: u32,

    /// Ideal capture height
    #[arg(long, default_value_t = DEFAULT_RESOLUTION.1)]
    pub height: u32,

    /// Camera facing (user or environment)
    #[arg(long, default_value_t = Facing::Environment)]
    pub facing: Facing,

    /// Comma-separated backends to try in order (webgl, webgpu, wasm, cpu)
    #[arg(long)]
    pub backend: Option<String>,

    /// Comma-separated backends the recorded estimator should refuse
    #[arg(long)]
    pub disable_backend: Option<String>,

    /// Milliseconds between sampled frames
    #[arg(long, default_value_t = 33)]
    pub interval: u64,

    /// Simulate a manual skip every N frames
    #[arg(long)]
    pub skip_every: Option<usize>,

    /// Save annotated frames to runs/session
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Display frames in a window
    #[arg(long, default_value_t = false)]
    pub show: bool,

    /// Do not mirror the display
    #[arg(long, default_value_t = false)]
    pub no_mirror: bool,

    /// Seed for the pose order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Show verbose output
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub verbose: bool,

    /// Only print warnings, errors and the completion banner
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}
