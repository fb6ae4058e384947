use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::prompt::{DEFAULT_SUBTITLE_FPS, FrameCount};

#[derive(Parser, Debug)]
#[command(
    name = "videobench",
    version,
    about = "Scoring tooling for video question-answering benchmarks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Resolve(ResolveArgs),
    Prompt(PromptArgs),
    Score(ScoreArgs),
    Presets(PresetsArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum BuiltinPreset {
    VideoMme,
    VideoRuler,
}

impl BuiltinPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VideoMme => "video-mme",
            Self::VideoRuler => "video-ruler",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SubtitleArg {
    Off,
    Sampled,
    Full,
}

#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    #[arg(long, default_value = ".cache/huggingface")]
    pub cache_root: PathBuf,

    #[arg(long, value_enum, default_value_t = BuiltinPreset::VideoMme)]
    pub preset: BuiltinPreset,

    /// JSON preset file; takes precedence over --preset.
    #[arg(long)]
    pub preset_path: Option<PathBuf>,

    #[arg(long)]
    pub items_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub benchmark: BenchmarkArgs,

    #[arg(long)]
    pub item_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[command(flatten)]
    pub benchmark: BenchmarkArgs,

    #[arg(long)]
    pub item_id: String,

    #[arg(long, value_enum, default_value_t = SubtitleArg::Off)]
    pub subtitles: SubtitleArg,

    /// Frames to sample for subtitle alignment, or `all`.
    #[arg(long, default_value_t = FrameCount::Fixed(32))]
    pub frame_num: FrameCount,

    #[arg(long, default_value_t = DEFAULT_SUBTITLE_FPS)]
    pub fps: f64,

    /// Skip ffprobe and use this frame count.
    #[arg(long)]
    pub total_frames: Option<u64>,

    #[arg(long)]
    pub post_prompt: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub benchmark: BenchmarkArgs,

    #[arg(long)]
    pub predictions_path: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub records_path: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    #[arg(long, default_value_t = false)]
    pub strict: bool,

    #[arg(long, default_value_t = false)]
    pub check_media: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PresetsArgs {
    #[arg(long, value_enum, default_value_t = BuiltinPreset::VideoMme)]
    pub preset: BuiltinPreset,

    #[arg(long)]
    pub output: Option<PathBuf>,
}
