use anyhow::Result;
use tracing::info;

use crate::cli::{PromptArgs, SubtitleArg};
use crate::config::EvalConfig;
use crate::model::BenchmarkItem;
use crate::probe::{FfprobeProbe, FixedFrameProbe, VideoProbe};
use crate::prompt::{PromptAssembler, SubtitleMode};

pub fn run(args: PromptArgs) -> Result<()> {
    let config = EvalConfig::from_args(&args.benchmark)?;
    let item = config.find_item(config.load_items()?, &args.item_id)?;

    let prompt = match args.total_frames {
        Some(total_frames) => render(&config, &args, FixedFrameProbe(total_frames), &item)?,
        None => render(&config, &args, FfprobeProbe, &item)?,
    };

    info!(item_id = %item.question_id, chars = prompt.chars().count(), "rendered prompt");
    println!("{prompt}");
    Ok(())
}

fn render<P: VideoProbe>(
    config: &EvalConfig,
    args: &PromptArgs,
    probe: P,
    item: &BenchmarkItem,
) -> Result<String> {
    let resolver = config.resolver()?;
    let mode = match args.subtitles {
        SubtitleArg::Off => SubtitleMode::Off,
        SubtitleArg::Sampled => SubtitleMode::Sampled(args.frame_num),
        SubtitleArg::Full => SubtitleMode::Full,
    };

    let mut assembler =
        PromptAssembler::new(&config.preset.prompt, &resolver, probe, mode, args.fps)?;
    if let Some(post_prompt) = &args.post_prompt {
        assembler = assembler.with_post_prompt(post_prompt.clone());
    }
    assembler.render(item)
}
