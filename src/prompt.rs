use std::fs;

use anyhow::{Context, Result};
use tracing::debug;

use crate::media::MediaResolver;
use crate::model::BenchmarkItem;
use crate::preset::PromptTemplate;
use crate::probe::VideoProbe;

mod subtitle;

pub use subtitle::{FrameCount, SubtitleAligner, time_to_frame};

pub const DEFAULT_SUBTITLE_FPS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleMode {
    Off,
    Sampled(FrameCount),
    Full,
}

pub struct PromptAssembler<'a, P> {
    template: &'a PromptTemplate,
    resolver: &'a MediaResolver,
    probe: P,
    aligner: SubtitleAligner,
    mode: SubtitleMode,
    post_prompt: String,
}

impl<'a, P: VideoProbe> PromptAssembler<'a, P> {
    pub fn new(
        template: &'a PromptTemplate,
        resolver: &'a MediaResolver,
        probe: P,
        mode: SubtitleMode,
        fps: f64,
    ) -> Result<Self> {
        Ok(Self {
            template,
            resolver,
            probe,
            aligner: SubtitleAligner::new(fps)?,
            mode,
            post_prompt: template.post_prompt.clone(),
        })
    }

    pub fn with_post_prompt(mut self, post_prompt: impl Into<String>) -> Self {
        self.post_prompt = post_prompt.into();
        self
    }

    pub fn render(&self, item: &BenchmarkItem) -> Result<String> {
        let question = question_block(item);
        let subtitles = match self.mode {
            SubtitleMode::Off => {
                return Ok(format!(
                    "{}\n{}\n{}",
                    self.template.preamble, question, self.post_prompt
                ));
            }
            SubtitleMode::Full => self.subtitle_block(item, None)?,
            SubtitleMode::Sampled(frame_num) => self.subtitle_block(item, Some(frame_num))?,
        };
        Ok(format!(
            "{}{}\n{}\n{}\n{}",
            self.template.subtitle_header,
            subtitles,
            self.template.subtitle_preamble,
            question,
            self.post_prompt
        ))
    }

    // `sampled` is None for the full transcript.
    fn subtitle_block(&self, item: &BenchmarkItem, sampled: Option<FrameCount>) -> Result<String> {
        let Some(path) = self.resolver.subtitle_path(item) else {
            debug!(item_id = %item.question_id, "no subtitle file");
            return Ok(self.template.no_subtitles.clone());
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read subtitles: {}", path.display()))?;

        let Some(frame_num) = sampled else {
            return Ok(self.aligner.full_text(&content));
        };

        let video = self.resolver.resolve_video(item)?;
        let total_frames = self
            .probe
            .total_frames(&video, self.aligner.fps())
            .with_context(|| format!("failed to count frames: {}", video.display()))?;
        let intervals = self.aligner.parse_intervals(&content);
        debug!(
            item_id = %item.question_id,
            intervals = intervals.len(),
            total_frames,
            frame_num = %frame_num,
            "aligning subtitles to sampled frames"
        );
        Ok(self
            .aligner
            .aligned_text(&intervals, total_frames, frame_num))
    }
}

fn question_block(item: &BenchmarkItem) -> String {
    let mut lines = Vec::with_capacity(item.options.len() + 1);
    lines.push(item.question.as_str());
    lines.extend(item.options.iter().map(String::as_str));
    lines.join("\n")
}
