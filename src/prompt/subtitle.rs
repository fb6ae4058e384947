use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use regex::Regex;

const CAPTION_PATTERN: &str = r#"<font color="white" size=".72c">(.*?)</font>"#;
const TIMECODE_PATTERN: &str = r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})";

/// A caption mapped onto the half-open frame range `[start_frame, end_frame)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleInterval {
    pub start_frame: u64,
    pub end_frame: u64,
    pub markup: String,
}

impl SubtitleInterval {
    pub fn contains(&self, frame: u64) -> bool {
        self.start_frame <= frame && frame < self.end_frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCount {
    All,
    Fixed(usize),
}

impl FromStr for FrameCount {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed == "-1" {
            return Ok(Self::All);
        }
        trimmed
            .parse::<usize>()
            .map(Self::Fixed)
            .map_err(|_| format!("expected a frame count or 'all', got {value:?}"))
    }
}

impl fmt::Display for FrameCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Fixed(count) => write!(f, "{count}"),
        }
    }
}

pub struct SubtitleAligner {
    caption_pattern: Regex,
    timecode_pattern: Regex,
    fps: f64,
}

impl SubtitleAligner {
    pub fn new(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            bail!("subtitle fps must be a positive number, got {fps}");
        }
        Ok(Self {
            caption_pattern: Regex::new(CAPTION_PATTERN)
                .context("failed to compile caption regex")?,
            timecode_pattern: Regex::new(TIMECODE_PATTERN)
                .context("failed to compile SRT timecode regex")?,
            fps,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn parse_intervals(&self, content: &str) -> Vec<SubtitleInterval> {
        let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
        let mut intervals = Vec::new();
        let mut block = Vec::<&str>::new();

        for line in normalized.lines().chain(std::iter::once("")) {
            if !line.trim().is_empty() {
                block.push(line);
                continue;
            }
            if let Some(interval) = self.parse_block(&block) {
                intervals.push(interval);
            }
            block.clear();
        }

        intervals
    }

    fn parse_block(&self, lines: &[&str]) -> Option<SubtitleInterval> {
        let (position, captures) = lines
            .iter()
            .enumerate()
            .find_map(|(index, line)| Some((index, self.timecode_pattern.captures(line)?)))?;

        let start = timecode_seconds(&captures, 1)?;
        let end = timecode_seconds(&captures, 5)?;

        Some(SubtitleInterval {
            start_frame: time_to_frame(start, self.fps),
            end_frame: time_to_frame(end, self.fps),
            markup: lines[position + 1..].join("\n"),
        })
    }

    pub fn caption_text<'a>(&self, markup: &'a str) -> Option<&'a str> {
        self.caption_pattern
            .captures(markup)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str())
    }

    pub fn aligned_text(
        &self,
        intervals: &[SubtitleInterval],
        total_frames: u64,
        frame_num: FrameCount,
    ) -> String {
        let count = match frame_num {
            FrameCount::All => usize::try_from(total_frames).unwrap_or(usize::MAX),
            FrameCount::Fixed(count) => count,
        };
        let frames = uniform_sample_frames(total_frames, count);

        intervals_at_frames(intervals, &frames)
            .into_iter()
            .filter_map(|index| self.caption_text(&intervals[index].markup))
            .collect::<Vec<&str>>()
            .join("\n")
    }

    pub fn full_text(&self, content: &str) -> String {
        content
            .lines()
            .filter_map(|line| self.caption_text(line))
            .collect::<Vec<&str>>()
            .join("\n")
    }
}

pub fn time_to_frame(seconds: f64, fps: f64) -> u64 {
    (seconds * fps).floor().max(0.0) as u64
}

/// `count` frame indices spread evenly over `[0, total_frames - 1]`,
/// truncated toward zero.
pub fn uniform_sample_frames(total_frames: u64, count: usize) -> Vec<u64> {
    if total_frames == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }

    let last = u128::from(total_frames - 1);
    let steps = (count - 1) as u128;
    (0..count as u128)
        .map(|index| (index * last / steps) as u64)
        .collect()
}

pub fn intervals_at_frames(intervals: &[SubtitleInterval], frames: &[u64]) -> Vec<usize> {
    let mut hits = BTreeSet::new();
    for &frame in frames {
        for (index, interval) in intervals.iter().enumerate() {
            if interval.contains(frame) {
                hits.insert(index);
            }
        }
    }
    hits.into_iter().collect()
}

fn timecode_seconds(captures: &regex::Captures<'_>, first_group: usize) -> Option<f64> {
    let hours = captures.get(first_group)?.as_str().parse::<f64>().ok()?;
    let minutes = captures.get(first_group + 1)?.as_str().parse::<f64>().ok()?;
    let seconds = captures.get(first_group + 2)?.as_str().parse::<f64>().ok()?;
    let fraction = captures.get(first_group + 3)?.as_str();
    let fractional = fraction.parse::<f64>().ok()? / 10_f64.powi(fraction.len() as i32);
    Some(hours * 3600.0 + minutes * 60.0 + seconds + fractional)
}
