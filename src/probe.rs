use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::prompt::time_to_frame;

pub trait VideoProbe {
    fn total_frames(&self, video: &Path, fps: f64) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProbe;

#[derive(Debug, Clone, Copy)]
pub struct FixedFrameProbe(pub u64);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: String,
}

impl VideoProbe for FfprobeProbe {
    fn total_frames(&self, video: &Path, fps: f64) -> Result<u64> {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("json")
            .arg(video)
            .output()
            .with_context(|| format!("failed to execute ffprobe for {}", video.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "ffprobe returned non-zero exit status for {}: {}",
                video.display(),
                stderr.trim()
            );
        }

        let duration = parse_duration(&output.stdout)
            .with_context(|| format!("failed to read ffprobe duration for {}", video.display()))?;
        Ok(frames_for_duration(duration, fps))
    }
}

impl VideoProbe for FixedFrameProbe {
    fn total_frames(&self, _video: &Path, _fps: f64) -> Result<u64> {
        Ok(self.0)
    }
}

fn parse_duration(stdout: &[u8]) -> Result<f64> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(stdout).context("ffprobe output is not valid json")?;
    let duration = parsed
        .format
        .duration
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid duration: {}", parsed.format.duration))?;
    if !duration.is_finite() || duration < 0.0 {
        bail!("invalid duration: {duration}");
    }
    Ok(duration)
}

fn frames_for_duration(duration_seconds: f64, fps: f64) -> u64 {
    time_to_frame(duration_seconds, fps)
}
