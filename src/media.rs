use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::model::BenchmarkItem;
use crate::preset::MediaLayout;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("video for item {item_id} does not exist, attempted: {}", display_paths(.attempted))]
    NotFound {
        item_id: String,
        attempted: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub videos: Vec<PathBuf>,
    pub subtitle: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MediaResolver {
    video_dir: PathBuf,
    subtitle_dir: PathBuf,
    video_extension: String,
    fallback_extensions: Vec<String>,
    subtitle_extension: String,
}

impl MediaResolver {
    pub fn new(cache_root: &Path, layout: &MediaLayout) -> Result<Self> {
        let cache_root = if cache_root.is_absolute() {
            cache_root.to_path_buf()
        } else {
            std::path::absolute(cache_root).with_context(|| {
                format!("failed to make cache root absolute: {}", cache_root.display())
            })?
        };
        let base = cache_root.join(&layout.cache_name);

        Ok(Self {
            video_dir: base.join(&layout.video_dir),
            subtitle_dir: base.join(&layout.subtitle_dir),
            video_extension: layout.video_extension.clone(),
            fallback_extensions: layout.fallback_extensions.clone(),
            subtitle_extension: layout.subtitle_extension.clone(),
        })
    }

    pub fn candidates(&self, item: &BenchmarkItem) -> Vec<PathBuf> {
        let expected = if self.has_known_extension(&item.video_id) {
            self.video_dir.join(&item.video_id)
        } else {
            self.video_dir
                .join(format!("{}.{}", item.video_id, self.video_extension))
        };

        let mut candidates = Vec::with_capacity(self.fallback_extensions.len() + 1);
        candidates.push(expected.clone());
        for extension in &self.fallback_extensions {
            let candidate = expected.with_extension(extension);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    pub fn resolve_video(&self, item: &BenchmarkItem) -> Result<PathBuf, MediaError> {
        let candidates = self.candidates(item);
        if let Some(found) = candidates.iter().find(|candidate| candidate.is_file()) {
            return Ok(found.clone());
        }

        Err(MediaError::NotFound {
            item_id: item.question_id.clone(),
            attempted: candidates,
        })
    }

    pub fn subtitle_path(&self, item: &BenchmarkItem) -> Option<PathBuf> {
        let stem = if self.has_known_extension(&item.video_id) {
            Path::new(&item.video_id).with_extension("")
        } else {
            PathBuf::from(&item.video_id)
        };
        let path = self
            .subtitle_dir
            .join(format!("{}.{}", stem.display(), self.subtitle_extension));
        path.is_file().then_some(path)
    }

    pub fn resolve(&self, item: &BenchmarkItem) -> Result<ResolvedMedia, MediaError> {
        let video = self.resolve_video(item)?;
        Ok(ResolvedMedia {
            videos: vec![video],
            subtitle: self.subtitle_path(item),
        })
    }

    fn has_known_extension(&self, video_ref: &str) -> bool {
        Path::new(video_ref)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ext == self.video_extension
                    || self
                        .fallback_extensions
                        .iter()
                        .any(|fallback| fallback == ext)
            })
            .unwrap_or(false)
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
