use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::BenchmarkArgs;
use crate::media::MediaResolver;
use crate::model::BenchmarkItem;
use crate::preset::{self, BenchmarkPreset};
use crate::util::read_json;

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub cache_root: PathBuf,
    pub items_path: PathBuf,
    pub preset: BenchmarkPreset,
}

impl EvalConfig {
    pub fn from_args(args: &BenchmarkArgs) -> Result<Self> {
        let preset = match &args.preset_path {
            Some(path) => BenchmarkPreset::load(path)?,
            None => preset::builtin(args.preset),
        };

        info!(
            preset = %preset.name,
            cache_root = %args.cache_root.display(),
            items = %args.items_path.display(),
            "benchmark configuration"
        );

        Ok(Self {
            cache_root: args.cache_root.clone(),
            items_path: args.items_path.clone(),
            preset,
        })
    }

    pub fn resolver(&self) -> Result<MediaResolver> {
        MediaResolver::new(&self.cache_root, &self.preset.media)
    }

    pub fn load_items(&self) -> Result<Vec<BenchmarkItem>> {
        let items: Vec<BenchmarkItem> = read_json(&self.items_path)?;
        info!(count = items.len(), path = %self.items_path.display(), "loaded items");
        Ok(items)
    }

    pub fn find_item(&self, items: Vec<BenchmarkItem>, item_id: &str) -> Result<BenchmarkItem> {
        items
            .into_iter()
            .find(|item| item.question_id == item_id)
            .with_context(|| {
                format!(
                    "item {item_id} not found in {}",
                    self.items_path.display()
                )
            })
    }
}
