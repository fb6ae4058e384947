use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::info;

use crate::aggregate::Summary;
use crate::cli::ScoreArgs;
use crate::config::EvalConfig;
use crate::model::ScoreReport;
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty};

mod pipeline;
#[cfg(test)]
mod tests;

use pipeline::{ScoredBatch, score_items};

const REPORT_VERSION: u32 = 1;

pub fn run(args: ScoreArgs) -> Result<()> {
    let config = EvalConfig::from_args(&args.benchmark)?;
    let items = config.load_items()?;
    let predictions: HashMap<String, Vec<String>> = read_json(&args.predictions_path)?;
    info!(
        count = predictions.len(),
        path = %args.predictions_path.display(),
        "loaded predictions"
    );

    if args.check_media {
        let resolver = config.resolver()?;
        for item in &items {
            resolver.resolve_video(item)?;
        }
        info!(items = items.len(), "all media assets present");
    }

    let batch = score_items(&config.preset, &items, &predictions, args.jobs)?;
    if args.strict && !batch.rejected.is_empty() {
        let first = &batch.rejected[0];
        bail!(
            "{} items rejected in strict mode, first {}: {}",
            batch.rejected.len(),
            first.question_id,
            first.reason
        );
    }

    let summary = batch.table.summarize();
    info!(buckets = batch.table.len(), "aggregated bucket table");
    summary.log();

    let report = build_report(&config, &args, items.len(), &batch, &summary)?;
    let report_path = report_path(&config, &args);
    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote score report");

    if let Some(records_path) = &args.records_path {
        write_json_pretty(records_path, &batch.records)?;
        info!(path = %records_path.display(), count = batch.records.len(), "wrote prediction records");
    }

    info!(
        scored = report.scored_count,
        rejected = batch.rejected.len(),
        missing = batch.missing_predictions.len(),
        unparseable = report.unparseable_count,
        "scoring completed"
    );
    println!("{:.1}", summary.overall.accuracy);
    Ok(())
}

fn report_path(config: &EvalConfig, args: &ScoreArgs) -> PathBuf {
    args.report_path.clone().unwrap_or_else(|| {
        config
            .cache_root
            .join("reports")
            .join(format!("{}_score.json", config.preset.name))
    })
}

fn build_report(
    config: &EvalConfig,
    args: &ScoreArgs,
    item_count: usize,
    batch: &ScoredBatch,
    summary: &Summary,
) -> Result<ScoreReport> {
    Ok(ScoreReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        preset: config.preset.name.clone(),
        items_path: config.items_path.display().to_string(),
        items_sha256: sha256_file(&config.items_path)?,
        predictions_path: args.predictions_path.display().to_string(),
        predictions_sha256: sha256_file(&args.predictions_path)?,
        item_count,
        scored_count: summary.overall.answered as usize,
        unparseable_count: batch.unparseable_count(),
        missing_predictions: batch.missing_predictions.clone(),
        rejected: batch.rejected.clone(),
        buckets: batch.table.buckets().collect::<BTreeMap<_, _>>(),
        rollups: summary.rollups.clone(),
        overall: summary.overall.clone(),
    })
}
