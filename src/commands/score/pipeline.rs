use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::warn;

use crate::aggregate::{AggregateError, BucketTable, Rejection, aggregate_records};
use crate::extract::AnswerExtractor;
use crate::model::{BenchmarkItem, PredictionRecord};
use crate::preset::BenchmarkPreset;

pub(super) struct ScoredBatch {
    pub records: Vec<PredictionRecord>,
    pub table: BucketTable,
    pub rejected: Vec<Rejection>,
    pub missing_predictions: Vec<String>,
}

impl ScoredBatch {
    pub fn unparseable_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.pred_answer.is_empty())
            .count()
    }
}

pub(super) fn score_items(
    preset: &BenchmarkPreset,
    items: &[BenchmarkItem],
    predictions: &HashMap<String, Vec<String>>,
    jobs: usize,
) -> Result<ScoredBatch> {
    let mut pairs = Vec::<(&BenchmarkItem, &[String])>::with_capacity(items.len());
    let mut missing_predictions = Vec::new();
    for item in items {
        match predictions.get(&item.question_id) {
            Some(predicted) => pairs.push((item, predicted.as_slice())),
            None => {
                warn!(item_id = %item.question_id, "no prediction for item");
                missing_predictions.push(item.question_id.clone());
            }
        }
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("failed to build scoring thread pool")?;

    let (mut records, mut rejected) = pool.install(|| extract_records(preset, &pairs))?;
    let (table, unplaced) = pool.install(|| aggregate_records(&preset.dimensions, &records))?;
    for rejection in &unplaced {
        warn!(
            item_id = %rejection.question_id,
            reason = %rejection.reason,
            "record rejected by aggregation"
        );
    }

    // Records and counters cover only what landed in the table.
    let unplaced_ids = unplaced
        .iter()
        .map(|rejection| rejection.question_id.as_str())
        .collect::<HashSet<&str>>();
    records.retain(|record| !unplaced_ids.contains(record.question_id.as_str()));
    rejected.extend(unplaced);

    Ok(ScoredBatch {
        records,
        table,
        rejected,
        missing_predictions,
    })
}

fn extract_records(
    preset: &BenchmarkPreset,
    pairs: &[(&BenchmarkItem, &[String])],
) -> Result<(Vec<PredictionRecord>, Vec<Rejection>)> {
    let extractor = AnswerExtractor::for_preset(preset);
    let outcomes = pairs
        .par_iter()
        .map(|(item, predictions)| extractor.score(preset, item, predictions))
        .collect::<Vec<Result<PredictionRecord>>>();

    let mut records = Vec::with_capacity(pairs.len());
    let mut rejected = Vec::new();
    for ((item, _), outcome) in pairs.iter().zip(outcomes) {
        match outcome {
            Ok(record) => records.push(record),
            Err(error) => {
                let Some(reason) = error.downcast_ref::<AggregateError>() else {
                    return Err(error);
                };
                warn!(item_id = %item.question_id, reason = %reason, "item rejected");
                rejected.push(Rejection {
                    question_id: item.question_id.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    Ok((records, rejected))
}
