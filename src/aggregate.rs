use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::PredictionRecord;
use crate::preset::Dimension;


pub const KEY_SEPARATOR: &str = "_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("item {item_id} has tag key {key} outside the configured vocabulary")]
    UnknownBucket { item_id: String, key: String },
    #[error("item {item_id} is missing tag field {field}")]
    MissingTag { item_id: String, field: String },
    #[error("cannot merge bucket tables built from different dimensions")]
    LayoutMismatch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub correct: u64,
    pub answered: u64,
}

impl BucketCounts {
    pub fn accuracy(&self) -> f64 {
        if self.answered > 0 {
            100.0 * self.correct as f64 / self.answered as f64
        } else {
            0.0
        }
    }

    fn add(&mut self, other: BucketCounts) {
        self.correct += other.correct;
        self.answered += other.answered;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionRollup {
    pub dimension: String,
    pub value: String,
    pub correct: u64,
    pub answered: u64,
    pub accuracy: f64,
}

impl DimensionRollup {
    fn new(dimension: &str, value: &str, counts: BucketCounts) -> Self {
        Self {
            dimension: dimension.to_string(),
            value: value.to_string(),
            correct: counts.correct,
            answered: counts.answered,
            accuracy: counts.accuracy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub question_id: String,
    pub reason: String,
}

/// Answered/correct counters for every combination of dimension values.
///
/// All keys exist from construction on; recording never adds a key.
#[derive(Debug, Clone)]
pub struct BucketTable {
    dimensions: Vec<Dimension>,
    keys: Vec<Vec<String>>,
    index: HashMap<Vec<String>, usize>,
    counts: Vec<BucketCounts>,
}

impl BucketTable {
    pub fn new(dimensions: &[Dimension]) -> Self {
        let keys = cross_product(dimensions);
        let index = keys
            .iter()
            .enumerate()
            .map(|(position, key)| (key.clone(), position))
            .collect::<HashMap<Vec<String>, usize>>();
        let counts = vec![BucketCounts::default(); keys.len()];

        Self {
            dimensions: dimensions.to_vec(),
            keys,
            index,
            counts,
        }
    }

    pub fn empty_like(&self) -> Self {
        Self {
            dimensions: self.dimensions.clone(),
            keys: self.keys.clone(),
            index: self.index.clone(),
            counts: vec![BucketCounts::default(); self.keys.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn record(&mut self, record: &PredictionRecord) -> Result<(), AggregateError> {
        let key = record.tag_values();
        let Some(&position) = self.index.get(&key) else {
            return Err(AggregateError::UnknownBucket {
                item_id: record.question_id.clone(),
                key: key.join(KEY_SEPARATOR),
            });
        };

        let counts = &mut self.counts[position];
        counts.answered += 1;
        if record.is_correct() {
            counts.correct += 1;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &BucketTable) -> Result<(), AggregateError> {
        if self.dimensions != other.dimensions {
            return Err(AggregateError::LayoutMismatch);
        }
        for (counts, partial) in self.counts.iter_mut().zip(&other.counts) {
            counts.add(*partial);
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, values: &[&str]) -> Option<BucketCounts> {
        let key = values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<String>>();
        self.index.get(&key).map(|&position| self.counts[position])
    }

    pub fn buckets(&self) -> impl Iterator<Item = (String, BucketCounts)> + '_ {
        self.keys
            .iter()
            .zip(&self.counts)
            .map(|(key, counts)| (key.join(KEY_SEPARATOR), *counts))
    }

    pub fn rollup(&self, dimension: &str, value: &str) -> Option<BucketCounts> {
        let slot = self
            .dimensions
            .iter()
            .position(|candidate| candidate.name == dimension)?;

        let mut total = BucketCounts::default();
        for (key, counts) in self.keys.iter().zip(&self.counts) {
            if key[slot] == value {
                total.add(*counts);
            }
        }
        Some(total)
    }

    pub fn overall(&self) -> BucketCounts {
        let mut total = BucketCounts::default();
        for counts in &self.counts {
            total.add(*counts);
        }
        total
    }

    pub fn summarize(&self) -> Summary {
        let mut rollups = BTreeMap::new();
        for dimension in &self.dimensions {
            let by_value = dimension
                .values
                .iter()
                .map(|value| {
                    let counts = self.rollup(&dimension.name, value).unwrap_or_default();
                    (
                        value.clone(),
                        DimensionRollup::new(&dimension.name, value, counts),
                    )
                })
                .collect::<BTreeMap<String, DimensionRollup>>();
            rollups.insert(dimension.name.clone(), by_value);
        }

        Summary {
            rollups,
            overall: DimensionRollup::new("overall", "all", self.overall()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rollups: BTreeMap<String, BTreeMap<String, DimensionRollup>>,
    pub overall: DimensionRollup,
}

impl Summary {
    pub fn log(&self) {
        for rollup in self.rollups.values().flat_map(BTreeMap::values) {
            info!(
                dimension = %rollup.dimension,
                value = %rollup.value,
                correct = rollup.correct,
                answered = rollup.answered,
                accuracy = %format!("{:.1}%", rollup.accuracy),
                "evaluation by dimension"
            );
        }
        info!(
            correct = self.overall.correct,
            answered = self.overall.answered,
            accuracy = %format!("{:.1}%", self.overall.accuracy),
            "overall performance"
        );
    }
}

// Runs on the current rayon pool; callers size it with `ThreadPool::install`.
pub fn aggregate_records(
    dimensions: &[Dimension],
    records: &[PredictionRecord],
) -> Result<(BucketTable, Vec<Rejection>), AggregateError> {
    let layout = BucketTable::new(dimensions);

    records
        .par_iter()
        .fold(
            || (layout.empty_like(), Vec::new()),
            |(mut partial, mut rejected), record| {
                if let Err(error) = partial.record(record) {
                    rejected.push(Rejection {
                        question_id: record.question_id.clone(),
                        reason: error.to_string(),
                    });
                }
                (partial, rejected)
            },
        )
        .map(Ok::<_, AggregateError>)
        .try_reduce(
            || (layout.empty_like(), Vec::new()),
            |(mut table, mut rejected), (partial, partial_rejected)| {
                table.merge(&partial)?;
                rejected.extend(partial_rejected);
                Ok((table, rejected))
            },
        )
}

fn cross_product(dimensions: &[Dimension]) -> Vec<Vec<String>> {
    let mut keys = vec![Vec::<String>::new()];
    for dimension in dimensions {
        keys = keys
            .into_iter()
            .flat_map(|prefix| {
                dimension.values.iter().map(move |value| {
                    let mut key = prefix.clone();
                    key.push(value.clone());
                    key
                })
            })
            .collect();
    }
    keys
}
