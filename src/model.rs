use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::{BucketCounts, DimensionRollup, Rejection};
use crate::preset::Comparison;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItem {
    #[serde(deserialize_with = "string_or_number")]
    pub question_id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub answer: String,
    #[serde(rename = "videoID", alias = "video_id")]
    pub video_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BenchmarkItem {
    pub fn field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            Value::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub dimension: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub question_id: String,
    pub tags: Vec<Tag>,
    pub pred_answer: String,
    pub answer: String,
    pub prediction: String,
    pub comparison: Comparison,
}

impl PredictionRecord {
    pub fn tag_values(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.value.clone()).collect()
    }

    pub fn is_correct(&self) -> bool {
        self.comparison.matches(&self.pred_answer, &self.answer)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub report_version: u32,
    pub generated_at: String,
    pub preset: String,
    pub items_path: String,
    pub items_sha256: String,
    pub predictions_path: String,
    pub predictions_sha256: String,
    pub item_count: usize,
    pub scored_count: usize,
    pub unparseable_count: usize,
    pub missing_predictions: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub buckets: BTreeMap<String, BucketCounts>,
    pub rollups: BTreeMap<String, BTreeMap<String, DimensionRollup>>,
    pub overall: DimensionRollup,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
