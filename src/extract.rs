use anyhow::{Result, bail};

use crate::model::{BenchmarkItem, PredictionRecord};
use crate::preset::{BenchmarkPreset, Extraction};

/// Removed from choice answers in this order. Removal is substring based, so
/// the longer phrases must come before the phrases they contain.
pub const CHOICE_ANSWER_PREFIXES: [&str; 8] = [
    "The best answer is",
    "The correct answer is",
    "The answer is",
    "The answer",
    "The best option is",
    "The correct option is",
    "Best answer:",
    "Best option:",
];

pub const OPEN_TEXT_ANSWER_PREFIXES: [&str; 3] = ["The best answer is:", "The answer is:", "Answer:"];

const RAMBLE_WORD_LIMIT: usize = 10;

pub struct AnswerExtractor {
    letters: Vec<char>,
}

impl AnswerExtractor {
    pub fn new(letters: Vec<char>) -> Self {
        Self { letters }
    }

    pub fn for_preset(preset: &BenchmarkPreset) -> Self {
        Self::new(preset.letters())
    }

    pub fn extract(&self, prediction: &str, extraction: Extraction) -> String {
        match extraction {
            Extraction::Choice => self.extract_choice(prediction),
            Extraction::OpenText => extract_open_text(prediction),
        }
    }

    pub fn extract_choice(&self, prediction: &str) -> String {
        let mut text = prediction.trim().to_string();
        for prefix in CHOICE_ANSWER_PREFIXES {
            text = text.replace(prefix, "");
        }

        let has_letter = text.chars().any(|character| self.is_letter(character));
        if text.split_whitespace().count() > RAMBLE_WORD_LIMIT && !has_letter {
            return String::new();
        }

        text.chars()
            .find(|character| self.is_letter(*character))
            .map(String::from)
            .unwrap_or_default()
    }

    pub fn score(
        &self,
        preset: &BenchmarkPreset,
        item: &BenchmarkItem,
        predictions: &[String],
    ) -> Result<PredictionRecord> {
        let Some(prediction) = predictions.first() else {
            bail!("no predictions supplied for item {}", item.question_id);
        };
        let rule = preset.rule_for(item);
        let tags = preset.tags_for(item)?;

        Ok(PredictionRecord {
            question_id: item.question_id.clone(),
            tags,
            pred_answer: self.extract(prediction, rule.extraction),
            answer: item.answer.trim().to_string(),
            prediction: prediction.clone(),
            comparison: rule.comparison,
        })
    }

    fn is_letter(&self, character: char) -> bool {
        self.letters.contains(&character)
    }
}

pub fn extract_open_text(prediction: &str) -> String {
    let mut text = prediction.trim();
    if let Some(rest) = OPEN_TEXT_ANSWER_PREFIXES
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
    {
        text = rest;
    }

    let token = text.split_whitespace().next().unwrap_or("");
    let token = token.split(':').next().unwrap_or("");
    token.trim_matches('.').trim().to_string()
}
