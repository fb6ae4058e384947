use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::cli::BuiltinPreset;
use crate::model::{BenchmarkItem, Tag};
use crate::util::read_json;

const VIDEO_MME_DURATIONS: [&str; 3] = ["short", "medium", "long"];

const VIDEO_MME_CATEGORIES: [&str; 6] = [
    "Knowledge",
    "Film & Television",
    "Sports Competition",
    "Artistic Performance",
    "Life Record",
    "Multilingual",
];

const VIDEO_MME_SUB_CATEGORIES: [&str; 30] = [
    "Humanity & History",
    "Literature & Art",
    "Biology & Medicine",
    "Finance & Commerce",
    "Astronomy",
    "Geography",
    "Law",
    "Life Tip",
    "Technology",
    "Animation",
    "Movie & TV Show",
    "Documentary",
    "News Report",
    "Esports",
    "Basketball",
    "Football",
    "Athletics",
    "Other Sports",
    "Stage Play",
    "Magic Show",
    "Variety Show",
    "Acrobatics",
    "Handicraft",
    "Food",
    "Fashion",
    "Daily Life",
    "Travel",
    "Pet & Animal",
    "Exercise",
    "Multilingual",
];

const VIDEO_MME_TASK_TYPES: [&str; 12] = [
    "Temporal Perception",
    "Spatial Perception",
    "Attribute Perception",
    "Action Recognition",
    "Object Recognition",
    "OCR Problems",
    "Counting Problem",
    "Temporal Reasoning",
    "Spatial Reasoning",
    "Action Reasoning",
    "Object Reasoning",
    "Information Synopsis",
];

const VIDEO_RULER_LENGTHS: [&str; 8] = ["1", "30", "60", "120", "180", "300", "600", "1200"];
const VIDEO_RULER_TASKS: [&str; 2] = ["QA", "OCR"];

const SUBTITLE_HEADER: &str = "This video's subtitles are listed below: \n";
const NO_SUBTITLES: &str = "No subtitles available";
const DEFAULT_POST_PROMPT: &str = "The best answer is:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("preset {preset} declares no dimensions")]
    NoDimensions { preset: String },
    #[error("dimension {dimension} has an empty vocabulary")]
    EmptyVocabulary { dimension: String },
    #[error("dimension {dimension} lists value {value} more than once")]
    DuplicateValue { dimension: String, value: String },
    #[error("dimension name {dimension} is used more than once")]
    DuplicateDimension { dimension: String },
    #[error("preset {preset} declares no valid answer letters")]
    NoValidLetters { preset: String },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extraction {
    Choice,
    OpenText,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    CaseSensitive,
    CaseInsensitive,
}

impl Comparison {
    pub fn matches(self, predicted: &str, truth: &str) -> bool {
        let truth = truth.trim();
        if predicted.is_empty() || truth.is_empty() {
            return false;
        }
        match self {
            Self::CaseSensitive => predicted == truth,
            Self::CaseInsensitive => predicted.to_lowercase() == truth.to_lowercase(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskRule {
    pub extraction: Extraction,
    pub comparison: Comparison,
}

impl TaskRule {
    pub const CHOICE: Self = Self {
        extraction: Extraction::Choice,
        comparison: Comparison::CaseSensitive,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub field: String,
    pub values: Vec<String>,
}

impl Dimension {
    fn new(name: &str, field: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            values: values.iter().map(|value| value.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub preamble: String,
    pub subtitle_preamble: String,
    #[serde(default = "default_subtitle_header")]
    pub subtitle_header: String,
    #[serde(default = "default_no_subtitles")]
    pub no_subtitles: String,
    #[serde(default = "default_post_prompt")]
    pub post_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLayout {
    pub cache_name: String,
    #[serde(default = "default_video_dir")]
    pub video_dir: String,
    #[serde(default = "default_subtitle_dir")]
    pub subtitle_dir: String,
    #[serde(default = "default_video_extension")]
    pub video_extension: String,
    #[serde(default = "default_fallback_extensions")]
    pub fallback_extensions: Vec<String>,
    #[serde(default = "default_subtitle_extension")]
    pub subtitle_extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkPreset {
    pub name: String,
    pub valid_letters: String,
    pub dimensions: Vec<Dimension>,
    pub task_field: String,
    #[serde(default)]
    pub task_rules: BTreeMap<String, TaskRule>,
    pub default_rule: TaskRule,
    pub media: MediaLayout,
    pub prompt: PromptTemplate,
}

impl BenchmarkPreset {
    pub fn load(path: &Path) -> Result<Self> {
        let preset: Self = read_json(path)?;
        preset
            .validate()
            .with_context(|| format!("invalid preset file: {}", path.display()))?;
        Ok(preset)
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        if self.dimensions.is_empty() {
            return Err(PresetError::NoDimensions {
                preset: self.name.clone(),
            });
        }
        if self.letters().is_empty() {
            return Err(PresetError::NoValidLetters {
                preset: self.name.clone(),
            });
        }

        let mut names = HashSet::new();
        for dimension in &self.dimensions {
            if !names.insert(dimension.name.as_str()) {
                return Err(PresetError::DuplicateDimension {
                    dimension: dimension.name.clone(),
                });
            }
            if dimension.values.is_empty() {
                return Err(PresetError::EmptyVocabulary {
                    dimension: dimension.name.clone(),
                });
            }
            let mut seen = HashSet::new();
            for value in &dimension.values {
                if !seen.insert(value.as_str()) {
                    return Err(PresetError::DuplicateValue {
                        dimension: dimension.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn letters(&self) -> Vec<char> {
        self.valid_letters
            .chars()
            .filter(|character| !character.is_whitespace())
            .collect()
    }

    pub fn rule_for(&self, item: &BenchmarkItem) -> TaskRule {
        item.field(&self.task_field)
            .and_then(|task| self.task_rules.get(&task).copied())
            .unwrap_or(self.default_rule)
    }

    pub fn tags_for(&self, item: &BenchmarkItem) -> Result<Vec<Tag>, AggregateError> {
        self.dimensions
            .iter()
            .map(|dimension| {
                let value = item.field(&dimension.field).ok_or_else(|| {
                    AggregateError::MissingTag {
                        item_id: item.question_id.clone(),
                        field: dimension.field.clone(),
                    }
                })?;
                Ok(Tag {
                    dimension: dimension.name.clone(),
                    value,
                })
            })
            .collect()
    }
}

pub fn builtin(kind: BuiltinPreset) -> BenchmarkPreset {
    match kind {
        BuiltinPreset::VideoMme => video_mme(),
        BuiltinPreset::VideoRuler => video_ruler(),
    }
}

fn video_mme() -> BenchmarkPreset {
    BenchmarkPreset {
        name: BuiltinPreset::VideoMme.as_str().to_string(),
        valid_letters: "ABCD".to_string(),
        dimensions: vec![
            Dimension::new("duration", "duration", &VIDEO_MME_DURATIONS),
            Dimension::new("category", "domain", &VIDEO_MME_CATEGORIES),
            Dimension::new("sub_category", "sub_category", &VIDEO_MME_SUB_CATEGORIES),
            Dimension::new("task_category", "task_type", &VIDEO_MME_TASK_TYPES),
        ],
        task_field: "task_type".to_string(),
        task_rules: BTreeMap::new(),
        default_rule: TaskRule::CHOICE,
        media: MediaLayout {
            cache_name: "videomme".to_string(),
            ..media_defaults()
        },
        prompt: PromptTemplate {
            preamble: "Select the best answer to the following multiple-choice question based on the video. Respond with only the letter (A, B, C, or D) of the correct option.".to_string(),
            subtitle_preamble: "Select the best answer to the following multiple-choice question based on the video and the subtitles. Respond with only the letter (A, B, C, or D) of the correct option.".to_string(),
            ..prompt_defaults()
        },
    }
}

fn video_ruler() -> BenchmarkPreset {
    let preamble = "Select the best answer to the following multiple-choice question based on the video and the subtitles. Respond with only the letter (A, B, C, or D) of the correct option.";
    let mut task_rules = BTreeMap::new();
    task_rules.insert("QA".to_string(), TaskRule::CHOICE);
    task_rules.insert(
        "OCR".to_string(),
        TaskRule {
            extraction: Extraction::OpenText,
            comparison: Comparison::CaseInsensitive,
        },
    );

    BenchmarkPreset {
        name: BuiltinPreset::VideoRuler.as_str().to_string(),
        valid_letters: "ABCD".to_string(),
        dimensions: vec![
            Dimension::new("length", "length", &VIDEO_RULER_LENGTHS),
            Dimension::new("task", "task_type", &VIDEO_RULER_TASKS),
        ],
        task_field: "task_type".to_string(),
        task_rules,
        default_rule: TaskRule::CHOICE,
        media: MediaLayout {
            cache_name: "videoruler".to_string(),
            ..media_defaults()
        },
        prompt: PromptTemplate {
            preamble: preamble.to_string(),
            subtitle_preamble: preamble.to_string(),
            ..prompt_defaults()
        },
    }
}

fn media_defaults() -> MediaLayout {
    MediaLayout {
        cache_name: String::new(),
        video_dir: default_video_dir(),
        subtitle_dir: default_subtitle_dir(),
        video_extension: default_video_extension(),
        fallback_extensions: default_fallback_extensions(),
        subtitle_extension: default_subtitle_extension(),
    }
}

fn prompt_defaults() -> PromptTemplate {
    PromptTemplate {
        preamble: String::new(),
        subtitle_preamble: String::new(),
        subtitle_header: default_subtitle_header(),
        no_subtitles: default_no_subtitles(),
        post_prompt: default_post_prompt(),
    }
}

fn default_video_dir() -> String {
    "data".to_string()
}

fn default_subtitle_dir() -> String {
    "subtitle".to_string()
}

fn default_video_extension() -> String {
    "mp4".to_string()
}

fn default_fallback_extensions() -> Vec<String> {
    vec!["MP4".to_string(), "mkv".to_string()]
}

fn default_subtitle_extension() -> String {
    "srt".to_string()
}

fn default_subtitle_header() -> String {
    SUBTITLE_HEADER.to_string()
}

fn default_no_subtitles() -> String {
    NO_SUBTITLES.to_string()
}

fn default_post_prompt() -> String {
    DEFAULT_POST_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with(fields: serde_json::Value) -> BenchmarkItem {
        let mut raw = serde_json::json!({
            "question_id": "q-1",
            "question": "q",
            "options": [],
            "answer": "A",
            "videoID": "v"
        });
        if let (Some(target), Some(extra)) = (raw.as_object_mut(), fields.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(raw).expect("item should deserialize")
    }

    #[test]
    fn builtin_presets_validate() {
        assert_eq!(builtin(BuiltinPreset::VideoMme).validate(), Ok(()));
        assert_eq!(builtin(BuiltinPreset::VideoRuler).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicate_vocabulary_values() {
        let mut preset = builtin(BuiltinPreset::VideoRuler);
        preset.dimensions[1].values.push("QA".to_string());
        assert_eq!(
            preset.validate(),
            Err(PresetError::DuplicateValue {
                dimension: "task".to_string(),
                value: "QA".to_string(),
            })
        );
    }

    #[test]
    fn validate_rejects_empty_letter_set() {
        let mut preset = builtin(BuiltinPreset::VideoMme);
        preset.valid_letters = " ".to_string();
        assert!(matches!(
            preset.validate(),
            Err(PresetError::NoValidLetters { .. })
        ));
    }

    #[test]
    fn video_ruler_selects_rule_by_task_type() {
        let preset = builtin(BuiltinPreset::VideoRuler);
        let ocr = item_with(serde_json::json!({"task_type": "OCR", "length": 30}));
        let qa = item_with(serde_json::json!({"task_type": "QA", "length": 30}));
        let unknown = item_with(serde_json::json!({"task_type": "Other", "length": 30}));

        assert_eq!(preset.rule_for(&ocr).extraction, Extraction::OpenText);
        assert_eq!(preset.rule_for(&ocr).comparison, Comparison::CaseInsensitive);
        assert_eq!(preset.rule_for(&qa), TaskRule::CHOICE);
        assert_eq!(preset.rule_for(&unknown), TaskRule::CHOICE);
    }

    #[test]
    fn tags_follow_dimension_order_and_report_missing_fields() {
        let preset = builtin(BuiltinPreset::VideoRuler);
        let item = item_with(serde_json::json!({"task_type": "QA", "length": 60}));
        let tags = preset.tags_for(&item).expect("tags should resolve");
        assert_eq!(
            tags,
            vec![
                Tag {
                    dimension: "length".to_string(),
                    value: "60".to_string()
                },
                Tag {
                    dimension: "task".to_string(),
                    value: "QA".to_string()
                },
            ]
        );

        let incomplete = item_with(serde_json::json!({"task_type": "QA"}));
        let error = preset
            .tags_for(&incomplete)
            .expect_err("missing length should be reported");
        assert!(error.to_string().contains("length"), "unexpected error: {error}");
    }

    #[test]
    fn comparison_modes_differ_only_in_case() {
        assert!(Comparison::CaseSensitive.matches("C", " C "));
        assert!(!Comparison::CaseSensitive.matches("c", "C"));
        assert!(Comparison::CaseInsensitive.matches("hello", "HeLLo"));
        assert!(!Comparison::CaseInsensitive.matches("", ""));
    }

    #[test]
    fn load_reports_invalid_preset_files() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("preset.json");
        let mut preset = builtin(BuiltinPreset::VideoRuler);
        preset.dimensions[0].values.clear();
        crate::util::write_json_pretty(&path, &preset).expect("preset should be written");

        let error = BenchmarkPreset::load(&path).expect_err("empty vocabulary should fail");
        assert!(error.to_string().contains("invalid preset file"));
        assert!(format!("{error:#}").contains("empty vocabulary"));
    }

    #[test]
    fn preset_json_round_trip_applies_layout_defaults() {
        let raw = r#"
        {
          "name": "six-way",
          "valid_letters": "ABCDEF",
          "dimensions": [{"name": "task", "field": "task_type", "values": ["QA"]}],
          "task_field": "task_type",
          "default_rule": {"extraction": "choice", "comparison": "case_sensitive"},
          "media": {"cache_name": "sixway"},
          "prompt": {"preamble": "Pick.", "subtitle_preamble": "Pick with subtitles."}
        }
        "#;
        let preset: BenchmarkPreset = serde_json::from_str(raw).expect("preset should parse");
        assert_eq!(preset.letters(), vec!['A', 'B', 'C', 'D', 'E', 'F']);
        assert_eq!(preset.media.fallback_extensions, vec!["MP4", "mkv"]);
        assert_eq!(preset.prompt.post_prompt, "The best answer is:");
        assert_eq!(preset.validate(), Ok(()));
    }
}
