use std::fs;
use std::path::Path;

use super::*;
use crate::cli::{BenchmarkArgs, BuiltinPreset};
use crate::config::EvalConfig;
use crate::model::BenchmarkItem;
use crate::preset::builtin;
use crate::util::write_json_pretty;

fn ruler_item(id: &str, length: serde_json::Value, task: &str, answer: &str) -> serde_json::Value {
    serde_json::json!({
        "question_id": id,
        "question": "What happens?",
        "options": ["A. one", "B. two", "C. three", "D. four"],
        "answer": answer,
        "videoID": format!("video-{id}"),
        "length": length,
        "task_type": task
    })
}

fn items(values: Vec<serde_json::Value>) -> Vec<BenchmarkItem> {
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).expect("item should deserialize"))
        .collect()
}

fn predictions(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(id, text)| (id.to_string(), vec![text.to_string()]))
        .collect()
}

#[test]
fn identical_tags_with_one_correct_answer_score_fifty_percent() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let items = items(vec![
        ruler_item("1", serde_json::json!(60), "QA", "C"),
        ruler_item("2", serde_json::json!(60), "QA", "A"),
    ]);
    let predictions = predictions(&[
        ("1", "The best answer is: C because the ball drops."),
        ("2", "B"),
    ]);

    let batch = score_items(&preset, &items, &predictions, 1).expect("scoring should succeed");
    let summary = batch.table.summarize();
    assert_eq!(
        summary.rollups["length"]["60"].accuracy,
        50.0
    );
    assert_eq!(summary.overall.accuracy, 50.0);
    assert!(batch.rejected.is_empty());
}

#[test]
fn missing_predictions_are_reported_not_scored() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let items = items(vec![
        ruler_item("1", serde_json::json!(30), "QA", "A"),
        ruler_item("2", serde_json::json!(30), "QA", "A"),
    ]);
    let predictions = predictions(&[("1", "A")]);

    let batch = score_items(&preset, &items, &predictions, 2).expect("scoring should succeed");
    assert_eq!(batch.missing_predictions, vec!["2".to_string()]);
    assert_eq!(batch.table.overall().answered, 1);
}

#[test]
fn empty_prediction_lists_abort_scoring() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let items = items(vec![ruler_item("1", serde_json::json!(30), "QA", "A")]);
    let mut predictions = HashMap::new();
    predictions.insert("1".to_string(), Vec::new());

    assert!(score_items(&preset, &items, &predictions, 1).is_err());
}

#[test]
fn vocabulary_mismatches_and_missing_tags_are_rejected() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let mut values = vec![
        ruler_item("1", serde_json::json!(45), "QA", "A"),
        ruler_item("2", serde_json::json!(30), "QA", "A"),
        ruler_item("3", serde_json::json!(30), "QA", "A"),
    ];
    if let Some(object) = values[2].as_object_mut() {
        object.remove("length");
    }
    let items = items(values);
    let predictions = predictions(&[("1", "A"), ("2", "A"), ("3", "A")]);

    let batch = score_items(&preset, &items, &predictions, 3).expect("scoring should succeed");
    let mut rejected = batch
        .rejected
        .iter()
        .map(|rejection| rejection.question_id.as_str())
        .collect::<Vec<&str>>();
    rejected.sort();
    assert_eq!(rejected, vec!["1", "3"]);
    assert_eq!(batch.table.overall().answered, 1);
    assert_eq!(batch.table.overall().correct, 1);
}

#[test]
fn open_text_tasks_compare_case_insensitively() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let items = items(vec![
        ruler_item("1", serde_json::json!(120), "OCR", "Exit"),
        ruler_item("2", serde_json::json!(120), "QA", "D"),
    ]);
    let predictions = predictions(&[("1", "EXIT. The sign says exit."), ("2", "d")]);

    let batch = score_items(&preset, &items, &predictions, 1).expect("scoring should succeed");
    assert_eq!(
        batch.table.get(&["120", "OCR"]).map(|counts| counts.correct),
        Some(1)
    );
    assert_eq!(
        batch.table.get(&["120", "QA"]).map(|counts| counts.correct),
        Some(0)
    );
    assert_eq!(batch.unparseable_count(), 1);
}

#[test]
fn parallel_scoring_matches_sequential_scoring() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let lengths = [1, 30, 60, 120, 180, 300, 600, 1200];
    let mut values = Vec::new();
    let mut pairs = Vec::new();
    for index in 0..40 {
        let id = format!("q{index}");
        let answer = ["A", "B", "C", "D"][index % 4];
        values.push(ruler_item(&id, serde_json::json!(lengths[index % 8]), "QA", answer));
        pairs.push((id, ["A", "B"][index % 2].to_string()));
    }
    let items = items(values);
    let predictions = pairs
        .into_iter()
        .map(|(id, text)| (id, vec![text]))
        .collect::<HashMap<String, Vec<String>>>();

    let sequential = score_items(&preset, &items, &predictions, 1).expect("scoring should succeed");
    let parallel = score_items(&preset, &items, &predictions, 7).expect("scoring should succeed");
    assert_eq!(
        sequential.table.buckets().collect::<Vec<_>>(),
        parallel.table.buckets().collect::<Vec<_>>()
    );
    assert_eq!(parallel.table.overall().answered, 40);
}

fn write_fixture(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let items_path = dir.join("items.json");
    let predictions_path = dir.join("predictions.json");
    let values = vec![
        ruler_item("1", serde_json::json!(60), "QA", "C"),
        ruler_item("2", serde_json::json!(60), "QA", "A"),
        ruler_item("3", serde_json::json!(99), "QA", "A"),
    ];
    fs::write(
        &items_path,
        serde_json::to_vec(&values).expect("items should serialize"),
    )
    .expect("items should be written");
    fs::write(
        &predictions_path,
        serde_json::to_vec(&serde_json::json!({
            "1": ["The best answer is: C because..."],
            "2": ["B"],
            "3": ["A"]
        }))
        .expect("predictions should serialize"),
    )
    .expect("predictions should be written");
    (items_path, predictions_path)
}

fn score_args(dir: &Path, items_path: &Path, predictions_path: &Path, strict: bool) -> ScoreArgs {
    ScoreArgs {
        benchmark: BenchmarkArgs {
            cache_root: dir.to_path_buf(),
            preset: BuiltinPreset::VideoRuler,
            preset_path: None,
            items_path: items_path.to_path_buf(),
        },
        predictions_path: predictions_path.to_path_buf(),
        report_path: None,
        records_path: Some(dir.join("records.json")),
        jobs: 2,
        strict,
        check_media: false,
    }
}

#[test]
fn run_writes_report_with_rejections_and_rollups() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (items_path, predictions_path) = write_fixture(dir.path());

    run(score_args(dir.path(), &items_path, &predictions_path, false)).expect("score should run");

    let report: serde_json::Value = read_json(
        &dir.path().join("reports").join("video-ruler_score.json"),
    )
    .expect("report should be readable");
    assert_eq!(report["preset"], "video-ruler");
    assert_eq!(report["item_count"], 3);
    assert_eq!(report["scored_count"], 2);
    assert_eq!(report["overall"]["accuracy"], 50.0);
    assert_eq!(report["buckets"]["60_QA"]["answered"], 2);
    assert_eq!(report["buckets"]["1200_OCR"]["answered"], 0);
    assert_eq!(report["rejected"][0]["question_id"], "3");
    assert_eq!(
        report["items_sha256"],
        sha256_file(&items_path).expect("hash should compute")
    );

    let records: Vec<serde_json::Value> =
        read_json(&dir.path().join("records.json")).expect("records should be readable");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record["question_id"] != "3"));
}

#[test]
fn strict_mode_fails_on_rejected_items() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (items_path, predictions_path) = write_fixture(dir.path());

    let error = run(score_args(dir.path(), &items_path, &predictions_path, true))
        .expect_err("strict run should fail");
    assert!(error.to_string().contains("strict mode"), "unexpected error: {error}");
    assert!(!dir.path().join("reports").exists());
}

#[test]
fn check_media_aborts_on_missing_assets() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (items_path, predictions_path) = write_fixture(dir.path());
    let mut args = score_args(dir.path(), &items_path, &predictions_path, false);
    args.check_media = true;

    let error = run(args).expect_err("missing media should abort");
    assert!(error.to_string().contains("does not exist"), "unexpected error: {error}");
}

#[test]
fn records_rejected_by_aggregation_are_not_counted_or_written() {
    let preset = builtin(BuiltinPreset::VideoRuler);
    let items = items(vec![
        ruler_item("1", serde_json::json!(45), "QA", "A"),
        ruler_item("2", serde_json::json!(30), "QA", "A"),
    ]);
    let predictions = predictions(&[("1", "no idea at all"), ("2", "A")]);

    let batch = score_items(&preset, &items, &predictions, 2).expect("scoring should succeed");
    assert_eq!(batch.table.overall().answered, 1);
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].question_id, "1");
    assert_eq!(batch.unparseable_count(), 0);
    assert_eq!(
        batch
            .records
            .iter()
            .map(|record| record.question_id.as_str())
            .collect::<Vec<&str>>(),
        vec!["2"]
    );
}

#[test]
fn preset_file_takes_precedence_and_extends_the_letter_set() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut six_letters = builtin(BuiltinPreset::VideoRuler);
    six_letters.name = "ruler-six".to_string();
    six_letters.valid_letters = "ABCDEF".to_string();
    let preset_path = dir.path().join("ruler-six.json");
    write_json_pretty(&preset_path, &six_letters).expect("preset should be written");

    let config = EvalConfig::from_args(&BenchmarkArgs {
        cache_root: dir.path().to_path_buf(),
        preset: BuiltinPreset::VideoMme,
        preset_path: Some(preset_path),
        items_path: dir.path().join("items.json"),
    })
    .expect("config should load");
    assert_eq!(config.preset.name, "ruler-six");

    let items = items(vec![
        ruler_item("1", serde_json::json!(300), "QA", "E"),
        ruler_item("2", serde_json::json!(300), "QA", "F"),
    ]);
    let predictions = predictions(&[("1", "The best answer is E."), ("2", "E")]);

    let batch =
        score_items(&config.preset, &items, &predictions, 1).expect("scoring should succeed");
    assert_eq!(batch.records[0].pred_answer, "E");
    assert_eq!(
        batch.table.get(&["300", "QA"]),
        Some(crate::aggregate::BucketCounts {
            correct: 1,
            answered: 2
        })
    );
    assert_eq!(batch.unparseable_count(), 0);

    let builtin_only = score_items(
        &builtin(BuiltinPreset::VideoRuler),
        &items,
        &predictions,
        1,
    )
    .expect("scoring should succeed");
    assert_eq!(builtin_only.unparseable_count(), 2);
}
