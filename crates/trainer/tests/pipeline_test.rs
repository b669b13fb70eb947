//! End-to-end tests for the CTR pipeline
//!
//! Writes click logs to temporary files, runs the loader and the trainer, and
//! checks the cleaned output, the saved artifact and run-to-run determinism.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use ctr_boost::{log_loss, roc_auc, Model, Pool};
use ctr_trainer::{
    engineer_features, load_and_preprocess, run_pipeline, stratified_split, PipelineConfig,
    PipelineError, RecordingReporter, Value,
};
use tempfile::tempdir;

const HEADER: &str = "session_id,DateTime,user_id,product,campaign_id,webpage_id,product_category_1,product_category_2,user_group_id,gender,age_level,user_depth,city_development_index,var_1,is_click";

/// Synthetic click log in the raw input layout.
///
/// Product "A" on page "w1" clicks most of the time; everything else rarely.
fn synthetic_log(rows: usize) -> String {
    let products = ["A", "B", "C", "D"];
    let campaigns = ["359520", "105960", "82320"];
    let pages = ["w1", "w2", "w3"];
    let genders = ["Male", "Female"];

    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let product = products[i % 4];
        let page = pages[(i / 4) % 3];
        let click = (product == "A" && page == "w1" && i % 5 != 0) || i % 13 == 0;
        let gender = if i % 17 == 0 { "" } else { genders[(i / 3) % 2] };
        let day = 1 + (i % 7);
        let hour = (i * 5) % 24;
        writeln!(
            csv,
            "{},2017-07-0{} {:02}:{:02},{},{},{},{},{},,{},{},{},{},,{},{}",
            i,
            day,
            hour,
            i % 60,
            1000 + i % 50,
            product,
            campaigns[i % 3],
            page,
            i % 5,
            i % 12,
            gender,
            i % 6,
            1 + i % 3,
            i % 2,
            u8::from(click),
        )
        .unwrap();
    }
    csv
}

fn write_log(dir: &Path, rows: usize) -> Result<std::path::PathBuf> {
    let path = dir.join("train.csv");
    std::fs::write(&path, synthetic_log(rows))?;
    Ok(path)
}

fn quick_config(data: &Path, model: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(data, model);
    config.training.iterations = 60;
    config.training.learning_rate = 0.15;
    config.training.depth = 4;
    config.training.early_stopping_rounds = 15;
    config.training.log_period = 0;
    config
}

#[test]
fn test_unlabeled_rows_dropped_from_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ten.csv");

    let mut csv = String::from("DateTime,product,gender,is_click\n");
    for i in 0..10 {
        let label = match i {
            3 | 7 => "".to_string(),
            _ => (i % 2).to_string(),
        };
        writeln!(csv, "2017-07-0{} 1{}:00,P{},Male,{}", 1 + i % 7, i, i, label)?;
    }
    std::fs::write(&path, csv)?;

    let data = load_and_preprocess(&path, b',', &mut RecordingReporter::new())?;
    assert_eq!(data.features.n_rows(), 8);
    assert_eq!(data.labels.len(), 8);
    let products = &data.features.column("product").unwrap().values;
    assert!(!products.contains(&Value::from("P3")));
    assert!(!products.contains(&Value::from("P7")));
    Ok(())
}

#[test]
fn test_mode_fills_gap() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("mode.csv");
    std::fs::write(
        &path,
        "DateTime,gender,is_click\n\
         2017-07-01 10:00,A,1\n\
         2017-07-01 11:00,A,0\n\
         2017-07-01 12:00,,1\n\
         2017-07-01 13:00,B,0\n",
    )?;

    let data = load_and_preprocess(&path, b',', &mut RecordingReporter::new())?;
    assert_eq!(data.features.column("gender").unwrap().values[2], Value::from("A"));
    Ok(())
}

#[test]
fn test_cleaned_table_invariants() -> Result<()> {
    let dir = tempdir()?;
    let path = write_log(dir.path(), 200)?;
    let mut reporter = RecordingReporter::new();

    let data = load_and_preprocess(&path, b',', &mut reporter)?;
    let names = data.features.column_names();
    for dropped in [
        "product_category_2",
        "city_development_index",
        "DateTime",
        "session_id",
        "user_id",
        "is_click",
    ] {
        assert!(!names.contains(&dropped));
    }

    for value in &data.features.column("hour").unwrap().values {
        assert!((0..=23).contains(&value.as_int().unwrap()));
    }
    for value in &data.features.column("weekday").unwrap().values {
        assert!((0..=6).contains(&value.as_int().unwrap()));
    }

    let counts = reporter.recorded_null_counts().unwrap();
    assert_eq!(counts.len(), names.len());
    let gender = counts.iter().find(|c| c.column == "gender").unwrap();
    assert_eq!(gender.imputed, 12);
    Ok(())
}

#[test]
fn test_full_pipeline_is_reproducible() -> Result<()> {
    let dir = tempdir()?;
    let data = write_log(dir.path(), 600)?;

    let first_path = dir.path().join("run1").join("model.json");
    let second_path = dir.path().join("run2").join("model.json");

    let mut first_reporter = RecordingReporter::new();
    let first = run_pipeline(quick_config(&data, &first_path), &mut first_reporter)?;
    let second = run_pipeline(quick_config(&data, &second_path), &mut RecordingReporter::new())?;

    assert_eq!(first.roc_auc, second.roc_auc);
    assert_eq!(first.log_loss, second.log_loss);
    assert_eq!(first.model_digest, second.model_digest);
    assert_eq!(std::fs::read(&first_path)?, std::fs::read(&second_path)?);

    assert!(first.roc_auc > 0.6, "auc {}", first.roc_auc);
    assert_eq!(first.train_rows + first.validation_rows, 600);

    // the artifact reloads to the same model
    let model = Model::load_json(&first_path)?;
    assert_eq!(model.hash_hex()?, first.model_digest);
    assert_eq!(model.feature_names.len(), 18);

    let top = first_reporter.recorded_importance().unwrap();
    assert_eq!(top.len(), 10);
    assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    Ok(())
}

#[test]
fn test_saved_model_reproduces_reported_metrics() -> Result<()> {
    let dir = tempdir()?;
    let data_path = write_log(dir.path(), 400)?;
    let model_path = dir.path().join("model.json");
    let config = quick_config(&data_path, &model_path);
    let outcome = run_pipeline(config.clone(), &mut RecordingReporter::new())?;

    // rebuild the validation rows and score them with the reloaded artifact alone
    let data = load_and_preprocess(&data_path, b',', &mut RecordingReporter::new())?;
    let features = engineer_features(&data.features, &config.features)?;
    let split = stratified_split(
        &data.labels,
        config.training.validation_fraction,
        config.training.seed,
    )?;
    let pool = Pool::new(
        features.feature_names.clone(),
        features.columns.clone(),
        data.labels.clone(),
        features.categorical_features(),
    )?
    .subset(&split.validation)?;

    let model = Model::load_json(&model_path)?;
    let probabilities = model.predict_proba(&pool)?;
    let labels = pool.labels().unwrap();
    assert_eq!(probabilities.len(), outcome.validation_rows);
    assert!((roc_auc(labels, &probabilities) - outcome.roc_auc).abs() < 1e-12);
    assert!((log_loss(labels, &probabilities) - outcome.log_loss).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_rerun_overwrites_model() -> Result<()> {
    let dir = tempdir()?;
    let data = write_log(dir.path(), 300)?;
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, "stale")?;

    let outcome = run_pipeline(quick_config(&data, &model_path), &mut RecordingReporter::new())?;
    let reloaded = Model::load_json(&model_path)?;
    assert_eq!(reloaded.hash_hex()?, outcome.model_digest);
    Ok(())
}

#[test]
fn test_failures_leave_no_artifact() -> Result<()> {
    let dir = tempdir()?;
    let model_path = dir.path().join("out").join("model.json");

    // single class
    let single = dir.path().join("single.csv");
    std::fs::write(
        &single,
        "DateTime,product,campaign_id,webpage_id,gender,age_level,is_click\n\
         2017-07-01 10:00,A,1,w1,Male,1,0\n\
         2017-07-01 11:00,B,2,w2,Female,2,0\n\
         2017-07-01 12:00,A,1,w1,Male,3,0\n",
    )?;
    let err = run_pipeline(quick_config(&single, &model_path), &mut RecordingReporter::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::FitFailure(_)));

    // missing interaction source
    let no_gender = dir.path().join("no_gender.csv");
    std::fs::write(
        &no_gender,
        "DateTime,product,campaign_id,webpage_id,age_level,is_click\n\
         2017-07-01 10:00,A,1,w1,1,1\n\
         2017-07-01 11:00,B,2,w2,2,0\n",
    )?;
    let err = run_pipeline(quick_config(&no_gender, &model_path), &mut RecordingReporter::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(c) if c == "gender"));

    // malformed timestamp
    let bad_ts = dir.path().join("bad_ts.csv");
    std::fs::write(&bad_ts, "DateTime,product,is_click\nnot-a-date,A,1\n")?;
    let err = run_pipeline(quick_config(&bad_ts, &model_path), &mut RecordingReporter::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Parse(_)));

    // unreadable file
    let err = run_pipeline(
        quick_config(&dir.path().join("absent.csv"), &model_path),
        &mut RecordingReporter::new(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Parse(_)));

    assert!(!model_path.exists());
    assert!(!model_path.parent().unwrap().exists());
    Ok(())
}

#[test]
fn test_config_file_drives_run() -> Result<()> {
    let dir = tempdir()?;
    write_log(dir.path(), 300)?;
    let config_path = dir.path().join("ctr.toml");
    std::fs::write(
        &config_path,
        r#"
[data]
path = "train.csv"

[model]
path = "models/ctr.json"

[training]
iterations = 40
learning_rate = 0.2
depth = 3
early_stopping_rounds = 10
log_period = 0
top_features = 5
"#,
    )?;

    let config = PipelineConfig::load_from_file(&config_path)?;
    let mut reporter = RecordingReporter::new();
    let outcome = run_pipeline(config, &mut reporter)?;

    assert_eq!(outcome.model_path, dir.path().join("models").join("ctr.json"));
    assert!(outcome.model_path.exists());
    assert_eq!(reporter.recorded_importance().unwrap().len(), 5);
    assert!(outcome.tree_count <= 40);
    Ok(())
}
