//! File-level parsing of harness output: results summaries (one JSON
//! object per run) and sample logs (JSON Lines, one document per line).
//!
//! Both entry points degrade instead of failing: a file that cannot be
//! read or decoded contributes nothing, and in sample logs each bad line
//! is skipped on its own.

use crate::records::{split_task_name, MetricRecord, Sample};
use serde_json::{Map, Value};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Summary metrics preferred over whatever else a task reports, tried in
/// order. When none is present the first float-valued metric in file
/// order is used instead.
pub const METRIC_PRIORITY: [&str; 3] = ["acc,none", "exact_match,none", "bleu,none"];

/// Extract one record per task from a results file, tagged with `model`.
///
/// Unreadable or undecodable files are logged and yield no records.
pub fn parse_results_file(path: &Path, model: &str) -> Vec<MetricRecord> {
    match read_results(path, model) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("skipping results file {}: {e}", path.display());
            Vec::new()
        }
    }
}

fn read_results(path: &Path, model: &str) -> Result<Vec<MetricRecord>, ParseError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: Value = serde_json::from_str(&contents).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let results = match root.get("results").and_then(Value::as_object) {
        Some(map) => map,
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for (task, metrics) in results {
        let metrics = match metrics.as_object() {
            Some(m) => m,
            None => {
                tracing::debug!("task {task} in {} carries no metric mapping", path.display());
                continue;
            }
        };
        let (key, value) = match select_metric(metrics) {
            Some(chosen) => chosen,
            None => continue,
        };
        // "acc,none" reports as plain "acc"
        let metric = key.split(',').next().unwrap_or(key);
        let (benchmark, language) = split_task_name(task);
        records.push(MetricRecord {
            model: model.to_string(),
            benchmark: benchmark.to_string(),
            language: language.to_string(),
            task: task.clone(),
            metric: metric.to_string(),
            value,
        });
    }
    Ok(records)
}

/// Pick the metric to report for one task. Presence of a priority key
/// commits to it; a priority key with a non-numeric value drops the task.
fn select_metric(metrics: &Map<String, Value>) -> Option<(&str, f64)> {
    for key in METRIC_PRIORITY {
        if let Some(value) = metrics.get(key) {
            return value.as_f64().map(|v| (key, v));
        }
    }
    metrics
        .iter()
        .find(|(_, value)| value.is_f64())
        .and_then(|(key, value)| value.as_f64().map(|v| (key.as_str(), v)))
}

/// Parse one JSON Lines record into a redacted sample.
pub fn parse_sample_line(line: &str) -> Result<Sample, serde_json::Error> {
    let mut sample: Sample = serde_json::from_str(line)?;
    sample.redact();
    Ok(sample)
}

/// Extract samples from a sample log.
///
/// `.jsonl` files are decoded line by line; any other extension is read
/// as a single JSON document (array of objects, or one object).
pub fn parse_samples_file(path: &Path) -> Vec<Sample> {
    let result = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        read_samples_jsonl(path)
    } else {
        read_samples_json(path)
    };
    match result {
        Ok(samples) => samples,
        Err(e) => {
            tracing::warn!("skipping samples file {}: {e}", path.display());
            Vec::new()
        }
    }
}

fn read_samples_jsonl(path: &Path) -> Result<Vec<Sample>, ParseError> {
    let file = std::fs::File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_sample_line(&line) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                tracing::warn!("{} line {}: skipping malformed sample: {e}", path.display(), idx + 1);
            }
        }
    }
    Ok(samples)
}

fn read_samples_json(path: &Path) -> Result<Vec<Sample>, ParseError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: Value = serde_json::from_str(&contents).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match root {
        Value::Array(items) => {
            let mut samples = Vec::new();
            for (idx, item) in items.into_iter().enumerate() {
                if !item.is_object() {
                    tracing::warn!("{} element {idx}: not an object, skipping", path.display());
                    continue;
                }
                match serde_json::from_value::<Sample>(item) {
                    Ok(mut sample) => {
                        sample.redact();
                        samples.push(sample);
                    }
                    Err(e) => {
                        tracing::warn!("{} element {idx}: skipping malformed sample: {e}", path.display());
                    }
                }
            }
            Ok(samples)
        }
        root @ Value::Object(_) => {
            let mut sample: Sample =
                serde_json::from_value(root).map_err(|source| ParseError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            sample.redact();
            Ok(vec![sample])
        }
        _ => {
            tracing::warn!("{}: neither an object nor an array, no samples", path.display());
            Ok(Vec::new())
        }
    }
}

#[derive(Debug)]
pub enum ParseError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ParseError::Json { path, source } => {
                write!(f, "invalid JSON in {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source, .. } => Some(source),
            ParseError::Json { source, .. } => Some(source),
        }
    }
}
