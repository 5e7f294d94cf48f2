//! Directory aggregation: walk a root of per-model subdirectories,
//! correlate results files with their sample logs by run timestamp, and
//! build the flat result set plus the sample index.
//!
//! Layout on disk:
//!
//! ```text
//! root/
//!   modelA/
//!     results_2024-01-01T00-00-00.json
//!     samples_mmlu_en_2024-01-01T00-00-00.jsonl
//!   modelB/
//!     ...
//! ```

use crate::parsers::{parse_results_file, parse_samples_file};
use crate::records::{MetricRecord, ResultSet, Sample, SampleIndex, TaskKey};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub(crate) const RESULTS_PATTERN: &str = "results_*.json";
pub(crate) const SAMPLES_PATTERN: &str = "samples_*.jsonl";

/// List the model directories under `root`, sorted. Every immediate
/// subdirectory counts as one model; plain files are ignored.
pub fn discover_models(root: &Path) -> Result<Vec<String>, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::InvalidRoot {
            path: root.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(root).map_err(|source| LoadError::Scan {
        path: root.to_path_buf(),
        source,
    })?;

    let mut models = Vec::new();
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            models.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    models.sort();
    Ok(models)
}

/// Aggregate the metric records of every model under `root`.
pub fn load_results(root: &Path) -> Result<ResultSet, LoadError> {
    let mut results = ResultSet::new();
    for model in discover_models(root)? {
        let (records, timestamps) = load_model_results(&root.join(&model), &model);
        tracing::info!(
            "model {model}: {} result records from {} runs",
            records.len(),
            timestamps.len()
        );
        results.extend(records);
    }
    Ok(results)
}

/// Aggregate metric records and sample logs for every model under `root`.
///
/// A sample file is indexed only when its run timestamp matches one of
/// the model's results files; leftovers from runs whose summary was
/// deleted are skipped.
pub fn load_all_data(root: &Path) -> Result<(ResultSet, SampleIndex), LoadError> {
    let mut results = ResultSet::new();
    let mut index = SampleIndex::new();

    for model in discover_models(root)? {
        let model_dir = root.join(&model);
        let (records, timestamps) = load_model_results(&model_dir, &model);

        let mut sample_files = 0usize;
        for path in find_files(&model_dir, SAMPLES_PATTERN) {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if !timestamps.contains(samples_timestamp(name)) {
                tracing::info!(
                    "skipping stale sample file {} (no matching results run)",
                    path.display()
                );
                continue;
            }
            let task = match task_from_file_name(name) {
                Some(task) => task.to_string(),
                None => {
                    tracing::warn!("cannot extract task name from {}, skipping", path.display());
                    continue;
                }
            };
            sample_files += 1;
            let samples = parse_samples_file(&path);
            index
                .entry(TaskKey {
                    model: model.clone(),
                    task,
                })
                .or_default()
                .extend(samples);
        }

        tracing::info!(
            "model {model}: {} result records from {} runs, {sample_files} sample files",
            records.len(),
            timestamps.len()
        );
        results.extend(records);
    }
    Ok((results, index))
}

/// Read the latest sample log for one (model, benchmark, language)
/// selection. Unlike the bulk loaders this refuses to come back empty.
pub fn load_samples_for(
    root: &Path,
    model: &str,
    benchmark: &str,
    language: &str,
) -> Result<Vec<Sample>, LoadError> {
    let model_dir = root.join(model);
    if !model_dir.is_dir() {
        return Err(LoadError::ModelNotFound {
            root: root.to_path_buf(),
            model: model.to_string(),
        });
    }

    let pattern = format!(
        "samples_{}_{}_*.jsonl",
        glob::Pattern::escape(benchmark),
        glob::Pattern::escape(language)
    );
    let files = find_files(&model_dir, &pattern);
    // ISO timestamps sort, so the lexicographically greatest file is the
    // latest run.
    let latest = match files.last() {
        Some(path) => path,
        None => {
            return Err(LoadError::NoSampleFiles {
                model: model.to_string(),
                benchmark: benchmark.to_string(),
                language: language.to_string(),
            })
        }
    };

    tracing::debug!("reading samples from {}", latest.display());
    let samples = parse_samples_file(latest);
    if samples.is_empty() {
        return Err(LoadError::NoSamples {
            path: latest.clone(),
        });
    }
    Ok(samples)
}

fn load_model_results(model_dir: &Path, model: &str) -> (Vec<MetricRecord>, BTreeSet<String>) {
    let mut records = Vec::new();
    let mut timestamps = BTreeSet::new();
    for path in find_files(model_dir, RESULTS_PATTERN) {
        // The run timestamp counts even when the file itself fails to
        // parse; its sample logs are still not stale.
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(ts) = results_timestamp(name) {
                timestamps.insert(ts.to_string());
            }
        }
        records.extend(parse_results_file(&path, model));
    }
    (records, timestamps)
}

/// Matching files inside `dir`, sorted. The directory itself is escaped
/// so model names with glob metacharacters stay literal.
pub(crate) fn find_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = format!("{}/{pattern}", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = match glob::glob(&full) {
        Ok(paths) => paths.flatten().collect(),
        Err(e) => {
            tracing::warn!("bad file pattern {full}: {e}");
            Vec::new()
        }
    };
    files.sort();
    files
}

/// Run timestamp of a results file: what sits between the `results_`
/// prefix and the first dot. Harness timestamps may carry fractional
/// seconds, so the cut is at the first dot rather than the extension.
fn results_timestamp(file_name: &str) -> Option<&str> {
    let token = file_name.strip_prefix("results_")?;
    Some(token.split('.').next().unwrap_or(token))
}

/// Run timestamp of a sample file: what follows the last underscore, cut
/// at the first dot.
fn samples_timestamp(file_name: &str) -> &str {
    let token = file_name.rsplit('_').next().unwrap_or(file_name);
    token.split('.').next().unwrap_or(token)
}

/// Task name embedded in a sample file name. Greedy, so tasks containing
/// underscores survive up to the timestamp.
fn task_from_file_name(file_name: &str) -> Option<&str> {
    static TASK_RE: OnceLock<Regex> = OnceLock::new();
    let re = TASK_RE
        .get_or_init(|| Regex::new(r"^samples_(.*)_\d{4}-\d{2}-\d{2}T").unwrap());
    re.captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[derive(Debug)]
pub enum LoadError {
    InvalidRoot {
        path: PathBuf,
    },
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
    ModelNotFound {
        root: PathBuf,
        model: String,
    },
    NoSampleFiles {
        model: String,
        benchmark: String,
        language: String,
    },
    NoSamples {
        path: PathBuf,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::InvalidRoot { path } => {
                write!(f, "provided root '{}' is not a valid directory", path.display())
            }
            LoadError::Scan { path, source } => {
                write!(f, "failed to scan '{}': {source}", path.display())
            }
            LoadError::ModelNotFound { root, model } => {
                write!(
                    f,
                    "model directory '{model}' not found in root '{}'",
                    root.display()
                )
            }
            LoadError::NoSampleFiles {
                model,
                benchmark,
                language,
            } => {
                write!(
                    f,
                    "no sample files found for model '{model}', benchmark '{benchmark}', language '{language}'"
                )
            }
            LoadError::NoSamples { path } => {
                write!(f, "no samples found in file: {}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Scan { source, .. } => Some(source),
            _ => None,
        }
    }
}
