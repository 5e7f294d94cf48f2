//! Core data model for evaluation output: one metric record per task and
//! run, plus the per-document samples the harness logs alongside them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Sample keys holding source-document payloads and hashes. Stripped from
/// every sample before it is exposed.
// The quoted variant appears verbatim in some harness runs.
pub const REDACTED_KEYS: [&str; 5] = ["doc", "doc_hash", "\"doc_hash", "prompt_hash", "target_hash"];

/// Split a task name into (benchmark, language) on the last underscore.
///
/// Tasks without an underscore have no language suffix and map to
/// `(task, "unknown")`.
pub fn split_task_name(task: &str) -> (&str, &str) {
    match task.rsplit_once('_') {
        Some((benchmark, language)) => (benchmark, language),
        None => (task, "unknown"),
    }
}

/// One selected metric from one task in one results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub model: String,
    pub benchmark: String,
    pub language: String,
    pub task: String,
    pub metric: String,
    pub value: f64,
}

/// Flat collection of metric records across models and runs. Duplicates
/// from repeated runs are all retained; aggregation happens downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<MetricRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = MetricRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricRecord> {
        self.records.iter()
    }

    /// Distinct model names, sorted.
    pub fn models(&self) -> Vec<String> {
        self.distinct(|r| &r.model)
    }

    /// Distinct benchmark names, sorted.
    pub fn benchmarks(&self) -> Vec<String> {
        self.distinct(|r| &r.benchmark)
    }

    /// Distinct languages, sorted.
    pub fn languages(&self) -> Vec<String> {
        self.distinct(|r| &r.language)
    }

    fn distinct(&self, field: impl Fn(&MetricRecord) -> &String) -> Vec<String> {
        let set: BTreeSet<&String> = self.records.iter().map(field).collect();
        set.into_iter().cloned().collect()
    }
}

/// Identifies the sample group for one task of one model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    pub model: String,
    pub task: String,
}

/// Samples grouped by (model, task), in file-then-line order within each
/// group.
pub type SampleIndex = BTreeMap<TaskKey, Vec<Sample>>;

/// One logged evaluation sample. The fields the harness always writes are
/// typed; everything else lands in `extra` in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resps: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_resps: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sample {
    /// Drop the redacted keys from the residual fields.
    pub fn redact(&mut self) {
        for key in REDACTED_KEYS {
            self.extra.remove(key);
        }
    }
}
