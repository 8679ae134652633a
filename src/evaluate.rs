//! Scoring strategies selecting which quantity of a record is aggregated.

use crate::model::{AuthorRecord, DayStats};
use serde::{Deserialize, Serialize};

/// Numeric quantities an evaluator can read, implemented by both whole
/// author records and single days.
pub trait Measured {
    fn lines_added(&self) -> u64;
    fn lines_deleted(&self) -> u64;
    fn lines_changed(&self) -> u64;
    fn files_changed(&self) -> u64;
    fn commits(&self) -> u64;
}

impl Measured for DayStats {
    fn lines_added(&self) -> u64 {
        self.lines_added
    }
    fn lines_deleted(&self) -> u64 {
        self.lines_deleted
    }
    fn lines_changed(&self) -> u64 {
        self.lines_changed
    }
    fn files_changed(&self) -> u64 {
        self.files_changed
    }
    fn commits(&self) -> u64 {
        self.commits
    }
}

impl Measured for AuthorRecord {
    fn lines_added(&self) -> u64 {
        AuthorRecord::lines_added(self)
    }
    fn lines_deleted(&self) -> u64 {
        AuthorRecord::lines_deleted(self)
    }
    fn lines_changed(&self) -> u64 {
        self.lines_changed
    }
    fn files_changed(&self) -> u64 {
        AuthorRecord::files_changed(self)
    }
    fn commits(&self) -> u64 {
        self.commits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[default]
    LinesChanged,
    LinesAdded,
    LinesDeleted,
    FilesChanged,
    Commits,
}

impl Metric {
    fn read<M: Measured>(self, m: &M) -> u64 {
        match self {
            Metric::LinesChanged => m.lines_changed(),
            Metric::LinesAdded => m.lines_added(),
            Metric::LinesDeleted => m.lines_deleted(),
            Metric::FilesChanged => m.files_changed(),
            Metric::Commits => m.commits(),
        }
    }
}

/// Per-metric factors of a weighted score; absent metrics weigh zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Weights {
    #[serde(default)]
    pub lines_changed: f64,
    #[serde(default)]
    pub lines_added: f64,
    #[serde(default)]
    pub lines_deleted: f64,
    #[serde(default)]
    pub files_changed: f64,
    #[serde(default)]
    pub commits: f64,
}

/// Configured as either a metric name (`evaluate: commits`) or a map of
/// weights (`evaluate: { linesAdded: 1, commits: 10 }`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evaluator {
    Metric(Metric),
    Weighted(Weights),
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::Metric(Metric::LinesChanged)
    }
}

impl Evaluator {
    pub fn evaluate<M: Measured>(&self, m: &M) -> f64 {
        match self {
            Evaluator::Metric(metric) => metric.read(m) as f64,
            Evaluator::Weighted(w) => {
                w.lines_changed * m.lines_changed() as f64
                    + w.lines_added * m.lines_added() as f64
                    + w.lines_deleted * m.lines_deleted() as f64
                    + w.files_changed * m.files_changed() as f64
                    + w.commits * m.commits() as f64
            }
        }
    }
}
