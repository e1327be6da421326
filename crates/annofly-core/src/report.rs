//! Batch validation reports
//!
//! Reports are the durable output of a batch run: one entry per record
//! with its source position and outcome, plus summary counts. The shape
//! is versioned so downstream tooling can detect format changes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::diagnostic::ValidationOutcome;

/// Report format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReportVersion {
    /// The version this crate writes
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Where a record in a batch came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordPosition {
    /// 1-based line number in a JSONL input
    Line(usize),

    /// 0-based element index in a JSON array input
    Index(usize),

    /// Source file path in a directory input
    File(String),
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordPosition::Line(n) => write!(f, "line {}", n),
            RecordPosition::Index(i) => write!(f, "record {}", i),
            RecordPosition::File(path) => write!(f, "{}", path),
        }
    }
}

/// One record's outcome with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    /// Where the record came from
    pub position: RecordPosition,

    /// Validation outcome for the record
    pub outcome: ValidationOutcome,
}

/// Summary counts for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records processed
    pub total: usize,

    /// Records that validated cleanly
    pub valid: usize,

    /// Records with at least one error
    pub invalid: usize,
}

/// A complete batch validation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Report format version
    pub version: ReportVersion,

    /// When the report was generated (RFC 3339)
    pub timestamp: String,

    /// Name of the template the records were validated against
    pub template: String,

    /// Summary counts
    pub summary: BatchSummary,

    /// Per-record outcomes, in input order
    pub records: Vec<RecordResult>,

    /// Whether the run stopped early on a cancellation signal
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchReport {
    /// Create an empty report for the given template
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: Utc::now().to_rfc3339(),
            template: template.into(),
            summary: BatchSummary::default(),
            records: Vec::new(),
            cancelled: false,
        }
    }

    /// Build a report from collected record results
    pub fn from_results(template: impl Into<String>, results: Vec<RecordResult>) -> Self {
        let mut report = Self::new(template);
        for result in results {
            report.add_record(result);
        }
        report
    }

    /// Append a record result, keeping the summary in step
    pub fn add_record(&mut self, result: RecordResult) {
        self.summary.total += 1;
        if result.outcome.is_valid() {
            self.summary.valid += 1;
        } else {
            self.summary.invalid += 1;
        }
        self.records.push(result);
    }

    /// Whether any record failed validation
    pub fn has_invalid(&self) -> bool {
        self.summary.invalid > 0
    }

    /// The invalid record results, in input order
    pub fn invalid_records(&self) -> Vec<&RecordResult> {
        self.records
            .iter()
            .filter(|r| !r.outcome.is_valid())
            .collect()
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report to a file as JSON
    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }
}
