//! Batch validation
//!
//! Runs the document validator over a sequence of records and collects
//! per-record outcomes into a report. A record that fails to parse marks
//! itself invalid without aborting the rest of the batch. A shared
//! cancellation flag is honored between records, never mid-record.

use annofly_core::{
    paths, BatchReport, ErrorKind, RecordPosition, RecordResult, TemplateSchema, ValidationError,
    ValidationOutcome,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::document_validator::{json_type_name, DocumentValidator};

/// One raw record with its source position
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Where the record came from
    pub position: RecordPosition,

    /// Unparsed record text
    pub text: String,
}

impl RawRecord {
    pub fn new(position: RecordPosition, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

/// Validates record sequences against one schema
pub struct BatchValidator<'a> {
    schema: &'a TemplateSchema,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BatchValidator<'a> {
    pub fn new(schema: &'a TemplateSchema) -> Self {
        Self {
            schema,
            cancel: None,
        }
    }

    /// Stop between records once the flag turns true
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Validate line-delimited JSON, one document per non-blank line
    ///
    /// Positions are 1-based line numbers; blank lines are skipped
    /// without consuming a position.
    pub fn validate_jsonl(&self, input: &str) -> BatchReport {
        let records = input.lines().enumerate().filter_map(|(i, line)| {
            if line.trim().is_empty() {
                return None;
            }
            Some(RawRecord::new(RecordPosition::Line(i + 1), line))
        });
        self.validate_records(records)
    }

    /// Validate a JSON array of documents
    ///
    /// Input that is not a JSON array at all yields a report with a
    /// single invalid record at index 0.
    pub fn validate_array(&self, input: &str) -> BatchReport {
        match serde_json::from_str::<Value>(input) {
            Ok(Value::Array(items)) => self.validate_values(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, value)| (RecordPosition::Index(i), value)),
            ),
            Ok(other) => self.rejected_input(format!(
                "expected a JSON array of records, found {}",
                json_type_name(&other)
            )),
            Err(e) => self.rejected_input(format!("malformed JSON array input: {}", e)),
        }
    }

    /// Validate raw records in order
    pub fn validate_records<I>(&self, records: I) -> BatchReport
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut report = BatchReport::new(&self.schema.name);
        for record in records {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self.check_raw(&record);
            report.add_record(RecordResult {
                position: record.position,
                outcome,
            });
        }
        report
    }

    /// Validate already-parsed values in order
    pub fn validate_values<'v, I>(&self, values: I) -> BatchReport
    where
        I: IntoIterator<Item = (RecordPosition, &'v Value)>,
    {
        let validator = DocumentValidator::new(self.schema);
        let mut report = BatchReport::new(&self.schema.name);
        for (position, value) in values {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.add_record(RecordResult {
                position,
                outcome: validator.validate(value),
            });
        }
        report
    }

    /// Per-record results as a lazy sequence
    ///
    /// The sequence ends early when the cancel flag turns true; callers
    /// that need the cancelled marker check the flag themselves.
    pub fn stream<I>(&'a self, records: I) -> impl Iterator<Item = RecordResult> + 'a
    where
        I: IntoIterator<Item = RawRecord>,
        I::IntoIter: 'a,
    {
        let mut iter = records.into_iter();
        std::iter::from_fn(move || {
            if self.is_cancelled() {
                return None;
            }
            let record = iter.next()?;
            let outcome = self.check_raw(&record);
            Some(RecordResult {
                position: record.position,
                outcome,
            })
        })
    }

    fn check_raw(&self, record: &RawRecord) -> ValidationOutcome {
        match serde_json::from_str::<Value>(&record.text) {
            Ok(value) => DocumentValidator::new(self.schema).validate(&value),
            Err(e) => ValidationOutcome::invalid(vec![ValidationError::new(
                ErrorKind::TypeMismatch,
                paths::ROOT,
                format!("malformed record at {}: {}", record.position, e),
            )]),
        }
    }

    fn rejected_input(&self, message: String) -> BatchReport {
        let mut report = BatchReport::new(&self.schema.name);
        report.add_record(RecordResult {
            position: RecordPosition::Index(0),
            outcome: ValidationOutcome::invalid(vec![ValidationError::new(
                ErrorKind::TypeMismatch,
                paths::ROOT,
                message,
            )]),
        });
        report
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}
