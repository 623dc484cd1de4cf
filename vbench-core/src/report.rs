use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::LatencySummary;
use crate::runner::Phase;

/// Outcome of one backend run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// Why a backend run failed; the first failure along the state machine wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FailureCause {
    UnknownBackend,
    NoContainerDescriptor,
    ContainerStartFailed,
    LibNotFound,
    ClassNotFound,
    DependencyMissing,
    InitFailed,
    Timeout,
    /// Anything raised while inserting or searching, stringified
    Runtime(String),
}

impl FailureCause {
    /// Classify an error raised during `phase`
    pub fn classify(phase: Phase, err: &Error) -> Self {
        match err {
            Error::UnknownBackend(_) => FailureCause::UnknownBackend,
            Error::DriverUnavailable { .. } => FailureCause::LibNotFound,
            Error::UnknownDriver(_) => FailureCause::ClassNotFound,
            Error::DependencyMissing(_) => FailureCause::DependencyMissing,
            Error::Timeout { .. } => FailureCause::Timeout,
            _ => match phase {
                Phase::Started | Phase::Setup => FailureCause::InitFailed,
                _ => FailureCause::Runtime(err.to_string()),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FailureCause::UnknownBackend => "unknown_backend",
            FailureCause::NoContainerDescriptor => "no_container_descriptor",
            FailureCause::ContainerStartFailed => "container_start_failed",
            FailureCause::LibNotFound => "lib_not_found",
            FailureCause::ClassNotFound => "class_not_found",
            FailureCause::DependencyMissing => "dependency_missing",
            FailureCause::InitFailed => "init_failed",
            FailureCause::Timeout => "timeout",
            FailureCause::Runtime(message) => message,
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a serialized cause. Runtime messages are stored verbatim, so a
/// runtime message that is exactly one of the tokens above (an adapter error
/// whose text is `timeout`, say) reads back as that typed cause.
impl From<String> for FailureCause {
    fn from(s: String) -> Self {
        match s.as_str() {
            "unknown_backend" => FailureCause::UnknownBackend,
            "no_container_descriptor" => FailureCause::NoContainerDescriptor,
            "container_start_failed" => FailureCause::ContainerStartFailed,
            "lib_not_found" => FailureCause::LibNotFound,
            "class_not_found" => FailureCause::ClassNotFound,
            "dependency_missing" => FailureCause::DependencyMissing,
            "init_failed" => FailureCause::InitFailed,
            "timeout" => FailureCause::Timeout,
            _ => FailureCause::Runtime(s),
        }
    }
}

impl From<FailureCause> for String {
    fn from(cause: FailureCause) -> Self {
        match cause {
            FailureCause::Runtime(message) => message,
            other => other.as_str().to_string(),
        }
    }
}

/// Finalized result of benchmarking one backend.
///
/// Times are wall-clock seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_avg_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_p99_latency: Option<f64>,
}

impl BenchmarkRecord {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Mutable record for a backend run in progress
#[derive(Debug)]
pub struct RecordBuilder {
    record: BenchmarkRecord,
}

impl RecordBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: BenchmarkRecord {
                name: name.into(),
                status: Status::Failed,
                error: None,
                error_detail: None,
                started_at: Utc::now(),
                setup_time: None,
                insert_time: None,
                items_count: None,
                search_avg_latency: None,
                search_p99_latency: None,
            },
        }
    }

    pub fn setup_time(&mut self, elapsed: Duration) {
        self.record.setup_time = Some(elapsed.as_secs_f64());
    }

    pub fn insert_time(&mut self, elapsed: Duration, items: usize) {
        self.record.insert_time = Some(elapsed.as_secs_f64());
        self.record.items_count = Some(items);
    }

    pub fn search_latency(&mut self, summary: &LatencySummary) {
        self.record.search_avg_latency = Some(summary.mean);
        self.record.search_p99_latency = Some(summary.p99);
    }

    /// Record a failure; later failures never overwrite the first one
    pub fn fail(&mut self, cause: FailureCause, detail: impl Into<String>) {
        if self.record.error.is_some() {
            return;
        }
        self.record.status = Status::Failed;
        self.record.error = Some(cause);
        self.record.error_detail = Some(detail.into());
    }

    pub fn fail_with(&mut self, phase: Phase, err: &Error) {
        self.fail(FailureCause::classify(phase, err), err.to_string());
    }

    /// Mark the run successful unless a failure was already recorded
    pub fn succeed(&mut self) {
        if self.record.error.is_none() {
            self.record.status = Status::Success;
        }
    }

    pub fn finish(self) -> BenchmarkRecord {
        self.record
    }
}

/// Ordered collection of records, one per requested backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunReport {
    records: Vec<BenchmarkRecord>,
}

/// Success/failure tally over a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BenchmarkRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[BenchmarkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let succeeded = self.records.iter().filter(|r| r.is_success()).count();
        ReportSummary {
            total: self.records.len(),
            succeeded,
            failed: self.records.len() - succeeded,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as a pretty-printed JSON array
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl IntoIterator for RunReport {
    type Item = BenchmarkRecord;
    type IntoIter = std::vec::IntoIter<BenchmarkRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_strings_round_trip() {
        let causes = [
            FailureCause::UnknownBackend,
            FailureCause::NoContainerDescriptor,
            FailureCause::ContainerStartFailed,
            FailureCause::LibNotFound,
            FailureCause::ClassNotFound,
            FailureCause::DependencyMissing,
            FailureCause::InitFailed,
            FailureCause::Timeout,
            FailureCause::Runtime("Query execution failed: boom".into()),
        ];
        for cause in causes {
            let json = serde_json::to_string(&cause).unwrap();
            let back: FailureCause = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cause);
        }
        assert_eq!(
            serde_json::to_string(&FailureCause::Timeout).unwrap(),
            "\"timeout\""
        );
    }

    #[test]
    fn test_runtime_message_matching_token_reads_back_typed() {
        let cause = FailureCause::Runtime("timeout".into());
        let json = serde_json::to_string(&cause).unwrap();
        assert_eq!(json, "\"timeout\"");

        let back: FailureCause = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FailureCause::Timeout);

        let back: FailureCause = serde_json::from_str("\"timeout after 3 retries\"").unwrap();
        assert_eq!(back, FailureCause::Runtime("timeout after 3 retries".into()));
    }

    #[test]
    fn test_classify() {
        let io = Error::Io(std::io::Error::other("refused"));
        assert_eq!(
            FailureCause::classify(Phase::Setup, &io),
            FailureCause::InitFailed
        );
        assert_eq!(
            FailureCause::classify(Phase::Setup, &Error::DependencyMissing("vector".into())),
            FailureCause::DependencyMissing
        );
        assert_eq!(
            FailureCause::classify(Phase::Inserted, &io),
            FailureCause::Runtime("refused".into())
        );
        assert_eq!(
            FailureCause::classify(Phase::Started, &Error::UnknownDriver("mongo".into())),
            FailureCause::ClassNotFound
        );
        assert_eq!(
            FailureCause::classify(
                Phase::Started,
                &Error::DriverUnavailable {
                    backend: "qdrant".into(),
                    driver: "qdrant".into()
                }
            ),
            FailureCause::LibNotFound
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let mut builder = RecordBuilder::new("x");
        builder.fail(FailureCause::Timeout, "not ready");
        builder.fail(FailureCause::InitFailed, "later");
        builder.succeed();

        let record = builder.finish();
        assert_eq!(record.status, Status::Failed);
        assert_eq!(record.error, Some(FailureCause::Timeout));
        assert_eq!(record.error_detail.as_deref(), Some("not ready"));
    }

    #[test]
    fn test_success_record_omits_error() {
        let mut builder = RecordBuilder::new("x");
        builder.setup_time(Duration::from_millis(5));
        builder.insert_time(Duration::from_millis(20), 10);
        builder.succeed();
        let record = builder.finish();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["items_count"], 10);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_write_and_reparse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/metrics.json");

        let mut report = RunReport::new();
        let mut ok = RecordBuilder::new("a");
        ok.succeed();
        report.push(ok.finish());
        let mut failed = RecordBuilder::new("b");
        failed.fail(FailureCause::NoContainerDescriptor, "no compose file");
        report.push(failed.finish());
        report.write_to(&path).unwrap();

        let reparsed = RunReport::from_file(&path).unwrap();
        assert_eq!(reparsed, report);
        assert_eq!(
            reparsed.summary(),
            ReportSummary {
                total: 2,
                succeeded: 1,
                failed: 1
            }
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
    }
}
