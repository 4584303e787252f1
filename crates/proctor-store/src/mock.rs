//! In-memory exam store and report sink for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use proctor_core::error::StoreError;
use proctor_core::model::{ExamDefinition, ExamReport, ReportAck};
use proctor_core::traits::{ExamStore, ReportSink};

/// A mock exam store serving a fixed set of exams.
pub struct MockExamStore {
    exams: HashMap<String, ExamDefinition>,
    /// Number of fetches made.
    fetch_count: AtomicU32,
    /// When set, every fetch fails with this transport error.
    outage: Option<String>,
}

impl MockExamStore {
    pub fn new(exams: impl IntoIterator<Item = ExamDefinition>) -> Self {
        Self {
            exams: exams.into_iter().map(|e| (e.id.clone(), e)).collect(),
            fetch_count: AtomicU32::new(0),
            outage: None,
        }
    }

    /// A store whose every fetch fails in transit.
    pub fn unreachable(message: &str) -> Self {
        Self {
            exams: HashMap::new(),
            fetch_count: AtomicU32::new(0),
            outage: Some(message.to_string()),
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExamStore for MockExamStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.outage {
            return Err(StoreError::Transport(message.clone()).into());
        }
        self.exams
            .get(exam_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(exam_id.to_string()).into())
    }
}

/// A mock report sink that records reports, keyed by report id.
///
/// Can be told to fail a number of upcoming submissions.
pub struct MockReportSink {
    reports: Mutex<Vec<ExamReport>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl MockReportSink {
    pub fn new() -> Self {
        Self::failing(0)
    }

    /// A sink whose first `failures` submissions fail in transit.
    pub fn failing(failures: u32) -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }

    /// Fail the next `failures` submissions.
    pub fn fail_next(&self, failures: u32) {
        self.failures_left.store(failures, Ordering::Relaxed);
    }

    /// Total submissions attempted, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Distinct reports stored.
    pub fn reports(&self) -> Vec<ExamReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockReportSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSink for MockReportSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_report(&self, report: &ExamReport) -> anyhow::Result<ReportAck> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let failing = self
            .failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Transport("mock sink unavailable".into()).into());
        }

        let mut reports = self
            .reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !reports.iter().any(|r| r.id == report.id) {
            reports.push(report.clone());
        }
        Ok(ReportAck {
            report_id: report.id,
            receipt: Some(format!("mock-{}", reports.len())),
        })
    }
}
