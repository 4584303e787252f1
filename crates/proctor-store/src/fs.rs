//! Filesystem exam store and report sink.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use proctor_core::error::StoreError;
use proctor_core::model::{ExamDefinition, ExamReport, ReportAck};
use proctor_core::parser;
use proctor_core::traits::{ExamStore, ReportSink};

/// Serves exams from a directory of TOML files.
pub struct FsExamStore {
    dir: PathBuf,
}

impl FsExamStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExamStore for FsExamStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition> {
        let dir = self.dir.clone();
        let exams = tokio::task::spawn_blocking(move || parser::load_exam_directory(&dir))
            .await
            .context("exam loader task failed")?
            .map_err(|e| StoreError::Transport(format!("{e:#}")))?;

        exams
            .into_iter()
            .find(|exam| exam.id == exam_id)
            .ok_or_else(|| StoreError::NotFound(exam_id.to_string()).into())
    }
}

/// Writes each report as `<dir>/<exam_id>/<report_id>.json`.
///
/// Writing the same report twice overwrites one file, so retries are safe.
pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn report_path(&self, report: &ExamReport) -> PathBuf {
        self.dir
            .join(sanitize(&report.exam_id))
            .join(format!("{}.json", report.id))
    }
}

#[async_trait]
impl ReportSink for FsReportSink {
    fn name(&self) -> &str {
        "fs"
    }

    async fn submit_report(&self, report: &ExamReport) -> anyhow::Result<ReportAck> {
        let path = self.report_path(report);
        let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Transport(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(&path, json).await.map_err(|e| {
            StoreError::Transport(format!("failed to write {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "report written");
        Ok(ReportAck {
            report_id: report.id,
            receipt: Some(path.display().to_string()),
        })
    }
}

/// Keep exam ids from escaping the report directory.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proctor_core::model::{ScoreResult, SubmitTrigger, Verdict};
    use uuid::Uuid;

    const EXAM: &str = r#"
[exam]
id = "fs-exam"
name = "Fs Exam"
duration_secs = 30
passing_marks = 1

[[questions]]
name = "Pick A"
correct_option = "A"
options = { A = "a", B = "b" }
"#;

    fn report(exam_id: &str) -> ExamReport {
        ExamReport {
            id: Uuid::new_v4(),
            exam_id: exam_id.into(),
            user_id: "u-1".into(),
            result: ScoreResult {
                correct_answers: vec![],
                wrong_answers: vec![],
                verdict: Verdict::Fail,
            },
            trigger: SubmitTrigger::Manual,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fetches_exam_by_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exam.toml"), EXAM).unwrap();

        let store = FsExamStore::new(dir.path());
        let exam = store.fetch_exam("fs-exam").await.unwrap();
        assert_eq!(exam.name, "Fs Exam");
        assert_eq!(exam.questions.len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exam.toml"), EXAM).unwrap();

        let store = FsExamStore::new(dir.path());
        let err = store.fetch_exam("other").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_directory_is_transport_error() {
        let store = FsExamStore::new("/definitely/not/here");
        let err = store.fetch_exam("x").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn writes_report_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsReportSink::new(dir.path());
        let report = report("../escape");

        let first = sink.submit_report(&report).await.unwrap();
        let second = sink.submit_report(&report).await.unwrap();
        assert_eq!(first, second);

        let exam_dir = dir.path().join("___escape");
        let files: Vec<_> = std::fs::read_dir(&exam_dir).unwrap().collect();
        assert_eq!(files.len(), 1);

        let saved: ExamReport =
            serde_json::from_str(&std::fs::read_to_string(sink.report_path(&report)).unwrap())
                .unwrap();
        assert_eq!(saved, report);
    }
}
