//! HTTP JSON API exam store and report sink.
//!
//! Speaks the exam portal's REST API: every response is wrapped in a
//! `{ success, message, data }` envelope and bodies use camelCase fields.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use proctor_core::error::StoreError;
use proctor_core::model::{ExamDefinition, ExamReport, Question, ReportAck, Verdict};
use proctor_core::traits::{ExamStore, ReportSink};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const EXAM_PATH: &str = "/api/exams/get-exam-by-id";
const REPORT_PATH: &str = "/api/reports/add-report";

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExamRequest<'a> {
    exam_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExam {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    category: String,
    duration: u32,
    #[serde(default)]
    total_marks: u32,
    passing_marks: u32,
    #[serde(default)]
    questions: Vec<WireQuestion>,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    name: String,
    correct_option: String,
    #[serde(default)]
    options: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    correct_answers: Vec<WireQuestion>,
    wrong_answers: Vec<WireQuestion>,
    verdict: Verdict,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    report_id: String,
    exam: String,
    user: String,
    trigger: String,
    result: WireResult,
}

impl From<WireQuestion> for Question {
    fn from(q: WireQuestion) -> Self {
        Question {
            name: q.name,
            options: q.options,
            correct_option: q.correct_option,
        }
    }
}

impl From<&Question> for WireQuestion {
    fn from(q: &Question) -> Self {
        WireQuestion {
            name: q.name.clone(),
            correct_option: q.correct_option.clone(),
            options: q.options.clone(),
        }
    }
}

impl From<WireExam> for ExamDefinition {
    fn from(e: WireExam) -> Self {
        ExamDefinition {
            id: e.id,
            name: e.name,
            category: e.category,
            questions: e.questions.into_iter().map(Question::from).collect(),
            duration_secs: e.duration,
            total_marks: e.total_marks,
            passing_marks: e.passing_marks,
            reference: e.reference,
        }
    }
}

impl From<&ExamReport> for ReportRequest {
    fn from(report: &ExamReport) -> Self {
        ReportRequest {
            report_id: report.id.to_string(),
            exam: report.exam_id.clone(),
            user: report.user_id.clone(),
            trigger: report.trigger.to_string(),
            result: WireResult {
                correct_answers: report.result.correct_answers.iter().map(Into::into).collect(),
                wrong_answers: report.result.wrong_answers.iter().map(Into::into).collect(),
                verdict: report.result.verdict,
            },
        }
    }
}

/// Shared client plumbing for the portal API.
struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// POST `body` to `path`; returns the HTTP status and the parsed envelope.
    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(u16, Option<Envelope<T>>), StoreError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Transport(format!("request timed out after {DEFAULT_TIMEOUT_SECS}s"))
            } else {
                StoreError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if status >= 400 && status != 404 {
            return Err(StoreError::Transport(format!("HTTP {status}: {text}")));
        }
        Ok((status, serde_json::from_str(&text).ok()))
    }
}

/// Fetches exams from the portal API.
pub struct HttpExamStore {
    api: ApiClient,
}

impl HttpExamStore {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url, token)?,
        })
    }
}

#[async_trait]
impl ExamStore for HttpExamStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition> {
        let (status, envelope) = self
            .api
            .post::<_, WireExam>(EXAM_PATH, &ExamRequest { exam_id })
            .await?;

        if status == 404 {
            return Err(StoreError::NotFound(exam_id.to_string()).into());
        }
        let envelope = envelope.ok_or_else(|| {
            StoreError::Transport(format!("malformed response for exam {exam_id}"))
        })?;
        if !envelope.success {
            tracing::debug!("portal rejected exam lookup: {}", envelope.message);
            return Err(StoreError::NotFound(exam_id.to_string()).into());
        }
        let exam = envelope
            .data
            .ok_or_else(|| StoreError::NotFound(exam_id.to_string()))?;
        Ok(exam.into())
    }
}

/// Posts reports to the portal API.
pub struct HttpReportSink {
    api: ApiClient,
}

impl HttpReportSink {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url, token)?,
        })
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, report), fields(report_id = %report.id, exam_id = %report.exam_id))]
    async fn submit_report(&self, report: &ExamReport) -> anyhow::Result<ReportAck> {
        let (status, envelope) = self
            .api
            .post::<_, serde_json::Value>(REPORT_PATH, &ReportRequest::from(report))
            .await?;

        let envelope = envelope.ok_or_else(|| {
            StoreError::Transport(format!("HTTP {status}: malformed report response"))
        })?;
        if status == 404 || !envelope.success {
            return Err(StoreError::Transport(format!(
                "report rejected: {}",
                envelope.message
            ))
            .into());
        }

        Ok(ReportAck {
            report_id: report.id,
            receipt: Some(envelope.message).filter(|m| !m.is_empty()),
        })
    }
}
