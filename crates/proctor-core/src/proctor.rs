//! Async orchestration around the session state machine.
//!
//! The [`Proctor`] owns the exam store and report sink. It opens sessions
//! (fetch + validate) and delivers scored reports with retries. Delivery
//! takes the session by `&mut`, so at most one fetch or submit can be in
//! flight for a given session.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{SessionError, StoreError};
use crate::model::ReportAck;
use crate::session::ExamSession;
use crate::traits::{ExamStore, ReportSink};

/// Retry behaviour for report delivery.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time, capped at 60s.
    pub retry_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

pub struct Proctor {
    store: Arc<dyn ExamStore>,
    sink: Arc<dyn ReportSink>,
    policy: DeliveryPolicy,
}

impl Proctor {
    pub fn new(
        store: Arc<dyn ExamStore>,
        sink: Arc<dyn ReportSink>,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            store,
            sink,
            policy,
        }
    }

    /// Fetch an exam and open a session on it for `user_id`.
    ///
    /// No session exists unless the exam loaded and passed validation.
    pub async fn open(&self, exam_id: &str, user_id: &str) -> Result<ExamSession, SessionError> {
        tracing::debug!(store = self.store.name(), exam_id, "fetching exam");
        let exam = self
            .store
            .fetch_exam(exam_id)
            .await
            .map_err(|e| classify_load_error(exam_id, e))?;

        let session = ExamSession::new(Arc::new(exam), user_id)?;
        tracing::info!(
            exam_id,
            questions = session.exam().question_count(),
            duration_secs = session.exam().duration_secs,
            "exam loaded"
        );
        Ok(session)
    }

    /// Send the session's pending report to the sink.
    ///
    /// On success the session advances to `Scored`. On failure the session
    /// keeps its mode and its scored report, so a later call resubmits the
    /// same report without rescoring.
    pub async fn deliver(&self, session: &mut ExamSession) -> Result<ReportAck, SessionError> {
        let report = session
            .pending_report()
            .cloned()
            .ok_or_else(|| SessionError::invalid("deliver", "no scored attempt is pending"))?;

        let mut retry_delay = self.policy.retry_delay;
        let mut last_error = None;
        for retry in 0..=self.policy.max_retries {
            if retry > 0 {
                tracing::warn!(
                    report_id = %report.id,
                    retry,
                    "retrying report delivery in {}ms",
                    retry_delay.as_millis()
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            }
            match self.sink.submit_report(&report).await {
                Ok(ack) => {
                    session.confirm_delivery(&ack)?;
                    return Ok(ack);
                }
                Err(e) => {
                    tracing::warn!(sink = self.sink.name(), "report delivery failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        let message = last_error
            .map(|e| format!("{e:#}"))
            .unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(report_id = %report.id, "giving up on report delivery: {message}");
        Err(SessionError::ReportSubmitTransport(message))
    }
}

fn classify_load_error(exam_id: &str, error: anyhow::Error) -> SessionError {
    match error.downcast_ref::<StoreError>() {
        Some(StoreError::NotFound(_)) => SessionError::ExamNotFound(exam_id.to_string()),
        _ => SessionError::ExamLoadTransport(format!("{error:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::two_question_exam;
    use crate::session::Mode;
    use crate::traits::doubles::{FlakySink, StaticStore};

    fn proctor(sink: Arc<FlakySink>, max_retries: u32) -> Proctor {
        Proctor::new(
            Arc::new(StaticStore::with(two_question_exam())),
            sink,
            DeliveryPolicy {
                max_retries,
                retry_delay: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn open_unknown_exam_is_not_found() {
        let p = proctor(Arc::new(FlakySink::new(0)), 0);
        let err = p.open("missing", "u").await.unwrap_err();
        assert!(matches!(err, SessionError::ExamNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn open_transport_failure_is_surfaced() {
        let p = Proctor::new(
            Arc::new(StaticStore::unreachable()),
            Arc::new(FlakySink::new(0)),
            DeliveryPolicy::default(),
        );
        let err = p.open("exam-1", "u").await.unwrap_err();
        assert!(matches!(err, SessionError::ExamLoadTransport(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn open_rejects_invalid_definition() {
        let mut exam = two_question_exam();
        exam.passing_marks = 9;
        let p = Proctor::new(
            Arc::new(StaticStore::with(exam)),
            Arc::new(FlakySink::new(0)),
            DeliveryPolicy::default(),
        );
        assert!(matches!(
            p.open("exam-1", "u").await,
            Err(SessionError::InvalidExam { .. })
        ));
    }

    #[tokio::test]
    async fn deliver_advances_to_scored() {
        let sink = Arc::new(FlakySink::new(0));
        let p = proctor(Arc::clone(&sink), 0);
        let mut session = p.open("exam-1", "user-9").await.unwrap();
        session.start().unwrap();
        session.go_next().unwrap();
        let report = session.submit().unwrap();

        let ack = p.deliver(&mut session).await.unwrap();
        assert_eq!(ack.report_id, report.id);
        assert_eq!(session.mode(), Mode::Scored);
        assert_eq!(sink.delivered().len(), 1);
        assert_eq!(sink.delivered()[0].user_id, "user-9");
    }

    #[tokio::test(start_paused = true)]
    async fn deliver_retries_transient_failures() {
        let sink = Arc::new(FlakySink::new(2));
        let p = proctor(Arc::clone(&sink), 3);
        let mut session = p.open("exam-1", "u").await.unwrap();
        session.start().unwrap();
        session.go_next().unwrap();
        session.submit().unwrap();

        p.deliver(&mut session).await.unwrap();
        assert_eq!(sink.attempts(), 3);
        assert_eq!(session.mode(), Mode::Scored);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_keeps_result_for_resubmission() {
        let sink = Arc::new(FlakySink::new(2));
        let p = proctor(Arc::clone(&sink), 0);
        let mut session = p.open("exam-1", "u").await.unwrap();
        session.start().unwrap();
        session.select(0, "A").unwrap();
        session.go_next().unwrap();
        let report = session.submit().unwrap();

        let err = p.deliver(&mut session).await.unwrap_err();
        assert!(matches!(err, SessionError::ReportSubmitTransport(_)));
        assert_eq!(session.mode(), Mode::InProgress);
        assert_eq!(session.result(), Some(&report.result));

        assert!(p.deliver(&mut session).await.is_err());
        p.deliver(&mut session).await.unwrap();
        assert_eq!(session.mode(), Mode::Scored);

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, report.id);
    }

    #[tokio::test]
    async fn deliver_without_pending_report_is_rejected() {
        let p = proctor(Arc::new(FlakySink::new(0)), 0);
        let mut session = p.open("exam-1", "u").await.unwrap();
        assert!(p
            .deliver(&mut session)
            .await
            .unwrap_err()
            .is_invalid_action());
    }
}
