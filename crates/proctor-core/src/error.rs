//! Error types for exam sessions and their external collaborators.
//!
//! `StoreError` is defined here rather than in `proctor-store` so the
//! proctor can downcast trait errors and classify them without string
//! matching.

use thiserror::Error;

/// Errors raised by exam stores and report sinks.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No exam with the requested identifier exists.
    #[error("exam not found: {0}")]
    NotFound(String),

    /// The store or sink could not be reached or answered badly.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the session state machine and the proctor.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The exam store has no such exam.
    #[error("exam not found: {0}")]
    ExamNotFound(String),

    /// Fetching the exam definition failed in transit.
    #[error("failed to load exam: {0}")]
    ExamLoadTransport(String),

    /// The loaded exam definition violates a session invariant.
    #[error("invalid exam '{exam_id}': {reason}")]
    InvalidExam { exam_id: String, reason: String },

    /// Delivering the scored report failed; the result is kept for retry.
    #[error("failed to submit report: {0}")]
    ReportSubmitTransport(String),

    /// The action is not valid right now. Session state is unchanged.
    #[error("invalid action `{action}`: {reason}")]
    InvalidAction {
        action: &'static str,
        reason: String,
    },
}

impl SessionError {
    pub(crate) fn invalid(action: &'static str, reason: impl Into<String>) -> Self {
        SessionError::InvalidAction {
            action,
            reason: reason.into(),
        }
    }

    /// Returns `true` for rejected actions, which never change state.
    pub fn is_invalid_action(&self) -> bool {
        matches!(self, SessionError::InvalidAction { .. })
    }

    /// Returns `true` if a later retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ExamLoadTransport(_) | SessionError::ReportSubmitTransport(_)
        )
    }
}
