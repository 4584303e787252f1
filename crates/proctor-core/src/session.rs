//! The exam-session state machine.
//!
//! A session moves through [`Mode::Instructions`] → [`Mode::InProgress`] →
//! [`Mode::Scored`] → [`Mode::Reviewed`], and back to instructions on retake.
//! Every user action and every clock tick is a discrete event applied with
//! `&mut self`, one at a time. Scoring happens at most once per attempt: the
//! first of manual submit or clock expiry cancels the countdown and stores
//! the scored report as pending; later triggers find the guard closed.
//!
//! The session performs no I/O. A scored report stays pending until the
//! caller confirms delivery (see [`crate::proctor::Proctor::deliver`]), and
//! only then does the mode advance to `Scored`.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::countdown::{Countdown, Tick};
use crate::error::SessionError;
use crate::ledger::AnswerLedger;
use crate::model::{
    ExamDefinition, ExamReport, Question, ReportAck, ScoreResult, SubmitTrigger,
};
use crate::review::{self, ResultSummary, ReviewEntry};
use crate::scoring;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Instructions,
    InProgress,
    Scored,
    Reviewed,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Instructions => write!(f, "instructions"),
            Mode::InProgress => write!(f, "in progress"),
            Mode::Scored => write!(f, "scored"),
            Mode::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// A user action delivered to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Start,
    Select { index: usize, key: String },
    /// Select `key` for the question under the session's cursor.
    SelectCurrent { key: String },
    Next,
    Previous,
    Submit,
    /// Deliver again a scored attempt whose delivery failed.
    Resubmit,
    Review,
    Retake,
    /// The candidate navigated away from the exam.
    Leave,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Select { .. } | Action::SelectCurrent { .. } => "select",
            Action::Next => "next",
            Action::Previous => "previous",
            Action::Submit => "submit",
            Action::Resubmit => "resubmit",
            Action::Review => "review",
            Action::Retake => "retake",
            Action::Leave => "leave",
        }
    }
}

/// Result of delivering a clock tick to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTick {
    /// No exam is running; the tick had no effect.
    Ignored,
    /// One second elapsed.
    Remaining(u32),
    /// Time ran out and the attempt was scored. The report must be delivered.
    TimedOut(ExamReport),
}

/// Read-only view of a session for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub exam_id: String,
    pub exam_name: String,
    pub mode: Mode,
    pub current_index: usize,
    pub question_count: usize,
    pub seconds_remaining: u32,
    pub answers: Vec<(usize, String)>,
    /// Present once scored, including while delivery is still pending.
    pub result: Option<ScoreResult>,
    pub awaiting_delivery: bool,
}

/// One candidate's attempt(s) at one exam.
#[derive(Debug, Clone)]
pub struct ExamSession {
    exam: Arc<ExamDefinition>,
    user_id: String,
    mode: Mode,
    current: usize,
    countdown: Countdown,
    ledger: AnswerLedger,
    result: Option<ScoreResult>,
    pending: Option<ExamReport>,
}

impl ExamSession {
    /// Create a session in [`Mode::Instructions`].
    ///
    /// Fails if the exam violates [`ExamDefinition::check`].
    pub fn new(
        exam: Arc<ExamDefinition>,
        user_id: impl Into<String>,
    ) -> Result<Self, SessionError> {
        exam.check()?;
        Ok(Self {
            countdown: Countdown::new(exam.duration_secs),
            ledger: AnswerLedger::new(exam.question_count()),
            exam,
            user_id: user_id.into(),
            mode: Mode::Instructions,
            current: 0,
            result: None,
            pending: None,
        })
    }

    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question at the cursor while answering or reviewing.
    pub fn current_question(&self) -> Option<&Question> {
        match self.mode {
            Mode::InProgress | Mode::Reviewed => self.exam.questions.get(self.current),
            Mode::Instructions | Mode::Scored => None,
        }
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn is_clock_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    /// The score of the current attempt, whether delivered or still pending.
    pub fn result(&self) -> Option<&ScoreResult> {
        self.pending
            .as_ref()
            .map(|report| &report.result)
            .or(self.result.as_ref())
    }

    /// The scored report awaiting delivery, if any.
    pub fn pending_report(&self) -> Option<&ExamReport> {
        self.pending.as_ref()
    }

    pub fn awaiting_delivery(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply one user action.
    ///
    /// Returns the report to deliver when the action scored the attempt.
    /// A rejected action returns [`SessionError::InvalidAction`] and leaves
    /// the session untouched.
    pub fn apply(&mut self, action: Action) -> Result<Option<ExamReport>, SessionError> {
        let outcome = match action {
            Action::Start => self.start().map(|_| None),
            Action::Select { index, key } => self.select(index, &key).map(|_| None),
            Action::SelectCurrent { key } => self.select_current(&key).map(|_| None),
            Action::Next => self.go_next().map(|_| None),
            Action::Previous => self.go_previous().map(|_| None),
            Action::Submit => self.submit().map(Some),
            Action::Resubmit => self
                .pending
                .clone()
                .map(Some)
                .ok_or_else(|| SessionError::invalid("resubmit", "no scored attempt is pending")),
            Action::Review => self.review().map(|_| None),
            Action::Retake => self.retake().map(|_| None),
            Action::Leave => {
                self.leave();
                Ok(None)
            }
        };
        if let Err(e) = &outcome {
            tracing::debug!(exam_id = %self.exam.id, mode = %self.mode, "rejected: {e}");
        }
        outcome
    }

    /// Leave the instructions and start the countdown.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require_mode("start", &[Mode::Instructions])?;
        self.ledger.clear();
        self.result = None;
        self.current = 0;
        self.countdown.start(self.exam.duration_secs);
        self.mode = Mode::InProgress;
        tracing::info!(
            exam_id = %self.exam.id,
            user_id = %self.user_id,
            duration_secs = self.exam.duration_secs,
            "exam started"
        );
        Ok(())
    }

    /// Select `key` for the question at `index`.
    pub fn select(&mut self, index: usize, key: &str) -> Result<(), SessionError> {
        self.require_mode("select", &[Mode::InProgress])?;
        self.require_not_submitted("select")?;
        let question = self.exam.questions.get(index).ok_or_else(|| {
            SessionError::invalid(
                "select",
                format!(
                    "question {index} out of range (exam has {})",
                    self.exam.question_count()
                ),
            )
        })?;
        if !question.has_option(key) {
            return Err(SessionError::invalid(
                "select",
                format!("question {} has no option '{key}'", index + 1),
            ));
        }
        self.ledger.select(index, key)?;
        Ok(())
    }

    /// Select `key` for the question at the cursor.
    pub fn select_current(&mut self, key: &str) -> Result<(), SessionError> {
        self.select(self.current, key)
    }

    /// Move the cursor forward. Fails at the last question.
    pub fn go_next(&mut self) -> Result<usize, SessionError> {
        self.require_mode("next", &[Mode::InProgress, Mode::Reviewed])?;
        if self.current + 1 >= self.exam.question_count() {
            return Err(SessionError::invalid("next", "already at the last question"));
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Move the cursor back. Fails at the first question.
    pub fn go_previous(&mut self) -> Result<usize, SessionError> {
        self.require_mode("previous", &[Mode::InProgress, Mode::Reviewed])?;
        if self.current == 0 {
            return Err(SessionError::invalid(
                "previous",
                "already at the first question",
            ));
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Submit the attempt manually. Only allowed at the last question.
    pub fn submit(&mut self) -> Result<ExamReport, SessionError> {
        self.require_mode("submit", &[Mode::InProgress])?;
        self.require_not_submitted("submit")?;
        if self.current + 1 != self.exam.question_count() {
            return Err(SessionError::invalid(
                "submit",
                "submit is only available at the last question",
            ));
        }
        Ok(self.score_attempt(SubmitTrigger::Manual))
    }

    /// Deliver one elapsed second.
    pub fn tick(&mut self) -> SessionTick {
        if self.mode != Mode::InProgress {
            return SessionTick::Ignored;
        }
        match self.countdown.tick() {
            Tick::Idle => SessionTick::Ignored,
            Tick::Remaining(secs) => SessionTick::Remaining(secs),
            Tick::Expired if self.pending.is_some() => SessionTick::Ignored,
            Tick::Expired => {
                tracing::info!(exam_id = %self.exam.id, "time is up");
                SessionTick::TimedOut(self.score_attempt(SubmitTrigger::Timeout))
            }
        }
    }

    /// Record that the pending report reached the sink. Advances to `Scored`.
    pub fn confirm_delivery(&mut self, ack: &ReportAck) -> Result<(), SessionError> {
        match &self.pending {
            Some(report) if report.id == ack.report_id => {}
            Some(_) => {
                return Err(SessionError::invalid(
                    "confirm",
                    format!("acknowledgement for unknown report {}", ack.report_id),
                ))
            }
            None => return Err(SessionError::invalid("confirm", "no report is pending")),
        }
        if let Some(report) = self.pending.take() {
            tracing::info!(
                exam_id = %self.exam.id,
                report_id = %report.id,
                verdict = %report.result.verdict,
                "report delivered"
            );
            self.result = Some(report.result);
        }
        self.mode = Mode::Scored;
        Ok(())
    }

    /// Show every question alongside the submitted and correct answers.
    pub fn review(&mut self) -> Result<(), SessionError> {
        self.require_mode("review", &[Mode::Scored])?;
        self.current = 0;
        self.mode = Mode::Reviewed;
        Ok(())
    }

    /// Discard the scored attempt and return to the instructions.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        self.require_mode("retake", &[Mode::Scored, Mode::Reviewed])?;
        self.ledger.clear();
        self.result = None;
        self.current = 0;
        self.countdown.reset(self.exam.duration_secs);
        self.mode = Mode::Instructions;
        tracing::info!(exam_id = %self.exam.id, "retake requested");
        Ok(())
    }

    /// The candidate navigated away. Stops the countdown.
    pub fn leave(&mut self) {
        self.countdown.cancel();
        tracing::debug!(exam_id = %self.exam.id, mode = %self.mode, "session left");
    }

    /// Marks summary of the delivered result.
    pub fn summary(&self) -> Option<ResultSummary> {
        self.result
            .as_ref()
            .map(|result| review::summarize(&self.exam, result))
    }

    /// Per-question review of the delivered result.
    pub fn review_entries(&self) -> Option<Vec<ReviewEntry>> {
        self.result
            .as_ref()
            .map(|_| review::review_entries(&self.exam, &self.ledger))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exam_id: self.exam.id.clone(),
            exam_name: self.exam.name.clone(),
            mode: self.mode,
            current_index: self.current,
            question_count: self.exam.question_count(),
            seconds_remaining: self.countdown.remaining(),
            answers: self
                .ledger
                .entries()
                .iter()
                .map(|(index, key)| (*index, key.clone()))
                .collect(),
            result: self.result().cloned(),
            awaiting_delivery: self.awaiting_delivery(),
        }
    }

    /// Cancel the clock, score once, and park the report for delivery.
    fn score_attempt(&mut self, trigger: SubmitTrigger) -> ExamReport {
        self.countdown.cancel();
        let result = scoring::score(&self.exam.questions, &self.ledger, self.exam.passing_marks);
        let report = ExamReport {
            id: Uuid::new_v4(),
            exam_id: self.exam.id.clone(),
            user_id: self.user_id.clone(),
            result,
            trigger,
            submitted_at: Utc::now(),
        };
        tracing::info!(
            exam_id = %self.exam.id,
            %trigger,
            correct = report.result.obtained(),
            verdict = %report.result.verdict,
            "attempt scored"
        );
        self.pending = Some(report.clone());
        report
    }

    fn require_mode(&self, action: &'static str, allowed: &[Mode]) -> Result<(), SessionError> {
        if allowed.contains(&self.mode) {
            Ok(())
        } else {
            Err(SessionError::invalid(
                action,
                format!("not available while {}", self.mode),
            ))
        }
    }

    fn require_not_submitted(&self, action: &'static str) -> Result<(), SessionError> {
        if self.pending.is_some() {
            Err(SessionError::invalid(
                action,
                "attempt already submitted and awaiting delivery",
            ))
        } else {
            Ok(())
        }
    }
}
