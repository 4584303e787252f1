//! Core data model types for proctor.
//!
//! These are the fundamental types that the entire proctor system uses
//! to represent exams, questions, scored attempts, and submitted reports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// A single multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The prompt shown to the candidate.
    pub name: String,
    /// Option key → option text (e.g. "A" → "Paris").
    ///
    /// Options are always listed in key order, whatever order the exam
    /// author wrote them in.
    pub options: BTreeMap<String, String>,
    /// Key of the single correct option.
    pub correct_option: String,
}

impl Question {
    /// Text of the option with the given key, if it exists.
    pub fn option_text(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether `key` names one of this question's options.
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}

/// A complete exam as loaded from an exam store. Immutable for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDefinition {
    /// Unique identifier for this exam.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form category label.
    #[serde(default)]
    pub category: String,
    /// Questions in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Time allowed in seconds.
    pub duration_secs: u32,
    /// Marks shown as the exam total.
    #[serde(default)]
    pub total_marks: u32,
    /// Minimum number of correct answers for a pass.
    pub passing_marks: u32,
    /// Reference material offered to failing candidates.
    #[serde(default)]
    pub reference: Option<String>,
}

impl ExamDefinition {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Check the invariants a session relies on.
    ///
    /// An out-of-range `passing_marks` is rejected here rather than clamped.
    pub fn check(&self) -> Result<(), SessionError> {
        let invalid = |reason: String| SessionError::InvalidExam {
            exam_id: self.id.clone(),
            reason,
        };

        if self.duration_secs == 0 {
            return Err(invalid("duration must be greater than zero".into()));
        }
        if self.questions.is_empty() {
            return Err(invalid("exam has no questions".into()));
        }
        if self.passing_marks as usize > self.questions.len() {
            return Err(invalid(format!(
                "passing marks {} exceed question count {}",
                self.passing_marks,
                self.questions.len()
            )));
        }
        for (index, question) in self.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(invalid(format!(
                    "question {} has fewer than two options",
                    index + 1
                )));
            }
            if !question.has_option(&question.correct_option) {
                return Err(invalid(format!(
                    "question {}: correct option '{}' is not one of its options",
                    index + 1,
                    question.correct_option
                )));
            }
        }
        Ok(())
    }
}

/// Pass/fail outcome of a scored attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" => Ok(Verdict::Pass),
            "fail" => Ok(Verdict::Fail),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// The outcome of scoring one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Questions answered correctly, in exam order.
    pub correct_answers: Vec<Question>,
    /// Questions answered wrongly or left unanswered, in exam order.
    pub wrong_answers: Vec<Question>,
    pub verdict: Verdict,
}

impl ScoreResult {
    /// Number of correct answers (the obtained marks).
    pub fn obtained(&self) -> usize {
        self.correct_answers.len()
    }
}

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitTrigger {
    /// The candidate pressed submit.
    Manual,
    /// The countdown reached zero.
    Timeout,
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTrigger::Manual => write!(f, "manual"),
            SubmitTrigger::Timeout => write!(f, "timeout"),
        }
    }
}

/// A scored attempt as handed to a report sink.
///
/// The `id` is fixed when the attempt is scored and reused on every
/// delivery retry, so sinks can treat repeated deliveries as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamReport {
    pub id: Uuid,
    pub exam_id: String,
    pub user_id: String,
    pub result: ScoreResult,
    pub trigger: SubmitTrigger,
    pub submitted_at: DateTime<Utc>,
}

/// Acknowledgement returned by a report sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAck {
    pub report_id: Uuid,
    /// Sink-specific receipt (a file path, a server message, ...).
    #[serde(default)]
    pub receipt: Option<String>,
}
