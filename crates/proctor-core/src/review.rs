//! Result summaries, per-question review, and time formatting.

use serde::Serialize;

use crate::ledger::AnswerLedger;
use crate::model::{ExamDefinition, ScoreResult, Verdict};

/// Marks overview of a scored attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub total_marks: u32,
    pub obtained_marks: usize,
    pub wrong_answers: usize,
    pub passing_marks: u32,
    pub verdict: Verdict,
    /// Reference material, offered only on a failing verdict.
    pub reference: Option<String>,
}

/// One question as shown after scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    /// 1-based question number.
    pub number: usize,
    pub prompt: String,
    pub submitted_key: Option<String>,
    pub submitted_text: Option<String>,
    pub correct_key: String,
    pub correct_text: String,
    pub is_correct: bool,
}

pub fn summarize(exam: &ExamDefinition, result: &ScoreResult) -> ResultSummary {
    let reference = match result.verdict {
        Verdict::Fail => exam.reference.clone(),
        Verdict::Pass => None,
    };
    ResultSummary {
        total_marks: exam.total_marks,
        obtained_marks: result.correct_answers.len(),
        wrong_answers: result.wrong_answers.len(),
        passing_marks: exam.passing_marks,
        verdict: result.verdict,
        reference,
    }
}

pub fn review_entries(exam: &ExamDefinition, ledger: &AnswerLedger) -> Vec<ReviewEntry> {
    exam.questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let submitted = ledger.get(index);
            ReviewEntry {
                number: index + 1,
                prompt: question.name.clone(),
                submitted_key: submitted.map(str::to_string),
                submitted_text: submitted
                    .and_then(|key| question.option_text(key))
                    .map(str::to_string),
                correct_key: question.correct_option.clone(),
                correct_text: question
                    .option_text(&question.correct_option)
                    .unwrap_or_default()
                    .to_string(),
                is_correct: submitted == Some(question.correct_option.as_str()),
            }
        })
        .collect()
}

/// Format seconds as `HH:MM:SS`.
pub fn format_clock(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
