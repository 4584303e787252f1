//! The `proctor show` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use proctor_core::model::{ExamReport, Question};

pub fn execute(report_path: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&report_path)
        .with_context(|| format!("failed to read report: {}", report_path.display()))?;
    let report: ExamReport = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report: {}", report_path.display()))?;

    println!("{}", render(&report));
    Ok(())
}

fn render(report: &ExamReport) -> String {
    let result = &report.result;

    let mut overview = Table::new();
    overview.load_preset(UTF8_FULL);
    overview.set_header(vec!["Field", "Value"]);
    overview.add_row(vec!["Report".to_string(), report.id.to_string()]);
    overview.add_row(vec!["Exam".to_string(), report.exam_id.clone()]);
    overview.add_row(vec!["User".to_string(), report.user_id.clone()]);
    overview.add_row(vec![
        "Submitted".to_string(),
        report.submitted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);
    overview.add_row(vec!["Trigger".to_string(), report.trigger.to_string()]);
    overview.add_row(vec![
        "Correct".to_string(),
        result.correct_answers.len().to_string(),
    ]);
    overview.add_row(vec![
        "Wrong".to_string(),
        result.wrong_answers.len().to_string(),
    ]);
    overview.add_row(vec!["Verdict".to_string(), result.verdict.to_string()]);

    let mut questions = Table::new();
    questions.load_preset(UTF8_FULL);
    questions.set_header(vec!["Question", "Correct answer", "Outcome"]);
    let rows = result
        .correct_answers
        .iter()
        .map(|q| (q, "correct"))
        .chain(result.wrong_answers.iter().map(|q| (q, "wrong")));
    for (question, outcome) in rows {
        questions.add_row(vec![
            question.name.clone(),
            answer_text(question),
            outcome.to_string(),
        ]);
    }

    format!("{overview}\n{questions}")
}

fn answer_text(question: &Question) -> String {
    match question.option_text(&question.correct_option) {
        Some(text) => format!("{}) {text}", question.correct_option),
        None => question.correct_option.clone(),
    }
}
