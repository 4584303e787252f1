//! TOML exam definition parser.
//!
//! Loads exams from TOML files and directories, and validates them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{ExamDefinition, Question};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    name: String,
    #[serde(default)]
    category: String,
    duration_secs: u32,
    #[serde(default)]
    total_marks: Option<u32>,
    passing_marks: u32,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    name: String,
    correct_option: String,
    #[serde(default)]
    options: BTreeMap<String, String>,
}

/// Parse a single TOML file into an `ExamDefinition`.
pub fn parse_exam(path: &Path) -> Result<ExamDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamDefinition` (useful for testing).
///
/// `total_marks` defaults to the number of questions.
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDefinition> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions: Vec<Question> = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            name: q.name,
            options: q.options,
            correct_option: q.correct_option,
        })
        .collect();

    let total_marks = parsed
        .exam
        .total_marks
        .unwrap_or(questions.len() as u32);

    Ok(ExamDefinition {
        id: parsed.exam.id,
        name: parsed.exam.name,
        category: parsed.exam.category,
        questions,
        duration_secs: parsed.exam.duration_secs,
        total_marks,
        passing_marks: parsed.exam.passing_marks,
        reference: parsed.exam.reference,
    })
}

/// Recursively load all `.toml` exam files from a directory.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<ExamDefinition>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    exams.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(exams)
}

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The exam cannot be taken.
    Error,
    /// The exam can be taken but is probably not what the author meant.
    Warning,
}

/// A finding from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub severity: Severity,
    /// 1-based question number (if applicable).
    pub question: Option<usize>,
    pub message: String,
}

/// Validate an exam for invariant violations and common authoring issues.
pub fn validate_exam(exam: &ExamDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if let Err(e) = exam.check() {
        warnings.push(ValidationWarning {
            severity: Severity::Error,
            question: None,
            message: e.to_string(),
        });
    }

    // Check for duplicate prompts
    let mut seen = std::collections::HashSet::new();
    for (index, question) in exam.questions.iter().enumerate() {
        if !seen.insert(question.name.trim()) {
            warnings.push(ValidationWarning {
                severity: Severity::Warning,
                question: Some(index + 1),
                message: format!("duplicate question: {}", question.name.trim()),
            });
        }
    }

    // Check for empty prompts and option texts
    for (index, question) in exam.questions.iter().enumerate() {
        if question.name.trim().is_empty() {
            warnings.push(ValidationWarning {
                severity: Severity::Warning,
                question: Some(index + 1),
                message: "question prompt is empty".into(),
            });
        }
        for (key, text) in &question.options {
            if text.trim().is_empty() {
                warnings.push(ValidationWarning {
                    severity: Severity::Warning,
                    question: Some(index + 1),
                    message: format!("option '{key}' has no text"),
                });
            }
        }
    }

    if exam.total_marks as usize != exam.questions.len() {
        warnings.push(ValidationWarning {
            severity: Severity::Warning,
            question: None,
            message: format!(
                "total_marks is {} but the exam has {} questions (one mark each)",
                exam.total_marks,
                exam.questions.len()
            ),
        });
    }

    warnings
}
