//! The `proctor validate` command.

use std::path::PathBuf;

use anyhow::Result;

use proctor_core::parser::{self, Severity};

pub fn execute(exam_set_path: PathBuf) -> Result<()> {
    let exams = if exam_set_path.is_dir() {
        parser::load_exam_directory(&exam_set_path)?
    } else {
        vec![parser::parse_exam(&exam_set_path)?]
    };

    let mut total_warnings = 0;
    let mut total_errors = 0;

    for exam in &exams {
        println!(
            "Exam: {} [{}] ({} questions)",
            exam.name,
            exam.id,
            exam.question_count()
        );

        for w in parser::validate_exam(exam) {
            let prefix = w
                .question
                .map(|n| format!("  [Q{n}]"))
                .unwrap_or_else(|| "  ".to_string());
            match w.severity {
                Severity::Error => {
                    println!("{prefix} ERROR: {}", w.message);
                    total_errors += 1;
                }
                Severity::Warning => {
                    println!("{prefix} WARNING: {}", w.message);
                    total_warnings += 1;
                }
            }
        }
    }

    if total_errors == 0 && total_warnings == 0 {
        println!("All exams valid.");
    } else if total_errors == 0 {
        println!("\n{total_warnings} warning(s) found.");
    }

    anyhow::ensure!(
        total_errors == 0,
        "{total_errors} error(s) found, these exams cannot be taken"
    );
    Ok(())
}
