//! The `proctor init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("proctor.toml").exists() {
        println!("proctor.toml already exists, skipping.");
    } else {
        std::fs::write("proctor.toml", SAMPLE_CONFIG)?;
        println!("Created proctor.toml");
    }

    std::fs::create_dir_all("exams")?;
    let sample_path = Path::new("exams/sample.toml");
    if sample_path.exists() {
        println!("exams/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_EXAM)?;
        println!("Created exams/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit proctor.toml (set user_id, or point the store at your exam portal)");
    println!("  2. Run: proctor validate --exam-set exams/sample.toml");
    println!("  3. Run: proctor take --exam sample");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# proctor configuration

user_id = "${USER}"
max_retries = 3
retry_delay_ms = 1000

[store]
type = "fs"
exams_dir = "./exams"

[sink]
type = "fs"
reports_dir = "./proctor-reports"

# To use an exam portal instead:
# [store]
# type = "http"
# base_url = "https://exams.example.com"
# token = "${PROCTOR_API_TOKEN}"
"#;

const SAMPLE_EXAM: &str = r#"[exam]
id = "sample"
name = "Sample Exam"
category = "general"
duration_secs = 120
total_marks = 3
passing_marks = 2
reference = "https://doc.rust-lang.org/book/"

[[questions]]
name = "Which keyword declares an immutable binding in Rust?"
correct_option = "A"

[questions.options]
A = "let"
B = "var"
C = "const mut"

[[questions]]
name = "What does `Option::None` represent?"
correct_option = "B"

[questions.options]
A = "An error"
B = "The absence of a value"
C = "A null pointer"

[[questions]]
name = "Which macro prints a line to stdout?"
correct_option = "C"

[questions.options]
A = "print_line!"
B = "echo!"
C = "println!"
"#;
