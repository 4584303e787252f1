//! proctor CLI: take timed multiple-choice exams in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Timed multiple-choice exams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an exam interactively
    Take {
        /// Exam id to load from the configured store
        #[arg(long)]
        exam: String,

        /// Candidate id recorded on the report (overrides config)
        #[arg(long)]
        user: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate exam TOML files
    Validate {
        /// Path to exam file or directory
        #[arg(long)]
        exam_set: PathBuf,
    },

    /// Create starter config and a sample exam
    Init,

    /// Render a saved report
    Show {
        /// Report JSON written by the filesystem sink
        #[arg(long)]
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("proctor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take { exam, user, config } => commands::take::execute(exam, user, config).await,
        Commands::Validate { exam_set } => commands::validate::execute(exam_set),
        Commands::Init => commands::init::execute(),
        Commands::Show { report } => commands::show::execute(report),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
