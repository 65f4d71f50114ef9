mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use judge_common::config::SandboxBackend;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "judge-cli")]
#[command(about = "Judge CLI - Run, classify and inspect submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Process,
    Docker,
}

impl From<Backend> for SandboxBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Process => SandboxBackend::Process,
            Backend::Docker => SandboxBackend::Docker,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a request file locally and print the result
    Run {
        /// Path to an ExecutionRequest JSON file
        #[arg(short, long)]
        request: PathBuf,

        /// Sandbox backend (defaults to SANDBOX_BACKEND)
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,

        /// Also store the result in Redis under this attempt id
        #[arg(short, long)]
        attempt: Option<String>,
    },

    /// Run the safety classifier over a source file
    Classify {
        /// Language name (javascript, python, java, go)
        #[arg(short, long)]
        language: String,

        /// Source file
        file: PathBuf,
    },

    /// Fetch a stored result from Redis
    Result {
        /// Attempt id
        attempt_id: String,
    },

    /// List configured languages and their sandbox limits
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            request,
            backend,
            attempt,
        } => {
            commands::run_request(&request, backend.map(Into::into), attempt.as_deref()).await?;
        }
        Commands::Classify { language, file } => {
            commands::classify_file(&language, &file)?;
        }
        Commands::Result { attempt_id } => {
            commands::show_result(&attempt_id).await?;
        }
        Commands::Languages => {
            commands::list_languages()?;
        }
    }

    Ok(())
}
