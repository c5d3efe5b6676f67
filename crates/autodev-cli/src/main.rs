//! CLI binary for driving AutoDev workflow sessions.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use autodev_agents::{build_engine, AgentContext};
use autodev_engine::{artifacts, CheckpointStore, Settings, Workspace};
use autodev_llm::LlmClient;
use autodev_types::{AutodevError, Result, SessionState, TaskStatus};
use autodev_worker::{ClaudeCliWorker, WorkerConfig};

#[derive(Parser)]
#[command(name = "autodev", version, about = "Multi-agent software development workflow runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session and run until completion or the next interrupt
    Start {
        /// The requirement to build
        requirement: String,

        /// Pause before the architect and coder stages for human review
        #[arg(long)]
        human_loop: bool,

        /// Write generated code into an existing external directory
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Settle all coding tasks inside a single coder pass
        #[arg(long)]
        batch_coding: bool,

        /// Custom session id (generated if not provided)
        #[arg(short, long)]
        session_id: Option<String>,
    },

    /// Resume a session from its checkpoint.
    ///
    /// Feedback always re-enters the producer of the artifact under review
    /// (the PM revision for the PRD, the architect for the design), then the
    /// workflow pauses again at the same point.
    #[command(name = "continue")]
    Continue {
        session_id: String,

        /// Feedback for the stage that produced the pending artifact
        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Print a session's stage, task counts, and last error
    Status { session_id: String },

    /// Print one of a session's artifact files
    Show {
        session_id: String,

        #[arg(short, long, value_enum)]
        artifact: ArtifactKind,
    },

    /// List all known sessions
    ListSessions,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArtifactKind {
    Prd,
    Design,
    Tasks,
}

impl ArtifactKind {
    fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Prd => artifacts::PRD,
            ArtifactKind::Design => artifacts::DESIGN,
            ArtifactKind::Tasks => artifacts::TASKS,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{}: {}", err.kind(), err);
            std::process::exit(err.exit_code());
        }
    }
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Start {
            requirement,
            human_loop,
            project_dir,
            batch_coding,
            session_id,
        } => cmd_start(requirement, human_loop, project_dir, batch_coding, session_id).await,
        Commands::Continue {
            session_id,
            feedback,
        } => cmd_continue(session_id, feedback).await,
        Commands::Status { session_id } => cmd_status(session_id).await,
        Commands::Show {
            session_id,
            artifact,
        } => cmd_show(session_id, artifact).await,
        Commands::ListSessions => cmd_list_sessions().await,
    }
}

fn generate_session_id() -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stamp}_{}", &suffix[..8])
}

/// Build the engine from validated settings. Fails fast on missing
/// configuration, before any node runs.
fn make_engine(settings: &Settings, batch_coding: bool) -> Result<autodev_engine::WorkflowEngine> {
    settings.validate()?;

    let mut adapter = autodev_llm::AnthropicAdapter::new(settings.anthropic_api_key.clone());
    if let Some(url) = &settings.anthropic_base_url {
        adapter = adapter.with_base_url(url.clone());
    }
    let llm = LlmClient::new()
        .with_provider(adapter)
        .with_middleware(autodev_llm::LoggingMiddleware);

    let worker = ClaudeCliWorker::new(WorkerConfig {
        timeout: settings.worker_timeout,
        validation_mode: settings.validation_mode,
        ..WorkerConfig::default()
    });

    let ctx = Arc::new(AgentContext {
        llm,
        worker: Arc::new(worker),
        settings: settings.clone(),
    });
    Ok(build_engine(ctx, batch_coding))
}

async fn cmd_start(
    requirement: String,
    human_loop: bool,
    project_dir: Option<PathBuf>,
    batch_coding: bool,
    session_id: Option<String>,
) -> Result<i32> {
    let settings = Settings::from_env();
    let human_in_loop = human_loop || settings.human_in_loop;

    let project_dir = match project_dir {
        Some(dir) => {
            if !dir.is_dir() {
                return Err(AutodevError::Config(format!(
                    "Project directory '{}' does not exist",
                    dir.display()
                )));
            }
            Some(std::fs::canonicalize(&dir)?)
        }
        None => None,
    };

    let engine = make_engine(&settings, batch_coding)?;

    let session_id = session_id.unwrap_or_else(generate_session_id);
    let workspace = Workspace::create(&settings.workspace_root, &session_id).await?;
    let workspace_path = std::fs::canonicalize(workspace.root())?;

    let mut state = SessionState::new(&session_id, requirement, workspace_path);
    state.human_in_loop = human_in_loop;
    state.project_dir = project_dir;

    println!("Session: {session_id}");
    println!("Human review: {}", if human_in_loop { "on" } else { "off" });

    let outcome = engine.start(state).await?;
    report_outcome(&outcome)
}

async fn cmd_continue(session_id: String, feedback: Option<String>) -> Result<i32> {
    let settings = Settings::from_env();
    let engine = make_engine(&settings, false)?;

    println!("Resuming session: {session_id}");
    if let Some(fb) = &feedback {
        println!("Feedback: {fb}");
    }

    let outcome = engine.resume(&session_id, feedback).await?;
    report_outcome(&outcome)
}

fn report_outcome(outcome: &autodev_engine::RunOutcome) -> Result<i32> {
    use autodev_engine::RunStatus;

    let state = &outcome.state;
    println!();
    println!("Stage: {}", state.stage);
    print_task_counts(state);

    match &outcome.status {
        RunStatus::Completed => {
            println!("Workflow completed");
            Ok(0)
        }
        RunStatus::Interrupted { next } => {
            println!("Paused for review before '{next}'");
            println!(
                "Continue with: autodev continue {} [--feedback \"...\"]",
                state.session_id
            );
            Ok(2)
        }
        RunStatus::Failed { error } => {
            println!("Workflow failed ({}): {}", error.kind, error.message);
            println!("Inspect with: autodev status {}", state.session_id);
            Ok(1)
        }
    }
}

fn print_task_counts(state: &SessionState) {
    if state.tasks.is_empty() {
        return;
    }
    println!(
        "Tasks: {} completed, {} blocked, {} pending (of {})",
        state.count_by_status(TaskStatus::Completed),
        state.count_by_status(TaskStatus::Blocked),
        state.count_by_status(TaskStatus::Pending),
        state.tasks.len()
    );
}

async fn cmd_status(session_id: String) -> Result<i32> {
    let settings = Settings::from_env();
    let store = CheckpointStore::new(settings.checkpoints_dir());
    let checkpoint = store.load(&session_id).await?;
    let state = &checkpoint.state;

    println!("Session: {session_id}");
    println!("Stage: {}", state.stage);
    println!("Created: {}", state.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(next) = checkpoint.next_node {
        println!("Next node: {next}");
    }
    print_task_counts(state);
    match &state.last_error {
        Some(err) => println!("Last error ({}): {}", err.kind, err.message),
        None => println!("Last error: none"),
    }
    Ok(0)
}

async fn cmd_show(session_id: String, artifact: ArtifactKind) -> Result<i32> {
    let settings = Settings::from_env();
    let store = CheckpointStore::new(settings.checkpoints_dir());
    let checkpoint = store.load(&session_id).await?;

    let workspace = Workspace::open(&checkpoint.state.workspace_path);
    let name = artifact.file_name();
    if !workspace.exists(name).await? {
        return Err(AutodevError::MissingArtifact {
            session: session_id,
            artifact: name.to_string(),
        });
    }
    print!("{}", workspace.read_text(name).await?);
    Ok(0)
}

async fn cmd_list_sessions() -> Result<i32> {
    let settings = Settings::from_env();
    let store = CheckpointStore::new(settings.checkpoints_dir());
    let summaries = store.list().await?;

    if summaries.is_empty() {
        println!("No sessions found");
        return Ok(0);
    }
    for summary in summaries {
        println!(
            "{}  {}  {}",
            summary.session_id,
            summary.stage,
            summary.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(0)
}
