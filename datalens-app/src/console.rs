//! Line-oriented console front end.
//!
//! Each stdin line is parsed with clap into an [`Intent`] and dispatched in
//! order. Confirmation prompts consume the next line as their answer.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use datalens_core::models::UploadFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::app::App;
use crate::dispatch::{handle_intent, Intent, Reply};
use crate::interaction::Interaction;
use crate::subsystems::docs::DocumentationState;
use crate::subsystems::table_registry::Load;
use crate::subsystems::view_router::View;

// ============================================================================
// Command grammar
// ============================================================================

#[derive(Debug, Parser)]
#[command(no_binary_name = true, name = "datalens", disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Subcommand, PartialEq)]
enum ConsoleCommand {
    /// Sign in with email and password
    Login { email: String, password: String },
    /// Create an account and sign in
    Signup { email: String, password: String },
    /// Federated sign-in
    Popup,
    /// Continue without signing in
    Guest,
    /// Sign out and clear the backend session
    Logout {
        /// Leave server-held data in place
        #[arg(long)]
        keep_data: bool,
    },
    /// Clear the backend session but stay signed in
    Exit,
    /// Upload one or more CSV files
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Merge with the current dataset instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Show the dashboard pane
    Dashboard,
    /// Show the documentation pane
    Docs,
    /// Select a table
    Table { name: String },
    /// Generate an AI summary of the selected table
    Summary,
    /// Explain outliers in a column of the selected table
    Outlier { column: String },
    /// Explain an issue of the selected table by position
    Issue { index: usize },
    /// Ask the assistant a question
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Print the current state
    Status,
    /// Leave the console
    Quit,
}

enum Action {
    Dispatch(Intent),
    Status,
    Quit,
}

fn parse_line(line: &str) -> Result<ConsoleCommand, clap::Error> {
    ConsoleLine::try_parse_from(line.split_whitespace()).map(|l| l.command)
}

async fn read_upload(paths: &[PathBuf]) -> std::io::Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path).await?;
        files.push(UploadFile::new(file_name(path), content));
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn into_action(command: ConsoleCommand) -> anyhow::Result<Action> {
    let intent = match command {
        ConsoleCommand::Login { email, password } => Intent::SignIn { email, password },
        ConsoleCommand::Signup { email, password } => Intent::SignUp { email, password },
        ConsoleCommand::Popup => Intent::SignInWithPopup,
        ConsoleCommand::Guest => Intent::ContinueAsGuest,
        ConsoleCommand::Logout { keep_data } => Intent::SignOut {
            keep_remote_data: keep_data,
        },
        ConsoleCommand::Exit => Intent::ExitSession,
        ConsoleCommand::Upload { paths, append } => Intent::Upload {
            files: read_upload(&paths).await?,
            append,
        },
        ConsoleCommand::Dashboard => Intent::ShowDashboard,
        ConsoleCommand::Docs => Intent::ShowDocumentation,
        ConsoleCommand::Table { name } => Intent::SelectTable(name),
        ConsoleCommand::Summary => Intent::GenerateSummary,
        ConsoleCommand::Outlier { column } => Intent::ExplainOutlier { column },
        ConsoleCommand::Issue { index } => Intent::ExplainIssue { index },
        ConsoleCommand::Ask { question } => Intent::Ask(question.join(" ")),
        ConsoleCommand::Status => return Ok(Action::Status),
        ConsoleCommand::Quit => return Ok(Action::Quit),
    };
    Ok(Action::Dispatch(intent))
}

// ============================================================================
// Interaction over the console
// ============================================================================

type LineSource = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

pub struct ConsoleInteraction {
    lines: LineSource,
}

#[async_trait]
impl Interaction for ConsoleInteraction {
    async fn confirm(&self, prompt: &str) -> bool {
        println!("{} [y/N]", prompt);
        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }

    fn alert(&self, message: &str) {
        println!("! {}", message);
    }
}

// ============================================================================
// Console loop
// ============================================================================

pub struct Console {
    lines: LineSource,
}

impl Console {
    /// Console fed by stdin, one line per message.
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
        Self::from_receiver(rx)
    }

    pub fn from_receiver(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn interaction(&self) -> Arc<ConsoleInteraction> {
        Arc::new(ConsoleInteraction {
            lines: self.lines.clone(),
        })
    }

    /// Read and dispatch lines until `quit`, end of input or shutdown.
    pub async fn run(&self, app: &App, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
        spawn_state_printer(app, shutdown.resubscribe());

        loop {
            let line = tokio::select! {
                line = async { self.lines.lock().await.recv().await } => line,
                _ = shutdown.recv() => {
                    tracing::info!("Shutting down console...");
                    break;
                }
            };
            let Some(line) = line else {
                tracing::info!("Console input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match parse_line(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e.render());
                    continue;
                }
            };
            let action = match into_action(command).await {
                Ok(action) => action,
                Err(e) => {
                    println!("! {}", e);
                    continue;
                }
            };

            match action {
                Action::Quit => break,
                Action::Status => print!("{}", render(app)),
                Action::Dispatch(intent) => print_reply(&handle_intent(app, intent).await),
            }
        }

        Ok(())
    }
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Done => {}
        Reply::Ignored(why) => println!("(ignored: {})", why),
        Reply::Failed(message) => println!("! {}", message),
        Reply::Upload(outcome) => println!("upload: {:?}", outcome),
        Reply::SignOut(outcome) => println!("sign-out: {:?}", outcome),
        Reply::Answer(answer) => println!("assistant: {}", answer),
        Reply::Reason(Load::Ready(reason)) => println!("reason: {}", reason),
        Reply::Reason(Load::Failed(message)) => println!("! {}", message),
        Reply::Reason(Load::Pending) => {}
    }
}

/// Print view, session and upload status changes as they happen.
fn spawn_state_printer(app: &App, mut shutdown: broadcast::Receiver<()>) {
    let mut view = app.router.subscribe();
    let mut session = app.gate.subscribe_status();
    let mut upload = app.ingestion.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(()) = view.changed() => {
                    println!("[view] {}", describe_view(*view.borrow_and_update()));
                }
                Ok(()) = session.changed() => {
                    let line = session.borrow_and_update().clone();
                    println!("[session] {} ({:?})", line.text, line.level);
                }
                Ok(()) = upload.changed() => {
                    let line = upload.borrow_and_update().status_line();
                    println!("[upload] {} ({:?})", line.text, line.level);
                }
                _ = shutdown.recv() => break,
                else => break,
            }
        }
    });
}

fn describe_view(view: Option<View>) -> String {
    match view {
        None => "none".to_string(),
        Some(View::Auth) => "auth".to_string(),
        Some(View::Landing) => "landing".to_string(),
        Some(View::Application(pane)) => format!("application/{:?}", pane).to_lowercase(),
    }
}

/// Full snapshot of what the screen would show.
pub fn render(app: &App) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "view: {}", describe_view(app.router.current()));
    let _ = writeln!(out, "session: {}", app.gate.status().text);
    if let Some(error) = app.gate.auth_error() {
        let _ = writeln!(out, "auth error: {}", error);
    }
    let upload = app.ingestion.status().status_line();
    if !upload.text.is_empty() {
        let _ = writeln!(out, "upload: {}", upload.text);
    }

    let metrics = app.registry.dashboard();
    let unknown = || "-".to_string();
    let _ = writeln!(
        out,
        "tables: {}  rows: {}  avg trust: {}",
        metrics.total_tables.map(|n| n.to_string()).unwrap_or_else(unknown),
        metrics.total_rows.map(|n| n.to_string()).unwrap_or_else(unknown),
        metrics
            .avg_trust_score
            .map(|s| format!("{:.1}%", s))
            .unwrap_or_else(unknown),
    );
    if let Some(project) = &metrics.project {
        let _ = writeln!(out, "project: {}", project.title);
    }

    let catalog = app.registry.catalog();
    for name in catalog.names() {
        let _ = writeln!(out, "  - {}", name);
    }

    if let Some(detail) = app.registry.detail() {
        let _ = writeln!(out, "table: {}", detail.table);
        match &detail.schema {
            Load::Pending => {
                let _ = writeln!(out, "  schema: -");
            }
            Load::Failed(message) => {
                let _ = writeln!(out, "  schema: {}", message);
            }
            Load::Ready(rows) => {
                for row in rows {
                    let _ = writeln!(
                        out,
                        "  {} {} null {} unique {}{}",
                        row.name,
                        row.data_type,
                        row.null_pct,
                        row.unique_pct,
                        if row.is_potential_key { " [key]" } else { "" }
                    );
                }
            }
        }
        match &detail.quality {
            Load::Pending => {
                let _ = writeln!(out, "  trust: -");
            }
            Load::Failed(message) => {
                let _ = writeln!(out, "  quality: {}", message);
            }
            Load::Ready(quality) => {
                let _ = writeln!(
                    out,
                    "  trust: {:.1} ({})",
                    quality.report.trust_score,
                    quality.trust_level.as_str()
                );
                for (i, issue) in quality.issue_texts().into_iter().enumerate() {
                    let _ = writeln!(out, "  [{}] {}", i, issue);
                }
            }
        }
    }

    if let DocumentationState::Ready(report) | DocumentationState::Failed(report) =
        app.docs.state()
    {
        let _ = writeln!(out, "docs: {}", report.title);
        let _ = writeln!(out, "  {}", report.executive_summary);
    }

    for turn in app.chat.transcript() {
        let _ = writeln!(out, "{:?}: {}", turn.speaker, turn.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        assert_eq!(
            parse_line("login ada@example.com hunter22").unwrap(),
            ConsoleCommand::Login {
                email: "ada@example.com".into(),
                password: "hunter22".into()
            }
        );
    }

    #[test]
    fn test_parse_upload_with_append() {
        let command = parse_line("upload a.csv b.csv --append").unwrap();
        assert_eq!(
            command,
            ConsoleCommand::Upload {
                paths: vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")],
                append: true
            }
        );
    }

    #[test]
    fn test_parse_upload_requires_files() {
        assert!(parse_line("upload").is_err());
    }

    #[test]
    fn test_parse_multi_word_question() {
        match parse_line("ask which table is largest?").unwrap() {
            ConsoleCommand::Ask { question } => assert_eq!(question.join(" "), "which table is largest?"),
            other => panic!("Expected Ask, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert!(parse_line("frobnicate").is_err());
    }

    #[test]
    fn test_describe_view() {
        use crate::subsystems::view_router::Pane;
        assert_eq!(describe_view(None), "none");
        assert_eq!(
            describe_view(Some(View::Application(Pane::TableDetail))),
            "application/tabledetail"
        );
    }

    #[tokio::test]
    async fn test_confirm_reads_next_line() {
        let (tx, rx) = mpsc::unbounded_channel();
        let console = Console::from_receiver(rx);
        let interaction = console.interaction();

        tx.send("yes".to_string()).unwrap();
        tx.send("n".to_string()).unwrap();

        assert!(interaction.confirm("Proceed?").await);
        assert!(!interaction.confirm("Proceed?").await);
        drop(tx);
        assert!(!interaction.confirm("Proceed?").await);
    }

    #[tokio::test]
    async fn test_upload_reads_files_from_disk() {
        let dir = std::env::temp_dir().join(format!("datalens-upload-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("orders.csv");
        std::fs::write(&path, "id,total\n1,9.5\n").unwrap();

        let files = read_upload(&[path]).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "orders.csv");
        assert_eq!(&files[0].content[..], b"id,total\n1,9.5\n");
        std::fs::remove_dir_all(&dir).ok();
    }
}
