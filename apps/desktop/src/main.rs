use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    build_controller,
    config::{self, ClientSettings},
    view::{self, ViewModel},
    BackendMode, ConfirmPrompt, DeleteOutcome, SubmitOutcome, TeardownHandle, UserController,
};
use shared::domain::UserId;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "commands: list | refresh | name <text> | email <text> | edit <id> | cancel | submit | delete <id> | json | help | quit";

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to APP__CONFIG_PATH or ./user_admin.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    latency_ms: Option<u64>,
    /// 0 disables the request timeout.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
    /// `shared` or `static_seed`.
    #[arg(long)]
    backend_mode: Option<BackendMode>,
    /// Only remove deleted users from the local list.
    #[arg(long)]
    local_deletes: bool,
}

impl Args {
    fn resolve_settings(&self) -> ClientSettings {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut settings = config::load_settings_from(&path);
        if let Some(v) = self.latency_ms {
            settings.latency_ms = v;
        }
        if let Some(v) = self.request_timeout_ms {
            settings.request_timeout_ms = v;
        }
        if let Some(v) = self.backend_mode {
            settings.backend_mode = v;
        }
        if self.local_deletes {
            settings.propagate_deletes = false;
        }
        settings
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleCommand {
    List,
    Refresh,
    Name(String),
    Email(String),
    Edit(UserId),
    Cancel,
    Submit,
    Delete(UserId),
    Json,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));

    match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => Ok(ConsoleCommand::List),
        "refresh" => Ok(ConsoleCommand::Refresh),
        "name" => Ok(ConsoleCommand::Name(rest.to_string())),
        "email" => Ok(ConsoleCommand::Email(rest.to_string())),
        "edit" => parse_id(rest).map(ConsoleCommand::Edit),
        "cancel" => Ok(ConsoleCommand::Cancel),
        "submit" => Ok(ConsoleCommand::Submit),
        "delete" | "rm" => parse_id(rest).map(ConsoleCommand::Delete),
        "json" => Ok(ConsoleCommand::Json),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn parse_id(raw: &str) -> Result<UserId, String> {
    raw.parse::<i64>()
        .map(UserId)
        .map_err(|_| format!("expected a numeric user id, got '{raw}'"))
}

struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn render_view(model: &ViewModel) -> String {
    let mut submit_line = format!("  [{}]", model.form.submit_label);
    if model.form.cancel_visible {
        submit_line.push_str(&format!(" [{}]", view::CANCEL_LABEL));
    }

    let mut lines = vec![
        view::GREETING.to_string(),
        model.total_line.clone(),
        format!("-- {} --", model.form.heading),
        format!("  {}: {}", view::NAME_LABEL, model.form.name),
        format!("  {}: {}", view::EMAIL_LABEL, model.form.email),
        submit_line,
        format!("-- {} --", view::LIST_HEADING),
    ];
    lines.extend(model.loading_line.map(|line| format!("  {line}")));
    lines.extend(model.empty_line.map(|line| format!("  {line}")));
    lines.extend(
        model
            .rows
            .iter()
            .map(|row| format!("  {}  {}", row.summary(), row.badge)),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Returns `false` once the session should end.
async fn run_command(controller: &mut UserController, command: ConsoleCommand) -> Result<bool> {
    match command {
        ConsoleCommand::List => {}
        ConsoleCommand::Refresh => {
            if let Err(err) = controller.load().await {
                tracing::debug!(error = %err, "console: refresh failed");
            }
        }
        ConsoleCommand::Name(value) => controller.set_name(value),
        ConsoleCommand::Email(value) => controller.set_email(value),
        ConsoleCommand::Edit(id) => {
            if !controller.begin_edit(id) {
                println!("no user with id {id}");
            }
        }
        ConsoleCommand::Cancel => controller.cancel_edit(),
        ConsoleCommand::Submit => match controller.submit().await {
            Ok(SubmitOutcome::Skipped) => println!("name and email are both required"),
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "console: submit failed"),
        },
        ConsoleCommand::Delete(id) => match controller.delete(id, &StdinPrompt).await {
            Ok(DeleteOutcome::NotFound) => println!("no user with id {id}"),
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "console: delete failed"),
        },
        ConsoleCommand::Json => {
            let json = serde_json::to_string_pretty(&controller.state().records)
                .context("failed to serialize user list")?;
            println!("{json}");
            return Ok(true);
        }
        ConsoleCommand::Help => {
            println!("{USAGE}");
            return Ok(true);
        }
        ConsoleCommand::Quit => return Ok(false),
    }

    print!("{}", render_view(&ViewModel::from_snapshot(controller.state())));
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let settings = args.resolve_settings();

    let mut controller = build_controller(&settings, TeardownHandle::new());
    if let Err(err) = controller.load().await {
        tracing::debug!(error = %err, "console: initial load failed");
    }
    print!("{}", render_view(&ViewModel::from_snapshot(controller.state())));
    println!("{USAGE}");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read command")?
            == 0
        {
            break;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}\n{USAGE}");
                continue;
            }
        };
        if !run_command(&mut controller, command).await? {
            break;
        }
    }

    controller.tear_down();
    Ok(())
}
