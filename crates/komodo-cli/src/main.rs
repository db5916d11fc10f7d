//! km - Komodo command line client
//!
//! Usage:
//!   km version                          # Core version
//!   km call read ListStacks '{}'        # Any request by name
//!   km call execute DeployStack '{"stack":"web"}' --wait
//!   km updates                          # Follow the update stream
//!   km terminal exec <server> <term> -- ls -la

mod output;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use komodo_client::KomodoClient;
use komodo_client::api::ApiPath;
use komodo_client::api::terminal::ExecuteTerminalBody;
use komodo_client::config::{ClientConfig, ConfigStore};
use komodo_client::entities::komodo_timestamp;
use komodo_client::maintenance::{MaintenanceWindow, active_windows};
use komodo_client::terminal::TerminalLine;
use komodo_client::ws::UpdateWsOptions;

use crate::output::{print_config, print_maintenance, print_update, print_update_event};

#[derive(Parser)]
#[command(name = "km")]
#[command(about = "Komodo command line client", long_about = None)]
struct Cli {
    /// Config directory (defaults to the user config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the Core version
    Version {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Send any request by name
    ///
    /// The path is one of auth, user, read, write, execute.
    Call {
        path: String,
        /// Request type, eg. ListStacks
        request_type: String,
        /// Request params as JSON
        #[arg(default_value = "{}")]
        params: String,
        /// Poll execute responses until their updates complete
        #[arg(long)]
        wait: bool,
    },

    /// Follow the update websocket until interrupted
    Updates {
        /// Delay before reconnecting, in milliseconds
        #[arg(long)]
        retry_ms: Option<u64>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Wait for an update to complete
    Wait {
        update_id: String,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Server terminals
    Terminal(TerminalArgs),

    /// Check which maintenance windows are active
    ///
    /// The file is JSON: a list of windows, or a server config carrying
    /// `maintenance_windows`.
    Maintenance {
        file: PathBuf,
        /// Timestamp in unix milliseconds (defaults to now)
        #[arg(long)]
        at: Option<i64>,
        /// Timezone for windows that do not set one
        #[arg(long)]
        timezone: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Manage komodo.toml
    Config(ConfigArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct TerminalArgs {
    #[command(subcommand)]
    command: TerminalSubcommand,
}

#[derive(Subcommand)]
enum TerminalSubcommand {
    /// Run a command on a terminal, streaming its output
    ///
    /// Exits with the command's exit code.
    Exec {
        /// Server id or name
        server: String,
        /// Terminal name, created if missing
        terminal: String,
        /// Command line to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration (secrets masked)
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
    /// Set a single key
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so json output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "km=info,komodo_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = match cli.config_dir {
        Some(dir) => ConfigStore::from_paths(dir),
        None => ConfigStore::from_default_dir()?,
    };

    run(cli.command, &store).await
}

async fn run(command: Commands, store: &ConfigStore) -> Result<()> {
    match command {
        Commands::Version { format } => {
            let version = client(store)?.core_version().await?;
            match format {
                OutputFormat::Table => println!("{version}"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "version": version }))
                }
            }
        }
        Commands::Call {
            path,
            request_type,
            params,
            wait,
        } => run_call(store, &path, &request_type, &params, wait).await?,
        Commands::Updates { retry_ms, format } => run_updates(store, retry_ms, format).await?,
        Commands::Wait { update_id, format } => {
            let update = client(store)?.poll_update_until_complete(update_id).await?;
            print_update(&update, format)?;
            if !update.success {
                std::process::exit(1);
            }
        }
        Commands::Terminal(args) => match args.command {
            TerminalSubcommand::Exec {
                server,
                terminal,
                command,
            } => run_terminal_exec(store, server, terminal, command.join(" ")).await?,
        },
        Commands::Maintenance {
            file,
            at,
            timezone,
            format,
        } => run_maintenance(store, &file, at, timezone, format)?,
        Commands::Config(args) => run_config(store, args.command)?,
    }
    Ok(())
}

fn client(store: &ConfigStore) -> Result<KomodoClient> {
    let config = store.load_with_env()?;
    Ok(KomodoClient::from_config(&config)?)
}

async fn run_call(
    store: &ConfigStore,
    path: &str,
    request_type: &str,
    params: &str,
    wait: bool,
) -> Result<()> {
    let path: ApiPath = path.parse()?;
    let params: serde_json::Value =
        serde_json::from_str(params).context("Params must be valid JSON")?;
    let client = client(store)?;
    let response = match (path, wait) {
        (ApiPath::Execute, true) => client.execute_and_poll_raw(request_type, params).await?,
        (_, true) => anyhow::bail!("--wait only applies to execute requests"),
        (path, false) => client.request_raw(path, request_type, params).await?,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_updates(
    store: &ConfigStore,
    retry_ms: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let client = client(store)?;
    let mut options = UpdateWsOptions::default().with_retry_timeout(client.retry_timeout());
    if let Some(ms) = retry_ms {
        options = options.with_retry_timeout(Duration::from_millis(ms));
    }

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut printed = Ok(());
    client
        .subscribe_to_updates(options, |event| {
            if printed.is_ok() {
                printed = print_update_event(&event, format);
            }
        })
        .await;
    printed
}

async fn run_terminal_exec(
    store: &ConfigStore,
    server: String,
    terminal: String,
    command: String,
) -> Result<()> {
    let response = client(store)?
        .execute_terminal_stream(ExecuteTerminalBody {
            server,
            terminal,
            command,
        })
        .await?;

    let mut lines = Box::pin(response.into_terminal_stream());
    let mut exit = None;
    while let Some(line) = lines.next().await {
        match line? {
            TerminalLine::Output(line) => println!("{line}"),
            TerminalLine::Exit(code) => exit = Some(code),
        }
    }

    match exit {
        Some(exit) => {
            if let Some(cwd) = &exit.cwd {
                tracing::debug!(cwd = %cwd, "terminal working directory");
            }
            match exit.exit_code() {
                Some(0) => Ok(()),
                Some(code) => std::process::exit(code),
                None => anyhow::bail!("Unrecognized exit code: {}", exit.code),
            }
        }
        None => {
            tracing::warn!("Terminal stream ended without an exit code");
            Ok(())
        }
    }
}

fn run_maintenance(
    store: &ConfigStore,
    file: &Path,
    at: Option<i64>,
    timezone: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let windows = parse_windows(&content)
        .with_context(|| format!("Failed to parse maintenance windows in {}", file.display()))?;

    let default_timezone = match timezone {
        Some(tz) => tz,
        None => store.load()?.timezone,
    };
    let timestamp = at.unwrap_or_else(komodo_timestamp);
    let active = active_windows(&windows, timestamp, &default_timezone);

    print_maintenance(&windows, &active, timestamp, format)
}

fn parse_windows(content: &str) -> Result<Vec<MaintenanceWindow>> {
    let mut value: serde_json::Value = serde_json::from_str(content)?;
    if let Some(windows) = value.get_mut("maintenance_windows") {
        return Ok(serde_json::from_value(windows.take())?);
    }
    Ok(serde_json::from_value(value)?)
}

fn run_config(store: &ConfigStore, command: ConfigSubcommand) -> Result<()> {
    match command {
        ConfigSubcommand::Show { format } => {
            let config: ClientConfig = store.load_with_env()?;
            print_config(&config, format)?;
        }
        ConfigSubcommand::Set { key, value } => {
            store.set(&key, &value)?;
            println!("✓ Set {key}");
        }
        ConfigSubcommand::Path => println!("{}", store.config_path().display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: &str = r#"{
        "name": "nightly",
        "schedule_type": {"type": "Daily"},
        "hour": 2,
        "minute": 0,
        "duration_minutes": 60
    }"#;

    #[test]
    fn parse_windows_accepts_list() {
        let windows = parse_windows(&format!("[{WINDOW}]")).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].name, "nightly");
    }

    #[test]
    fn parse_windows_accepts_server_config() {
        let windows = parse_windows(&format!(
            r#"{{"address": "https://periphery:8120", "maintenance_windows": [{WINDOW}]}}"#
        ))
        .unwrap();
        assert_eq!(windows[0].hour, 2);
    }

    #[test]
    fn cli_parses_call_wait_flag() {
        let cli = Cli::parse_from(["km", "call", "execute", "DeployStack", "--wait"]);
        match cli.command {
            Commands::Call {
                path,
                params,
                wait,
                ..
            } => {
                assert_eq!(path, "execute");
                assert_eq!(params, "{}");
                assert!(wait);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn cli_parses_trailing_terminal_command() {
        let cli = Cli::parse_from(["km", "terminal", "exec", "srv", "main", "ls", "-la"]);
        match cli.command {
            Commands::Terminal(TerminalArgs {
                command: TerminalSubcommand::Exec { command, .. },
            }) => assert_eq!(command, vec!["ls", "-la"]),
            _ => panic!("expected terminal exec"),
        }
    }
}
