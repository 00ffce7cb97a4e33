//! Pomodoro Timer CLI
//!
//! A crash-safe Pomodoro timer:
//! - `pomodoro daemon` owns the timer and persists every change
//! - every other subcommand talks to the daemon over a Unix socket
//! - 25 minutes of work, 5 minute short breaks, a 15 minute long break
//!   after every 4 work sessions (all configurable)

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};

use pomodoro_keeper::cli::{Cli, Commands, Display, IpcClient, SettingsArgs, StatsRange};
use pomodoro_keeper::daemon::{self, DaemonConfig};
use pomodoro_keeper::store::default_data_dir;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins unless `--verbose` is given. The daemon defaults to
/// `info`, everything else to `warn`.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match cli.command {
        Some(Commands::Daemon(_)) => "info",
        _ => "warn",
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolves `--data-dir` / `POMODORO_KEEPER_DIR` / `~/.pomodoro-keeper`.
fn data_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(default_data_dir()?),
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Daemon(args) => {
            let config = DaemonConfig::new(data_dir(&cli)?)
                .with_sounds_dir(args.sounds_dir)
                .with_no_sound(args.no_sound)
                .with_no_notify(args.no_notify);
            daemon::run(config).await?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
        command => {
            let client = IpcClient::for_data_dir(&data_dir(&cli)?);
            execute_remote(&client, command).await?;
        }
    }

    Ok(())
}

/// Executes a command against the running daemon.
async fn execute_remote(client: &IpcClient, command: Commands) -> Result<()> {
    match command {
        Commands::Toggle => Display::show_command_result(&client.toggle().await?),
        Commands::Start => Display::show_command_result(&client.start().await?),
        Commands::Stop => Display::show_command_result(&client.stop().await?),
        Commands::Skip => Display::show_command_result(&client.skip().await?),
        Commands::Reset => Display::show_command_result(&client.reset().await?),
        Commands::Extend { seconds } => {
            Display::show_command_result(&client.extend(seconds).await?);
        }
        Commands::Mode { mode } => Display::show_command_result(&client.set_mode(mode).await?),
        Commands::SetTime { mode, minutes } => {
            Display::show_command_result(&client.set_custom_time(mode, minutes).await?);
        }
        Commands::Settings(args) => execute_settings(client, &args).await?,
        Commands::Status { title } => {
            let response = client.status().await?;
            if title {
                Display::show_title(&response);
            } else {
                Display::show_status(&response);
            }
        }
        Commands::Stats { range } => {
            let query = range
                .unwrap_or(StatsRange::Today)
                .to_query(Local::now().date_naive());
            let response = client.stats(query).await?;
            let stats = response.data.and_then(|data| data.stats).unwrap_or_default();
            Display::show_stats(&stats);
        }
        Commands::Idle { signal } => Display::show_command_result(&client.idle(signal).await?),
        Commands::Daemon(_) | Commands::Completions { .. } => {
            anyhow::bail!("このコマンドはDaemonに送信できません");
        }
    }

    Ok(())
}

/// Shows the settings, or applies the given flags on top of them.
async fn execute_settings(client: &IpcClient, args: &SettingsArgs) -> Result<()> {
    let current = client
        .status()
        .await?
        .data
        .and_then(|data| data.settings)
        .unwrap_or_default();

    if args.is_empty() {
        Display::show_settings(&current);
        return Ok(());
    }

    let response = client.update_settings(args.apply(current)).await?;
    Display::show_command_result(&response);
    if let Some(settings) = response.data.and_then(|data| data.settings) {
        Display::show_settings(&settings);
    }
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
