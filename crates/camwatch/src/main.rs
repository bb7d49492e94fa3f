mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "camwatch", &mut std::io::stdout());
            Ok(())
        }

        Command::Config => {
            let config = config::resolve(&cli.global)?;
            commands::config_cmd::handle(&config, &cli.global)
        }

        // One-shot report: console logging only, quiet unless asked.
        Command::Check(args) => {
            let config = config::resolve(&cli.global)?;
            let _guard = init_tracing(cli.global.verbose, "warn", None);
            commands::check::handle(&config, &args, &cli.global).await
        }

        Command::Run => {
            let config = config::resolve(&cli.global)?;
            let _guard = init_tracing(cli.global.verbose, "info", config.log_file());
            tracing::debug!(config = ?config, "resolved configuration");
            commands::run::handle(&config).await
        }
    }
}

/// Console layer on stderr plus an optional plain-text file layer.
///
/// `RUST_LOG` wins over `-v`. The returned guard must be held until exit so
/// buffered file output is flushed. A log file that cannot be opened is
/// reported once and the daemon continues with console logging.
fn init_tracing(verbosity: u8, default_level: &str, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => default_level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut appender = None;
    let mut file_error = None;
    if let Some(path) = log_file {
        match file_appender(path) {
            Ok(a) => appender = Some(a),
            Err(reason) => file_error = Some((path.display(), reason)),
        }
    }

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    if let Some((path, reason)) = file_error {
        tracing::warn!(log_file = %path, %reason, "file logging disabled, logging to console only");
    }

    guard
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, String> {
    let name = path
        .file_name()
        .ok_or_else(|| "log file path has no file name".to_owned())?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .map_err(|e| e.to_string())
}
