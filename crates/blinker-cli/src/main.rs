mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use blinker_config::{Config, LoggingSection};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A broken config file is reported before any logging is set up.
    let cfg = match config::load(&cli.global) {
        Ok(cfg) => cfg,
        Err(err) => exit_with(err),
    };

    // The long-running service logs at info by default; one-shot commands stay quiet.
    let floor = u8::from(matches!(cli.command, Command::Run(_)));
    let _guard = init_tracing(cli.global.verbose.max(floor), &cfg.logging);

    if let Err(err) = run(cli, cfg).await {
        exit_with(err);
    }
}

fn exit_with(err: CliError) -> ! {
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    std::process::exit(code);
}

/// Console output on stderr plus an optional daily-rotated log file.
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits.
fn init_tracing(verbosity: u8, logging: &LoggingSection) -> Option<WorkerGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if logging.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    let mut guard = None;
    if let Some(ref path) = logging.file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let prefix = path
            .file_name()
            .map_or_else(|| "blinker.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = tracing_appender::rolling::daily(dir, prefix);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        if logging.json {
            layers.push(layer.json().boxed());
        } else {
            layers.push(layer.boxed());
        }
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    guard
}

async fn run(cli: Cli, cfg: Config) -> Result<(), CliError> {
    tracing::debug!(command = ?cli.command, "dispatching command");
    match cli.command {
        // Config commands never touch the device
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, &cfg),
        Command::Run(args) => commands::run::handle(args, &cfg).await,
        Command::Simulate(args) => commands::simulate::handle(args, &cfg).await,
        Command::Effects(args) => commands::effects::handle(args, &cfg).await,
        Command::Health => commands::health::handle(&cfg).await,
    }
}
