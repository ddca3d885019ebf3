//! `blinker simulate`: run one press sequence from the command line.

use std::time::Duration;

use tokio::time::Instant;

use blinker_config::Config;
use blinker_core::SequenceOutcome;

use crate::cli::{Press, SimulateArgs};
use crate::commands::{connect, idle_line};
use crate::error::CliError;

pub async fn handle(args: SimulateArgs, cfg: &Config) -> Result<(), CliError> {
    let blinker = connect(cfg, idle_line()).await?;

    let started = Instant::now();
    let outcome = match args.press {
        Press::Short => blinker.trigger_short_press().await,
        Press::Long => blinker.trigger_long_press().await,
    };
    let elapsed = Duration::from_millis(
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    );

    let label = match args.press {
        Press::Short => "short",
        Press::Long => "long",
    };
    let verdict = match outcome {
        SequenceOutcome::Completed => "completed",
        SequenceOutcome::Escalated => "escalated to alert",
        SequenceOutcome::Cancelled => "cancelled",
        SequenceOutcome::Superseded => "superseded",
        SequenceOutcome::Failed(e) => return Err(e.into()),
    };
    println!(
        "{label} press {verdict} after {}",
        humantime::format_duration(elapsed)
    );

    if !blinker.device().is_connected().await {
        return Err(crate::commands::unreachable(
            &blinker,
            blinker.config().device_url.to_string(),
        ));
    }
    Ok(())
}
