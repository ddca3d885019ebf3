//! `blinker run`: the long-running controller.

use tokio::sync::watch;
use tracing::{error, info, warn};

use blinker_config::Config;
use blinker_core::{Blinker, HealthSnapshot, HealthStatus};

use crate::cli::RunArgs;
use crate::commands::{button_line, idle_line};
use crate::error::CliError;

pub async fn handle(args: RunArgs, cfg: &Config) -> Result<(), CliError> {
    let runtime = cfg.to_blinker_config()?;
    info!(
        device = %runtime.device_url,
        pin = runtime.gpio_pin,
        mode = %runtime.default_mode,
        "starting blinker"
    );

    let input = if args.no_button {
        idle_line()
    } else {
        button_line(&runtime)?
    };
    let blinker = Blinker::from_config(runtime, input)?;

    if args.no_button {
        blinker.spawn_supervisor().await;
        // Without the button loop nothing else shows the default appearance.
        let app = blinker.clone();
        tokio::spawn(async move {
            if app.device().wait_until_connected().await && !app.apply_default_appearance().await {
                warn!("could not apply default appearance");
            }
        });
    } else {
        blinker.start().await;
    }

    watch_health(blinker.subscribe_health()).await;
    blinker.shutdown().await;
    info!("stopped");
    Ok(())
}

/// Log status transitions until a shutdown signal arrives.
async fn watch_health(mut health: watch::Receiver<HealthSnapshot>) {
    let mut last = health.borrow().status;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => return,
            changed = health.changed() => {
                if changed.is_err() {
                    return;
                }
                let snapshot = health.borrow_and_update().clone();
                if snapshot.status != last {
                    log_transition(last, &snapshot);
                    last = snapshot.status;
                }
            }
        }
    }
}

fn log_transition(from: HealthStatus, snapshot: &HealthSnapshot) {
    let error = snapshot.last_error.as_deref().unwrap_or("");
    match snapshot.status {
        HealthStatus::Critical => error!(
            %from,
            failures = snapshot.consecutive_failures,
            error,
            "device health critical"
        ),
        HealthStatus::Degraded => warn!(%from, error, "device health degraded"),
        status => info!(%from, to = %status, "device health changed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("interrupted"),
        () = terminate => info!("terminated"),
    }
}
