use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use joinwatch_io::Automation;
use joinwatch_types::WatchEvent;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod controller;
mod events;
mod io;
mod maintenance;
mod profile;
mod scheduler;
mod state;
mod status;

#[cfg(test)]
mod tests;

use self::controller::AppController;
use self::events::handle_event;
use self::io::{build_automation, build_capture, build_engines};
use self::profile::load_config;
use self::scheduler::CycleReport;
use self::state::AppState;
use self::status::StatusSnapshot;

/// Watches a grid of screen regions for join announcements
#[derive(Parser, Debug)]
#[command(name = "joinwatch", version, about)]
struct Args {
    /// Config or profile JSON, defaults to ./joinwatch.json when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines, implied when stdout is not a terminal
    #[arg(long)]
    json_logs: bool,

    /// Run a single scan cycle, print the report and exit
    #[arg(long)]
    once: bool,
}

#[derive(Serialize)]
struct OnceReport {
    report: CycleReport,
    status: StatusSnapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_tracing(args.json_logs || !atty::is(atty::Stream::Stdout));

    let config = load_config(args.config.as_deref())?;
    config.validate()?;

    let capture = build_capture(&config.capture)?;
    let engines = build_engines(&config.ocr)?;
    let automation = build_automation(&config.automation)?;

    let state = Arc::new(AppState::new(config, capture, engines)?);
    let regions = state.rebuild_layout().await?;

    let controller = AppController::new(state.clone());
    let _ = controller
        .sender()
        .try_send(WatchEvent::LayoutRebuilt { regions });

    if args.once {
        return run_once(&controller, &state, automation.as_ref()).await;
    }

    let mut tasks = controller.spawn_tasks(automation);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl+c: {e}");
            }
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::warn!("A task exited early"),
                Ok(Err(e)) => tracing::error!("A task failed: {e:#}"),
                Err(e) => tracing::error!("A task panicked: {e}"),
            }
        }
    }

    controller.shutdown();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Task failed during shutdown: {e:#}"),
            Err(e) => tracing::error!("Task panicked during shutdown: {e}"),
        }
    }

    StatusSnapshot::collect(&state).log();
    Ok(())
}

/// One cycle, queued events dispatched inline, JSON summary on stdout
async fn run_once(
    controller: &AppController,
    state: &AppState,
    automation: &dyn Automation,
) -> anyhow::Result<()> {
    let report = controller.scheduler().run_cycle().await;

    let rx = controller.receiver();
    while let Ok(Some(event)) = rx.try_recv() {
        handle_event(automation, event).await;
    }

    let once = OnceReport {
        report,
        status: StatusSnapshot::collect(state),
    };
    println!("{}", serde_json::to_string_pretty(&once)?);

    controller.shutdown();
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
