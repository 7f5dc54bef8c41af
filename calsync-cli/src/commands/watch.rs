use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use calsync_core::http::ReqwestTransport;
use calsync_core::{Scheduler, SchedulerEvent, SyncConfig};

use crate::notify;

pub async fn run() -> Result<()> {
    let config_path = SyncConfig::config_path()?;
    let config = SyncConfig::load()?;
    let notifications = config.notifications_enabled;
    let interval = config.auto_sync_minutes.max(1);

    let transport = Arc::new(ReqwestTransport::new());
    let (scheduler, handle) = Scheduler::new(config, transport);
    let scheduler = scheduler.reload_from(config_path);

    let mut events = handle.subscribe();
    tokio::spawn(scheduler.run());

    println!("Watching. Syncing every {interval} minute(s); Ctrl-C to stop.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => render_event(&event, notifications),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped.");
                break;
            }
        }
    }

    Ok(())
}

fn render_event(event: &SchedulerEvent, notifications: bool) {
    let stamp = Local::now().format("%H:%M:%S");
    match event {
        SchedulerEvent::Started(trigger) => {
            println!("[{stamp}] sync started ({})", trigger.as_str());
        }
        SchedulerEvent::Completed(outcome) => {
            println!(
                "[{stamp}] {} {} event(s) to {}",
                "synced".green(),
                outcome.events,
                outcome.calendar
            );
            if notifications {
                notify::send(
                    "Calendar synced",
                    &format!(
                        "{} event(s) uploaded to {}",
                        outcome.events, outcome.calendar
                    ),
                );
            }
        }
        SchedulerEvent::Failed(message) => {
            println!("[{stamp}] {} {message}", "sync failed:".red());
            if notifications {
                notify::send("Calendar sync failed", message);
            }
        }
        SchedulerEvent::Skipped => {
            println!("[{stamp}] skipped, another sync is running");
        }
    }
}
