use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;

use calsync_core::http::ReqwestTransport;
use calsync_core::lock::SyncLock;
use calsync_core::{SyncConfig, SyncEngine};

use crate::utils::tui::create_spinner;

pub async fn run() -> Result<()> {
    let config = SyncConfig::load()?;
    let data_dir = config.data_path()?;

    let Some(_guard) = SyncLock::new(&data_dir).try_acquire()? else {
        println!("{}", "Another sync is already running, skipping.".yellow());
        return Ok(());
    };

    let spinner = create_spinner("Syncing");
    let engine = SyncEngine::new(config, Arc::new(ReqwestTransport::new()));
    let result = engine.run().await;
    spinner.finish_and_clear();

    let outcome = result?;
    println!(
        "{} {} event(s) to {}",
        "Synced".green(),
        outcome.events,
        outcome.url
    );
    if outcome.merged {
        println!("  merged with the existing remote calendar");
    }

    Ok(())
}
