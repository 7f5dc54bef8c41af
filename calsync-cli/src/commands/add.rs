use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;

use calsync_core::http::ReqwestTransport;
use calsync_core::llm::{self, PARSED_CALENDAR_NAME};
use calsync_core::{SyncConfig, SyncEngine};

use crate::utils::tui::create_spinner;

pub async fn run(text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Nothing to parse. Try: calsync add 组会明天下午三点");
    }

    let config = SyncConfig::load()?;
    let transport = Arc::new(ReqwestTransport::new());

    let spinner = create_spinner("Parsing");
    let result = llm::parse_text(&config, transport.as_ref(), text).await;
    spinner.finish_and_clear();

    let records = result?;
    if records.is_empty() {
        anyhow::bail!("Parsing returned no usable events");
    }

    for record in &records {
        let title = record.title.as_deref().unwrap_or("(untitled)");
        let start = record
            .start
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        match &record.location {
            Some(location) => println!("  {} {} @ {}", start, title.bold(), location),
            None => println!("  {} {}", start, title.bold()),
        }
    }

    let spinner = create_spinner("Uploading");
    let engine = SyncEngine::new(config, transport);
    let result = engine.upload_records(PARSED_CALENDAR_NAME, &records).await;
    spinner.finish_and_clear();

    let outcome = result?;
    println!(
        "{} {} event(s) to {}",
        "Uploaded".green(),
        outcome.events,
        outcome.url
    );

    Ok(())
}
