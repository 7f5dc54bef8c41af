use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;

use calsync_core::SyncConfig;
use calsync_core::state;

pub fn run() -> Result<()> {
    let config = SyncConfig::load()?;
    let data_dir = config.data_path()?;
    let state = state::load_state(&data_dir)?;

    println!("{}", "Last sync".bold());
    match state.last_sync {
        Some(at) => {
            let age = Utc::now().signed_duration_since(at);
            let age = std::time::Duration::from_secs(age.num_seconds().max(0) as u64);
            println!("  {} ago", humantime::format_duration(age));
        }
        None => println!("  never"),
    }

    println!();
    println!("{}", "Remote store".bold());
    println!("  URL:        {}", config.remote_base_url);
    println!("  Username:   {}", config.remote_username);

    println!();
    println!("{}", "Sync".bold());
    println!(
        "  Interval:   every {} minute(s)",
        config.auto_sync_minutes.max(1)
    );
    println!("  Window:     {} day(s) each way", config.date_window_days);

    println!();
    println!("{}", "Text parsing".bold());
    if config.llm_api_key.is_empty() {
        println!("  not configured (set llm_api_key)");
    } else {
        println!("  Provider:   {}", config.llm_provider);
    }

    Ok(())
}
