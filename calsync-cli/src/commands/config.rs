use anyhow::Result;
use owo_colors::OwoColorize;

use calsync_core::SyncConfig;
use calsync_core::lock::SyncLock;
use calsync_core::state;

pub fn run() -> Result<()> {
    let config_path = SyncConfig::config_path()?;
    let config = SyncConfig::load()?;
    let data_dir = config.data_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  State:      {}", state::state_path(&data_dir).display());
    println!("  Lock:       {}", SyncLock::new(&data_dir).path().display());

    Ok(())
}
