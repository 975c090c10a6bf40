use fairdraw_core::RaffleConfig;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "raffle.json";

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fairdraw")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Saved raffle config, or the defaults when none has been written yet.
pub async fn load_or_default(data_dir: &Path) -> anyhow::Result<RaffleConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(RaffleConfig::default());
    }
    Ok(RaffleConfig::load(&path).await?)
}
