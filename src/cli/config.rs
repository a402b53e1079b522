use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Persistent CLI selection, stored as `env.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub current_server: Option<String>,
    /// Last tenant chosen with `tenant use`, sent as `X-Tenant-Id`
    #[serde(default)]
    pub current_tenant: Option<Uuid>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub last_health: Option<HealthRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub status: ServerStatus,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
}

impl EnvironmentConfig {
    pub fn server_url(&self) -> &str {
        self.current_server.as_deref().unwrap_or(DEFAULT_SERVER)
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CAREFLOW_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("careflow").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    load_environment_config_from(&get_config_dir()?)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    save_environment_config_to(&get_config_dir()?, config)
}

pub fn load_environment_config_from(dir: &Path) -> anyhow::Result<EnvironmentConfig> {
    let env_file = dir.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config_to(dir: &Path, config: &EnvironmentConfig) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(dir.join("env.json"), content)?;
    Ok(())
}
