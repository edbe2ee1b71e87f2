use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize)]
pub struct Engagement {
    /// Points moved by one transfer
    pub transfer_amount: i64,
    /// Seconds between background plan expiry sweeps, 0 disables the sweep
    pub expiry_sweep_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub engagement: Engagement,
}

/// Environment variables and the settings key each one overrides
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("DATABASE_PATH", "database.path"),
    ("SEED_DEMO_DATA", "database.seed_demo_data"),
    ("TRANSFER_AMOUNT", "engagement.transfer_amount"),
    ("EXPIRY_SWEEP_SECS", "engagement.expiry_sweep_secs"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Build settings with `lookup` standing in for the process environment
    pub fn from_sources<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "chirp.db")?
            .set_default("database.seed_demo_data", false)?
            .set_default("engagement.transfer_amount", 2)?
            .set_default("engagement.expiry_sweep_secs", 3600)?;

        let config_file_name = "settings.toml";

        // Current directory first, then the crate directory during development
        for path in [
            PathBuf::from(config_file_name),
            PathBuf::from("chirp-server").join(config_file_name),
        ] {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        // Environment variables have the highest priority
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.engagement.transfer_amount <= 0 {
            return Err(ConfigError::Message(format!(
                "engagement.transfer_amount must be positive, got {}",
                settings.engagement.transfer_amount
            )));
        }
        Ok(settings)
    }
}
