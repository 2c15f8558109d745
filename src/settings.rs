use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Sqlite {
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct Referral {
    pub link_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub enabled: bool,
    pub url: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub sqlite: Sqlite,
    pub referral: Referral,
    pub snapshot: Snapshot,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        config.try_deserialize()
    }
}
