use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DispatchSettings {
    pub timezone: Tz,
    pub interval_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Muscat,
            interval_secs: 300,
        }
    }
}

impl DispatchSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(60))
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://streak_master.db".to_owned(),
            max_connections: 5,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PushSettings {
    pub endpoint: String,
    pub server_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://fcm.googleapis.com/fcm/send".to_owned(),
            server_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub dispatch: DispatchSettings,
    pub database: DatabaseSettings,
    pub push: PushSettings,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
