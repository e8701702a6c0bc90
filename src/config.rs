use std::{env, path::PathBuf, str::FromStr};

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    /// User recorded as the owner of expenses created through the pages.
    pub submitter_user_id: i32,
    /// User recorded as the reviewer when approving or rejecting from the pages.
    pub reviewer_user_id: i32,
    pub receipts_dir: PathBuf,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    pub endpoint: Option<String>,
    pub deployment_name: Option<String>,
}

impl ChatConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.deployment_name.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connect_timeout_secs: 5,
                run_migrations: false,
            },
            submitter_user_id: 1,
            reviewer_user_id: 2,
            receipts_dir: PathBuf::from("static/receipts"),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            database: DatabaseConfig {
                url: get("DATABASE_URL"),
                max_connections: parse_or(
                    "DB_MAX_CONNECTIONS",
                    get("DB_MAX_CONNECTIONS"),
                    defaults.database.max_connections,
                )?,
                connect_timeout_secs: parse_or(
                    "DB_CONNECT_TIMEOUT_SECS",
                    get("DB_CONNECT_TIMEOUT_SECS"),
                    defaults.database.connect_timeout_secs,
                )?,
                run_migrations: parse_or("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), false)?,
            },
            submitter_user_id: parse_or(
                "SUBMITTER_USER_ID",
                get("SUBMITTER_USER_ID"),
                defaults.submitter_user_id,
            )?,
            reviewer_user_id: parse_or(
                "REVIEWER_USER_ID",
                get("REVIEWER_USER_ID"),
                defaults.reviewer_user_id,
            )?,
            receipts_dir: get("RECEIPTS_DIR").map(PathBuf::from).unwrap_or(defaults.receipts_dir),
            chat: ChatConfig {
                endpoint: get("CHAT_ENDPOINT"),
                deployment_name: get("CHAT_DEPLOYMENT_NAME"),
            },
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
