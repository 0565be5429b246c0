//! # Configuration Module
//!
//! Process configuration read from the environment, with `.env.local` taking
//! precedence over `.env`.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_DEV_NAME: &str = "developer_name";
pub const DEFAULT_DEV_USERNAME: &str = "developer_username";
pub const DEFAULT_BOT_USERNAME: &str = "MahallaYordamBot";
pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Number of contacts shown on the "most used" screen
pub const TOP_CONTACTS_LIMIT: i64 = 8;

/// Settings the menu controller needs to make decisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotSettings {
    pub admin_ids: HashSet<i64>,
    pub allowed_group_ids: HashSet<i64>,
    pub dev_name: String,
    pub dev_username: String,
    pub bot_username: String,
}

impl BotSettings {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub fn is_allowed_chat(&self, chat_id: i64) -> bool {
        self.allowed_group_ids.contains(&chat_id)
    }
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
    pub settings: BotSettings,
}

impl Config {
    /// Load `.env.local` or `.env` if present, then read the environment
    pub fn load() -> Result<Self> {
        load_env_file();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, used by `load` and by tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => bail!("{key} environment variable is required"),
            }
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bot_token = required("BOT_TOKEN")?;
        let database_url = required("DATABASE_URL")?;

        let settings = BotSettings {
            admin_ids: parse_id_list("ADMIN_IDS", lookup("ADMIN_IDS").as_deref()),
            allowed_group_ids: parse_id_list(
                "ALLOWED_GROUP_IDS",
                lookup("ALLOWED_GROUP_IDS").as_deref(),
            ),
            dev_name: optional("DEV_NAME", DEFAULT_DEV_NAME),
            dev_username: optional("DEV_USERNAME", DEFAULT_DEV_USERNAME)
                .trim_start_matches('@')
                .to_string(),
            bot_username: optional("BOT_USERNAME", DEFAULT_BOT_USERNAME)
                .trim_start_matches('@')
                .to_string(),
        };

        let db_min_connections = parse_u32(
            "DB_MIN_CONNECTIONS",
            lookup("DB_MIN_CONNECTIONS").as_deref(),
            DEFAULT_MIN_CONNECTIONS,
        );
        let db_max_connections = parse_u32(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS").as_deref(),
            DEFAULT_MAX_CONNECTIONS,
        )
        .max(db_min_connections);

        Ok(Self {
            bot_token,
            database_url,
            db_min_connections,
            db_max_connections,
            settings,
        })
    }

    /// Log a summary without secrets
    pub fn log_summary(&self) {
        let mut groups: Vec<_> = self.settings.allowed_group_ids.iter().collect();
        groups.sort();
        let mut admins: Vec<_> = self.settings.admin_ids.iter().collect();
        admins.sort();

        info!(
            bot = %self.settings.bot_username,
            allowed_groups = ?groups,
            admins = ?admins,
            database_url_present = !self.database_url.is_empty(),
            "Configuration loaded"
        );
    }
}

fn load_env_file() {
    for name in [".env.local", ".env"] {
        if Path::new(name).exists() {
            match dotenv::from_filename(name) {
                Ok(_) => info!(file = name, "Loaded settings from env file"),
                Err(e) => warn!(file = name, error = %e, "Failed to read env file"),
            }
            return;
        }
    }
    warn!("No .env file found, using process environment only");
}

/// Parse a comma separated id list, skipping entries that are not integers
pub fn parse_id_list(key: &str, raw: Option<&str>) -> HashSet<i64> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(key, value = s, "Ignoring malformed id");
                None
            }
        })
        .collect()
}

fn parse_u32(key: &str, raw: Option<&str>, default: u32) -> u32 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value, "Ignoring malformed number, using default");
            default
        }),
    }
}
