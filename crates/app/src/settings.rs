//! Settings for the sync daemon.
//!
//! Read from `settings.toml` in the working directory when present, then
//! overridden by `BUDGETSYNC__<SECTION>__<KEY>` environment variables.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_max_concurrent_users")]
    pub max_concurrent_users: usize,
    #[serde(default = "default_max_concurrent_budgets")]
    pub max_concurrent_budgets: usize,
    #[serde(default = "default_min_sync_interval_mins")]
    pub min_sync_interval_mins: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            max_concurrent_users: default_max_concurrent_users(),
            max_concurrent_budgets: default_max_concurrent_budgets(),
            min_sync_interval_mins: default_min_sync_interval_mins(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: Ledger,
    #[serde(default)]
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("BUDGETSYNC").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.ynab.com/v1".to_string()
}

fn default_token_url() -> String {
    "https://app.ynab.com/oauth/token".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    300
}

fn default_batch_size() -> u64 {
    100
}

fn default_max_concurrent_users() -> usize {
    8
}

fn default_max_concurrent_budgets() -> usize {
    4
}

fn default_min_sync_interval_mins() -> i64 {
    60
}
