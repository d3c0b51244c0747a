use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use skugen::sku::INITIAL_CURSOR;
use skugen::{LimitsConfig, StoreConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Durable SQLite database file shared by every server process
    Sqlite,
    /// In-process counter, lost on exit; for local experiments only
    Memory,
}

/// SKU issuing service
#[derive(Debug, Parser)]
#[command(name = "skugen", version, about)]
pub struct Args {
    /// SQLite database path; a `sqlite://` prefix is accepted
    #[arg(long, env = "DATABASE_URL", default_value = "skugen.db")]
    pub database: String,

    #[arg(long, env = "SKUGEN_STORE", value_enum, default_value_t = StoreKind::Sqlite)]
    pub store: StoreKind,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Cursor seed used when the counter is first created
    #[arg(long, env = "SKUGEN_INITIAL_VALUE", default_value_t = INITIAL_CURSOR)]
    pub initial_value: i64,

    /// How long an issue waits for the counter lock before failing
    #[arg(long, env = "SKUGEN_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Skip the issued-code audit table
    #[arg(long, env = "SKUGEN_NO_AUDIT")]
    pub no_audit: bool,

    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Args {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(
            self.database
                .strip_prefix("sqlite://")
                .unwrap_or(&self.database),
        )
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .initial_value(self.initial_value)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .audit(!self.no_audit)
    }

    pub fn limits_config(&self) -> LimitsConfig {
        LimitsConfig::new().request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}
