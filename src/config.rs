//! Server configuration
//!
//! Every setting has a command-line flag and an environment variable; the
//! binary loads `.env` before parsing, so either works.

use clap::Parser;
use std::time::Duration;

use crate::database::DatabaseConfig;
use crate::query::QueryLimits;

/// Read-only BI dashboard API server
#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard_server")]
#[command(about = "Serve filter options, KPIs and chart series for the BI dashboard")]
pub struct ServerConfig {
    /// SQLite database holding the analytical tables
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data/dashboard.db")]
    pub database_url: String,

    /// Maximum pooled connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pub pool_size: u32,

    /// Address to listen on
    #[arg(long, env = "DASHBOARD_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, short = 'p', env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Upper bound on rows returned by any data or chart request
    #[arg(long, env = "DATA_LIMIT_MAX", default_value_t = 150_000)]
    pub data_limit_max: u32,

    /// Distinct values listed per filter column
    #[arg(long, env = "FILTER_OPTIONS_LIMIT", default_value_t = 500)]
    pub filter_options_limit: u32,

    /// Open the database read-write (the API itself never writes)
    #[arg(long)]
    pub writable: bool,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_rows: self.data_limit_max.max(1),
            filter_options: self.filter_options_limit.max(1),
        }
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            database_url: self.database_url.clone(),
            max_connections: self.pool_size.max(1),
            connection_timeout: Duration::from_secs(30),
            read_only: !self.writable,
            ..DatabaseConfig::default()
        }
    }
}
