use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::FetchErrorPolicy;
use crate::service::search::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_CHARS};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/procurement";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
    pub specification: SpecificationConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_statement_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// EnvFilter 指令, 例如 "info,procure_core=debug"
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificationConfig {
    pub on_fetch_error: FetchErrorPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub min_chars: usize,
    pub max_results: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
            },
            log: LogConfig {
                level: "info".to_string(),
            },
            specification: SpecificationConfig {
                on_fetch_error: FetchErrorPolicy::Unfiltered,
            },
            search: SearchConfig {
                min_chars: DEFAULT_MIN_CHARS,
                max_results: DEFAULT_MAX_RESULTS,
            },
        }
    }
}

impl AppConfig {
    /// 加载顺序: 默认值 -> procure.toml (可选) -> PROCURE__* 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Some("procure"))
    }

    pub fn load_from(file: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("database.acquire_timeout_secs", defaults.database.acquire_timeout_secs as i64)?
            .set_default("database.slow_statement_secs", defaults.database.slow_statement_secs as i64)?
            .set_default("log.level", defaults.log.level)?
            .set_default("specification.on_fetch_error", "unfiltered")?
            .set_default("search.min_chars", defaults.search.min_chars as i64)?
            .set_default("search.max_results", defaults.search.max_results as i64)?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("PROCURE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
