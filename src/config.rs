use std::env;
use anyhow::{bail, Context, Result};

pub const DEFAULT_TABLE_NAME: &str = "items";

// Env vars are process-wide; tests that touch them hold this lock.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Debug, Clone, PartialEq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    fn from_env() -> Result<Self> {
        let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        Ok(SpannerConfig {
            emulator_host,
            project,
            instance,
            database,
        })
    }

    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

/// Which item store backs the router
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Spanner(SpannerConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub table_name: String,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "spanner".to_string())
            .as_str()
        {
            "spanner" => StoreBackend::Spanner(SpannerConfig::from_env()?),
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be one of: spanner, memory, got '{}'", other),
        };

        let table_name = env::var("TABLE_NAME")
            .unwrap_or_else(|_| DEFAULT_TABLE_NAME.to_string());

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            store_backend,
            table_name,
            service_port,
            service_host,
        })
    }

    /// Config for the in-memory store
    #[cfg(test)]
    pub fn in_memory(table_name: impl Into<String>) -> Self {
        Config {
            store_backend: StoreBackend::Memory,
            table_name: table_name.into(),
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
        }
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.store_backend {
            StoreBackend::Spanner(spanner) => {
                tracing::info!("  Store backend: spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner project: {}", spanner.project);
                tracing::info!("  Spanner instance: {}", spanner.instance);
                tracing::info!("  Spanner database: {}", spanner.database);
            }
            StoreBackend::Memory => tracing::info!("  Store backend: memory"),
        }
        tracing::info!("  Table: {}", self.table_name);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}
