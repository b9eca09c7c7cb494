//! Runtime configuration read from the environment
//!
//! `.env` is loaded by `main` through dotenvy before [`Config::from_env`] runs.

use std::env;
use std::path::{Path, PathBuf};

use crate::agent::{AgentDirectory, AgentSource};
use crate::error::ConfigError;
use crate::model::PropertyRecord;

#[derive(Debug, Clone)]
pub struct Config {
    /// `PORT`, default 8080
    pub port: u16,
    /// `DATABASE_URL`, path of the redb file, default "leads.db"
    pub database_path: String,
    /// `AGENT_SOURCE`: "from_submission" (default) or "from_static_table"
    pub agent_source: AgentSource,
    /// `AGENT_TABLE_PATH`, JSON agent table
    pub agent_table_path: Option<PathBuf>,
    /// `PROPERTY_CATALOG_PATH`, JSON array of properties seeded at startup
    pub property_catalog_path: Option<PathBuf>,
    /// `WEBHOOK_TOKEN`, required Authorization value for the webhook
    pub webhook_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: "leads.db".to_string(),
            agent_source: AgentSource::default(),
            agent_table_path: None,
            property_catalog_path: None,
            webhook_token: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = match non_empty_var("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value,
            })?,
            None => defaults.port,
        };

        let agent_source = match non_empty_var("AGENT_SOURCE") {
            Some(value) => value.parse::<AgentSource>()?,
            None => defaults.agent_source,
        };

        Ok(Self {
            port,
            database_path: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_path),
            agent_source,
            agent_table_path: non_empty_var("AGENT_TABLE_PATH").map(PathBuf::from),
            property_catalog_path: non_empty_var("PROPERTY_CATALOG_PATH").map(PathBuf::from),
            webhook_token: non_empty_var("WEBHOOK_TOKEN"),
        })
    }

    /// Loads the agent table, or an empty directory when none is configured
    pub fn load_agent_directory(&self) -> Result<AgentDirectory, ConfigError> {
        match &self.agent_table_path {
            Some(path) => AgentDirectory::from_path(path),
            None => {
                if self.agent_source == AgentSource::FromStaticTable {
                    tracing::warn!("AGENT_SOURCE is from_static_table but AGENT_TABLE_PATH is not set");
                }
                Ok(AgentDirectory::default())
            }
        }
    }

    /// Loads the property catalog, if one is configured
    pub fn load_property_catalog(&self) -> Result<Vec<PropertyRecord>, ConfigError> {
        match &self.property_catalog_path {
            Some(path) => read_property_catalog(path),
            None => Ok(Vec::new()),
        }
    }
}

pub fn read_property_catalog(path: &Path) -> Result<Vec<PropertyRecord>, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}
