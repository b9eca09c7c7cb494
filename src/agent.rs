//! Agent assignment
//!
//! A lead is attributed to a sales agent either from the submission itself or
//! from a per-project table loaded from configuration. The policy is picked
//! once at startup through [`AgentSource`].

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::{AgentAssignment, Submission};

/// Sentinel used for every field of an unresolved agent
pub const UNKNOWN_AGENT: &str = "unknown";

/// Where the agent of a new lead comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentSource {
    /// `currentAgent` / `currentAgentId` from the submission
    #[default]
    FromSubmission,
    /// The per-project [`AgentDirectory`]
    FromStaticTable,
}

impl FromStr for AgentSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "from_submission" | "submission" => Ok(AgentSource::FromSubmission),
            "from_static_table" | "static_table" | "table" => Ok(AgentSource::FromStaticTable),
            _ => Err(ConfigError::InvalidValue {
                key: "AGENT_SOURCE",
                value: value.to_string(),
            }),
        }
    }
}

fn unknown_agent() -> AgentAssignment {
    AgentAssignment {
        id: UNKNOWN_AGENT.to_string(),
        name: UNKNOWN_AGENT.to_string(),
        email: UNKNOWN_AGENT.to_string(),
    }
}

#[derive(Deserialize)]
struct AgentTableFile {
    #[serde(default = "unknown_agent")]
    default: AgentAssignment,
    #[serde(default)]
    projects: HashMap<String, AgentAssignment>,
}

/// Read-only project name -> agent mapping
///
/// Project names are matched case-insensitively.
///
/// # File format
/// ```json
/// {
///   "default": { "id": "unknown", "name": "unknown", "email": "leads@example.com" },
///   "projects": {
///     "Sattva Aeropolis": { "id": "agent003", "name": "priya", "email": "priya@example.com" }
///   }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentDirectory {
    default: AgentAssignment,
    projects: HashMap<String, AgentAssignment>,
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self {
            default: unknown_agent(),
            projects: HashMap::new(),
        }
    }
}

impl AgentDirectory {
    pub fn new(
        default: AgentAssignment,
        projects: impl IntoIterator<Item = (String, AgentAssignment)>,
    ) -> Self {
        let projects = projects
            .into_iter()
            .map(|(name, agent)| (name.trim().to_lowercase(), agent))
            .collect();
        Self { default, projects }
    }

    /// Loads the directory from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let file: AgentTableFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        Ok(Self::new(file.default, file.projects))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Agent for a project, or the default sentinel when the project is unknown
    pub fn lookup(&self, project_name: Option<&str>) -> AgentAssignment {
        project_name
            .map(|name| name.trim().to_lowercase())
            .and_then(|name| self.projects.get(&name))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Resolves the agent for a submission under the given policy
pub fn resolve_agent(
    source: AgentSource,
    directory: &AgentDirectory,
    submission: &Submission,
) -> AgentAssignment {
    match source {
        AgentSource::FromSubmission => {
            let non_empty = |value: &Option<String>| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            AgentAssignment {
                id: non_empty(&submission.current_agent_id)
                    .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                name: non_empty(&submission.current_agent)
                    .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                email: UNKNOWN_AGENT.to_string(),
            }
        }
        AgentSource::FromStaticTable => directory.lookup(submission.project_name.as_deref()),
    }
}
