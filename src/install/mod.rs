//! Installs this server into the MCP configuration of coding agents.
//!
//! - `agents`: supported agents, config locations and formats
//! - `detect`: project, home-directory and `PATH` detection
//! - `writer`: JSON/TOML merging of the server entry

pub mod agents;
pub mod detect;
pub mod writer;

pub use agents::{Agent, ConfigFormat};
pub use detect::{Detection, SystemEnv, detect, detect_all};
pub use writer::{ServerEntry, WriteOutcome, write_entry};

use crate::config::InstallArgs;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Installer errors.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML in {}: {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write TOML for {}: {source}", path.display())]
    TomlSerialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Unexpected structure in {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    #[error("{0}")]
    UnknownAgent(String),

    #[error("Project directory does not exist: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("No supported coding agents detected in {}. Use --agent to pick one", .0.display())]
    NoAgentsDetected(PathBuf),

    #[error("Cannot determine the server executable: {0}")]
    CurrentExe(#[source] std::io::Error),
}

impl InstallError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub project: PathBuf,
    /// Agents to configure; empty means every detected agent.
    pub agents: Vec<Agent>,
    pub server_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub dry_run: bool,
}

impl InstallOptions {
    /// Build options from the `install` subcommand. The command defaults to this executable.
    pub fn from_args(args: &InstallArgs) -> Result<Self, InstallError> {
        let project = match &args.project {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| InstallError::io(Path::new("."), e))?,
        };
        let agents = args
            .agents
            .iter()
            .map(|name| name.parse::<Agent>().map_err(InstallError::UnknownAgent))
            .collect::<Result<Vec<_>, _>>()?;
        let command = match &args.command {
            Some(cmd) => cmd.clone(),
            None => std::env::current_exe()
                .map_err(InstallError::CurrentExe)?
                .display()
                .to_string(),
        };

        Ok(Self {
            project,
            agents,
            server_name: args.name.clone(),
            command,
            args: args.server_args.clone(),
            dry_run: args.dry_run,
        })
    }

    fn entry_for(&self, agent: Agent) -> ServerEntry {
        let entry = ServerEntry::new(&self.command, self.args.clone());
        match agent {
            Agent::VsCode => entry.with_kind("stdio"),
            _ => entry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Written,
    Unchanged,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub agent: Agent,
    pub path: PathBuf,
    /// How the agent was found; `None` when requested explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<Detection>,
    #[serde(flatten)]
    pub outcome: AgentOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub dry_run: bool,
    pub agents: Vec<AgentReport>,
}

impl InstallReport {
    pub fn written_count(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::Written))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, pred: impl Fn(&AgentOutcome) -> bool) -> usize {
        self.agents.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Detects agents and writes their MCP configuration.
#[derive(Debug, Clone)]
pub struct Installer {
    env: SystemEnv,
}

impl Installer {
    pub fn new(env: SystemEnv) -> Self {
        Self { env }
    }

    pub fn from_process() -> Self {
        Self::new(SystemEnv::from_process())
    }

    /// Configure each agent; one agent failing does not stop the others.
    pub fn install(&self, options: &InstallOptions) -> Result<InstallReport, InstallError> {
        if !options.project.is_dir() {
            return Err(InstallError::ProjectNotFound(options.project.clone()));
        }

        let targets: Vec<(Agent, Option<Detection>)> = if options.agents.is_empty() {
            let detected = detect_all(&options.project, &self.env);
            if detected.is_empty() {
                return Err(InstallError::NoAgentsDetected(options.project.clone()));
            }
            detected.into_iter().map(|(a, d)| (a, Some(d))).collect()
        } else {
            let mut agents = options.agents.clone();
            agents.sort();
            agents.dedup();
            agents.into_iter().map(|a| (a, None)).collect()
        };

        let mut reports = Vec::with_capacity(targets.len());
        for (agent, detection) in targets {
            let path = agent.config_file(&options.project);
            let outcome = match write_entry(
                &path,
                agent.config_format(),
                &options.server_name,
                &options.entry_for(agent),
                options.dry_run,
            ) {
                Ok(WriteOutcome::Written) => {
                    info!(agent = %agent, path = %path.display(), dry_run = options.dry_run, "Configured agent");
                    AgentOutcome::Written
                }
                Ok(WriteOutcome::Unchanged) => {
                    info!(agent = %agent, path = %path.display(), "Agent already configured");
                    AgentOutcome::Unchanged
                }
                Err(e) => {
                    warn!(agent = %agent, path = %path.display(), error = %e, "Failed to configure agent");
                    AgentOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(AgentReport {
                agent,
                path,
                detection,
                outcome,
            });
        }

        Ok(InstallReport {
            dry_run: options.dry_run,
            agents: reports,
        })
    }
}
