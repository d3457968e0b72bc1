//! Supported coding agents and where they keep their MCP configuration.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// On-disk format of an agent's MCP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON object with servers under `servers_key`.
    Json { servers_key: &'static str },
    /// TOML document with servers under `[<servers_key>.<name>]`.
    Toml { servers_key: &'static str },
}

impl ConfigFormat {
    pub fn servers_key(&self) -> &'static str {
        match self {
            Self::Json { servers_key } | Self::Toml { servers_key } => servers_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Agent {
    ClaudeCode,
    Cursor,
    VsCode,
    Codex,
    Gemini,
    Junie,
}

impl Agent {
    pub const ALL: [Agent; 6] = [
        Agent::ClaudeCode,
        Agent::Cursor,
        Agent::VsCode,
        Agent::Codex,
        Agent::Gemini,
        Agent::Junie,
    ];

    /// Identifier accepted by `--agent`.
    pub fn id(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::Cursor => "cursor",
            Self::VsCode => "vscode",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Junie => "junie",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::VsCode => "VS Code (Copilot)",
            Self::Codex => "Codex",
            Self::Gemini => "Gemini CLI",
            Self::Junie => "Junie",
        }
    }

    /// Config file location relative to the project root.
    pub fn config_path(&self) -> &'static str {
        match self {
            Self::ClaudeCode => ".mcp.json",
            Self::Cursor => ".cursor/mcp.json",
            Self::VsCode => ".vscode/mcp.json",
            Self::Codex => ".codex/config.toml",
            Self::Gemini => ".gemini/settings.json",
            Self::Junie => ".junie/mcp/mcp.json",
        }
    }

    pub fn config_file(&self, project: &Path) -> PathBuf {
        project.join(self.config_path())
    }

    pub fn config_format(&self) -> ConfigFormat {
        match self {
            Self::VsCode => ConfigFormat::Json {
                servers_key: "servers",
            },
            Self::Codex => ConfigFormat::Toml {
                servers_key: "mcp_servers",
            },
            _ => ConfigFormat::Json {
                servers_key: "mcpServers",
            },
        }
    }

    /// Files or directories whose presence in a project indicates the agent is used there.
    pub fn project_markers(&self) -> &'static [&'static str] {
        match self {
            Self::ClaudeCode => &[".claude", "CLAUDE.md", ".mcp.json"],
            Self::Cursor => &[".cursor", ".cursorrules"],
            Self::VsCode => &[".vscode", ".github/copilot-instructions.md"],
            Self::Codex => &[".codex", "AGENTS.md"],
            Self::Gemini => &[".gemini", "GEMINI.md"],
            Self::Junie => &[".junie"],
        }
    }

    /// Paths under the user's home directory left by an installed agent.
    pub fn home_markers(&self) -> &'static [&'static str] {
        match self {
            Self::ClaudeCode => &[".claude", ".claude.json"],
            Self::Cursor => &[".cursor"],
            Self::VsCode => &[".vscode"],
            Self::Codex => &[".codex"],
            Self::Gemini => &[".gemini"],
            Self::Junie => &[".junie"],
        }
    }

    /// Executable names looked up on `PATH`.
    pub fn executables(&self) -> &'static [&'static str] {
        match self {
            Self::ClaudeCode => &["claude"],
            Self::Cursor => &["cursor"],
            Self::VsCode => &["code", "code-insiders"],
            Self::Codex => &["codex"],
            Self::Gemini => &["gemini"],
            Self::Junie => &["junie"],
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Agent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude-code" | "claude" | "claudecode" => Ok(Self::ClaudeCode),
            "cursor" => Ok(Self::Cursor),
            "vscode" | "vs-code" | "code" | "copilot" => Ok(Self::VsCode),
            "codex" => Ok(Self::Codex),
            "gemini" | "gemini-cli" => Ok(Self::Gemini),
            "junie" => Ok(Self::Junie),
            other => Err(format!(
                "Unknown agent '{}'. Supported: {}",
                other,
                Agent::ALL.map(|a| a.id()).join(", ")
            )),
        }
    }
}
