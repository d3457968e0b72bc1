//! Agent detection.
//!
//! An agent counts as present when one of its markers exists in the project
//! (checked first), under the home directory, or when its executable is on `PATH`.

use super::agents::Agent;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an agent was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Detection {
    Project(PathBuf),
    Home(PathBuf),
    Executable(PathBuf),
}

impl Detection {
    pub fn path(&self) -> &Path {
        match self {
            Self::Project(p) | Self::Home(p) | Self::Executable(p) => p,
        }
    }
}

/// The parts of the process environment detection reads.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv {
    pub home: Option<PathBuf>,
    pub path_dirs: Vec<PathBuf>,
}

impl SystemEnv {
    pub fn from_process() -> Self {
        let home = dirs::home_dir();
        let path_dirs = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self { home, path_dirs }
    }

    /// An environment with no home directory and an empty `PATH`.
    pub fn isolated() -> Self {
        Self::default()
    }

    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let candidates: Vec<OsString> = if cfg!(windows) {
            vec![format!("{name}.exe").into(), format!("{name}.cmd").into()]
        } else {
            vec![name.into()]
        };

        self.path_dirs.iter().find_map(|dir| {
            candidates
                .iter()
                .map(|c| dir.join(c))
                .find(|candidate| candidate.is_file())
        })
    }
}

pub fn detect(agent: Agent, project: &Path, env: &SystemEnv) -> Option<Detection> {
    let found = agent
        .project_markers()
        .iter()
        .map(|m| project.join(m))
        .find(|p| p.exists())
        .map(Detection::Project)
        .or_else(|| {
            let home = env.home.as_ref()?;
            agent
                .home_markers()
                .iter()
                .map(|m| home.join(m))
                .find(|p| p.exists())
                .map(Detection::Home)
        })
        .or_else(|| {
            agent
                .executables()
                .iter()
                .find_map(|exe| env.find_executable(exe))
                .map(Detection::Executable)
        });

    debug!(agent = %agent, found = ?found, "Agent detection");
    found
}

/// Every supported agent that is present, in `Agent::ALL` order.
pub fn detect_all(project: &Path, env: &SystemEnv) -> Vec<(Agent, Detection)> {
    Agent::ALL
        .into_iter()
        .filter_map(|agent| detect(agent, project, env).map(|d| (agent, d)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_process_uses_home_dir() {
        let env = SystemEnv::from_process();
        assert_eq!(env.home, dirs::home_dir());
    }

    #[test]
    fn test_nothing_detected_in_empty_project() {
        let project = TempDir::new().unwrap();
        assert!(detect_all(project.path(), &SystemEnv::isolated()).is_empty());
    }

    #[test]
    fn test_project_markers() {
        let project = TempDir::new().unwrap();
        fs::create_dir(project.path().join(".cursor")).unwrap();
        fs::write(project.path().join("CLAUDE.md"), "# notes").unwrap();

        let found = detect_all(project.path(), &SystemEnv::isolated());
        let agents: Vec<Agent> = found.iter().map(|(a, _)| *a).collect();
        assert_eq!(agents, vec![Agent::ClaudeCode, Agent::Cursor]);
        assert_eq!(
            found[0].1,
            Detection::Project(project.path().join("CLAUDE.md"))
        );
    }

    #[test]
    fn test_home_markers() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join(".gemini")).unwrap();

        let env = SystemEnv {
            home: Some(home.path().to_path_buf()),
            path_dirs: vec![],
        };
        assert_eq!(
            detect(Agent::Gemini, project.path(), &env),
            Some(Detection::Home(home.path().join(".gemini")))
        );
        assert_eq!(detect(Agent::Junie, project.path(), &env), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_on_path() {
        let project = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        fs::write(bin.path().join("codex"), "#!/bin/sh\n").unwrap();

        let env = SystemEnv {
            home: None,
            path_dirs: vec![bin.path().to_path_buf()],
        };
        let detection = detect(Agent::Codex, project.path(), &env).unwrap();
        assert_eq!(detection.path(), bin.path().join("codex"));
    }

    #[test]
    fn test_project_takes_precedence_over_home() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::create_dir(project.path().join(".junie")).unwrap();
        fs::create_dir(home.path().join(".junie")).unwrap();

        let env = SystemEnv {
            home: Some(home.path().to_path_buf()),
            path_dirs: vec![],
        };
        assert!(matches!(
            detect(Agent::Junie, project.path(), &env),
            Some(Detection::Project(_))
        ));
    }
}
