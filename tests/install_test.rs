//! Integration tests for writing agent MCP configuration.

use devtools_mcp_server::install::{
    Agent, AgentOutcome, InstallError, InstallOptions, Installer, SystemEnv,
};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn options(project: &Path, agents: Vec<Agent>, dry_run: bool) -> InstallOptions {
    InstallOptions {
        project: project.to_path_buf(),
        agents,
        server_name: "devtools".to_string(),
        command: "/usr/local/bin/devtools-mcp-server".to_string(),
        args: vec![
            "--database".to_string(),
            "mysql://root@localhost/wp?prefix=wp_".to_string(),
        ],
        dry_run,
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_every_agent_gets_a_config() {
    let project = TempDir::new().unwrap();
    let report = Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), Agent::ALL.to_vec(), false))
        .unwrap();

    assert_eq!(report.written_count(), Agent::ALL.len());
    for agent in Agent::ALL {
        assert!(
            agent.config_file(project.path()).exists(),
            "{} config missing",
            agent
        );
    }

    let claude = read_json(&project.path().join(".mcp.json"));
    assert_eq!(
        claude["mcpServers"]["devtools"]["args"][1],
        "mysql://root@localhost/wp?prefix=wp_"
    );
    let vscode = read_json(&project.path().join(".vscode/mcp.json"));
    assert_eq!(vscode["servers"]["devtools"]["type"], "stdio");
}

#[test]
fn test_existing_config_is_merged() {
    let project = TempDir::new().unwrap();
    let gemini_dir = project.path().join(".gemini");
    fs::create_dir(&gemini_dir).unwrap();
    fs::write(
        gemini_dir.join("settings.json"),
        r#"{"theme": "GitHub", "mcpServers": {"search": {"command": "search-mcp"}}}"#,
    )
    .unwrap();

    let report = Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), vec![], false))
        .unwrap();
    assert_eq!(report.agents.len(), 1);
    assert_eq!(report.agents[0].agent, Agent::Gemini);

    let settings = read_json(&gemini_dir.join("settings.json"));
    assert_eq!(settings["theme"], "GitHub");
    assert_eq!(settings["mcpServers"]["search"]["command"], "search-mcp");
    assert_eq!(
        settings["mcpServers"]["devtools"]["command"],
        "/usr/local/bin/devtools-mcp-server"
    );
}

#[test]
fn test_codex_toml_is_merged() {
    let project = TempDir::new().unwrap();
    let codex_dir = project.path().join(".codex");
    fs::create_dir(&codex_dir).unwrap();
    fs::write(codex_dir.join("config.toml"), "model = \"gpt-5\"\n").unwrap();

    Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), vec![Agent::Codex], false))
        .unwrap();

    let doc: toml::Table = fs::read_to_string(codex_dir.join("config.toml"))
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(doc["model"].as_str(), Some("gpt-5"));
    assert_eq!(
        doc["mcp_servers"]["devtools"]["args"][0].as_str(),
        Some("--database")
    );
}

#[test]
fn test_dry_run_writes_nothing() {
    let project = TempDir::new().unwrap();
    let report = Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), vec![Agent::Cursor, Agent::Junie], true))
        .unwrap();

    assert!(report.dry_run);
    assert!(report.agents.iter().all(|r| r.outcome == AgentOutcome::Written));
    assert!(!project.path().join(".cursor").exists());
    assert!(!project.path().join(".junie").exists());
}

#[test]
fn test_home_detection() {
    let project = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    fs::create_dir(home.path().join(".claude")).unwrap();

    let env = SystemEnv {
        home: Some(home.path().to_path_buf()),
        path_dirs: vec![],
    };
    let report = Installer::new(env)
        .install(&options(project.path(), vec![], false))
        .unwrap();

    assert_eq!(report.agents.len(), 1);
    assert_eq!(report.agents[0].agent, Agent::ClaudeCode);
    assert!(project.path().join(".mcp.json").exists());
}

#[test]
fn test_no_agents_detected() {
    let project = TempDir::new().unwrap();
    let err = Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), vec![], false))
        .unwrap_err();
    assert!(matches!(err, InstallError::NoAgentsDetected(_)));
    assert!(err.to_string().contains("--agent"));
}

#[test]
fn test_report_serializes() {
    let project = TempDir::new().unwrap();
    let report = Installer::new(SystemEnv::isolated())
        .install(&options(project.path(), vec![Agent::Cursor], false))
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["agents"][0]["agent"], "cursor");
    assert_eq!(value["agents"][0]["status"], "written");
    assert!(value["agents"][0].get("detection").is_none());
}
