//! Merging an MCP server entry into an agent's config file.
//!
//! Existing content is kept; only `<servers_key>.<name>` is inserted or replaced.

use super::InstallError;
use super::agents::ConfigFormat;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// The launch command an agent runs to start this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEntry {
    /// VS Code requires an explicit transport type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerEntry {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: None,
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Compute new file content, or `None` when the entry is already present as-is.
pub fn render(
    path: &Path,
    existing: Option<&str>,
    format: ConfigFormat,
    name: &str,
    entry: &ServerEntry,
) -> Result<Option<String>, InstallError> {
    let existing = existing.filter(|text| !text.trim().is_empty());
    match format {
        ConfigFormat::Json { servers_key } => merge_json(path, existing, servers_key, name, entry),
        ConfigFormat::Toml { servers_key } => merge_toml(path, existing, servers_key, name, entry),
    }
}

/// Merge `entry` into the file at `path`, creating it when missing.
pub fn write_entry(
    path: &Path,
    format: ConfigFormat,
    name: &str,
    entry: &ServerEntry,
    dry_run: bool,
) -> Result<WriteOutcome, InstallError> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(source) => return Err(InstallError::io(path, source)),
    };

    let Some(content) = render(path, existing.as_deref(), format, name, entry)? else {
        return Ok(WriteOutcome::Unchanged);
    };

    if !dry_run {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| InstallError::io(parent, source))?;
        }
        fs::write(path, content).map_err(|source| InstallError::io(path, source))?;
    }
    Ok(WriteOutcome::Written)
}

fn merge_json(
    path: &Path,
    existing: Option<&str>,
    servers_key: &str,
    name: &str,
    entry: &ServerEntry,
) -> Result<Option<String>, InstallError> {
    let json_err = |source| InstallError::Json {
        path: path.to_path_buf(),
        source,
    };

    let mut root = match existing {
        Some(text) => serde_json::from_str(text).map_err(json_err)?,
        None => JsonValue::Object(Map::new()),
    };
    let value = serde_json::to_value(entry).map_err(json_err)?;

    let servers = root
        .as_object_mut()
        .ok_or_else(|| InstallError::invalid(path, "top level is not a JSON object"))?
        .entry(servers_key)
        .or_insert(JsonValue::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| InstallError::invalid(path, format!("'{}' is not an object", servers_key)))?;

    if servers.get(name) == Some(&value) {
        return Ok(None);
    }
    servers.insert(name.to_string(), value);

    let mut out = serde_json::to_string_pretty(&root).map_err(json_err)?;
    out.push('\n');
    Ok(Some(out))
}

fn merge_toml(
    path: &Path,
    existing: Option<&str>,
    servers_key: &str,
    name: &str,
    entry: &ServerEntry,
) -> Result<Option<String>, InstallError> {
    let ser_err = |source| InstallError::TomlSerialize {
        path: path.to_path_buf(),
        source,
    };

    let mut doc = match existing {
        Some(text) => text
            .parse::<toml::Table>()
            .map_err(|source| InstallError::TomlParse {
                path: path.to_path_buf(),
                source,
            })?,
        None => toml::Table::new(),
    };
    let value = toml::Value::try_from(entry).map_err(ser_err)?;

    let servers = doc
        .entry(servers_key)
        .or_insert(toml::Value::Table(toml::Table::new()))
        .as_table_mut()
        .ok_or_else(|| InstallError::invalid(path, format!("'{}' is not a table", servers_key)))?;

    if servers.get(name) == Some(&value) {
        return Ok(None);
    }
    servers.insert(name.to_string(), value);

    toml::to_string(&doc).map(Some).map_err(ser_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JSON: ConfigFormat = ConfigFormat::Json {
        servers_key: "mcpServers",
    };
    const TOML: ConfigFormat = ConfigFormat::Toml {
        servers_key: "mcp_servers",
    };

    fn entry() -> ServerEntry {
        ServerEntry::new(
            "/usr/local/bin/devtools-mcp-server",
            vec!["--database".to_string(), "sqlite:app.db".to_string()],
        )
    }

    #[test]
    fn test_json_new_file() {
        let out = render(Path::new("x.json"), None, JSON, "devtools", &entry())
            .unwrap()
            .unwrap();
        let value: JsonValue = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value["mcpServers"]["devtools"]["command"],
            "/usr/local/bin/devtools-mcp-server"
        );
        assert_eq!(value["mcpServers"]["devtools"]["args"][1], "sqlite:app.db");
        assert!(value["mcpServers"]["devtools"].get("env").is_none());
        assert!(value["mcpServers"]["devtools"].get("type").is_none());
    }

    #[test]
    fn test_json_preserves_other_keys_and_servers() {
        let existing = r#"{"theme": "dark", "mcpServers": {"other": {"command": "x", "args": []}}}"#;
        let out = render(Path::new("x.json"), Some(existing), JSON, "devtools", &entry())
            .unwrap()
            .unwrap();
        let value: JsonValue = serde_json::from_str(&out).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["mcpServers"]["other"]["command"], "x");
        assert!(value["mcpServers"]["devtools"].is_object());
    }

    #[test]
    fn test_json_unchanged_when_identical() {
        let first = render(Path::new("x.json"), None, JSON, "devtools", &entry())
            .unwrap()
            .unwrap();
        let second = render(Path::new("x.json"), Some(&first), JSON, "devtools", &entry()).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_json_rejects_non_object() {
        let err = render(Path::new("x.json"), Some("[1, 2]"), JSON, "devtools", &entry()).unwrap_err();
        assert!(matches!(err, InstallError::InvalidConfig { .. }));

        let err = render(
            Path::new("x.json"),
            Some(r#"{"mcpServers": "nope"}"#),
            JSON,
            "devtools",
            &entry(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'mcpServers' is not an object"));
    }

    #[test]
    fn test_json_invalid_syntax() {
        let err = render(Path::new("x.json"), Some("{oops"), JSON, "devtools", &entry()).unwrap_err();
        assert!(matches!(err, InstallError::Json { .. }));
    }

    #[test]
    fn test_vscode_entry_has_type() {
        let vscode = ConfigFormat::Json {
            servers_key: "servers",
        };
        let out = render(
            Path::new("mcp.json"),
            None,
            vscode,
            "devtools",
            &entry().with_kind("stdio"),
        )
        .unwrap()
        .unwrap();
        let value: JsonValue = serde_json::from_str(&out).unwrap();
        assert_eq!(value["servers"]["devtools"]["type"], "stdio");
    }

    #[test]
    fn test_toml_merge() {
        let existing = "model = \"o3\"\n\n[mcp_servers.other]\ncommand = \"x\"\nargs = []\n";
        let out = render(Path::new("config.toml"), Some(existing), TOML, "devtools", &entry())
            .unwrap()
            .unwrap();
        let doc: toml::Table = out.parse().unwrap();
        assert_eq!(doc["model"].as_str(), Some("o3"));
        assert_eq!(doc["mcp_servers"]["other"]["command"].as_str(), Some("x"));
        assert_eq!(
            doc["mcp_servers"]["devtools"]["command"].as_str(),
            Some("/usr/local/bin/devtools-mcp-server")
        );

        let again = render(Path::new("config.toml"), Some(&out), TOML, "devtools", &entry()).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_write_entry_creates_parents_and_respects_dry_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cursor").join("mcp.json");

        let outcome = write_entry(&path, JSON, "devtools", &entry(), true).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert!(!path.exists());

        let outcome = write_entry(&path, JSON, "devtools", &entry(), false).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert!(path.exists());

        let outcome = write_entry(&path, JSON, "devtools", &entry(), false).unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged);
    }
}
