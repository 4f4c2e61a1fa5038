//! Server configuration, loaded from a TOML context file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ListenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database and any future artifacts.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Listen address; the CLI flag overrides this.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    /// Resolve a context name to a config path.
    ///
    /// A bare name maps to `/etc/labdent/<name>.toml`; anything containing
    /// a `/` or `.` is treated as a path directly.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/labdent/{name_or_path}.toml"))
        }
    }

    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        if config.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir is empty in {}", path.display());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_resolves_to_etc() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/labdent/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn load_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"/tmp/labdent\"\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/labdent");
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"\"\n").unwrap();
        assert!(ServerConfig::load(&path).is_err());
    }
}
