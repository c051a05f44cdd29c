use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::url::normalize_server_url;

/// A configured remote server the client connects to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub name: String,
    pub url: String,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        ServerDescriptor {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Two descriptors are equivalent when they share a display name or a
    /// normalized URL; either collision makes the pair ambiguous in the UI.
    pub fn is_equivalent(&self, other: &ServerDescriptor) -> bool {
        self.name == other.name
            || normalize_server_url(&self.url) == normalize_server_url(&other.url)
    }
}

fn default_spellcheck_languages() -> Vec<String> {
    vec!["en-US".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,
    /// Directory downloads are saved to; falls back to the OS download dir.
    pub download_location: Option<PathBuf>,
    #[serde(default = "default_spellcheck_languages")]
    pub spellcheck_languages: Vec<String>,
    #[serde(default)]
    pub auto_launch: bool,
    #[serde(default)]
    pub minimize_to_tray: bool,
    #[serde(default)]
    pub dev_mode: bool,
}

impl Config {
    pub fn load(data_dir: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::config_path(data_dir);
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, data_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path(data_dir);
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Resolve the config file path. A `--data-dir` override relocates all
    /// persisted state under the given directory.
    pub fn config_path(data_dir: Option<&Path>) -> PathBuf {
        match data_dir {
            Some(dir) => dir.join("config.toml"),
            None => {
                let proj_dirs = ProjectDirs::from("org", "permacommons", "muster")
                    .expect("Failed to determine config directory");
                proj_dirs.config_dir().join("config.toml")
            }
        }
    }

    pub fn has_equivalent_server(&self, descriptor: &ServerDescriptor) -> bool {
        self.servers.iter().any(|s| s.is_equivalent(descriptor))
    }

    pub fn add_server(&mut self, descriptor: ServerDescriptor) {
        self.servers.push(descriptor);
    }

    pub fn remove_server(&mut self, name: &str) {
        self.servers.retain(|s| s.name != name);
    }

    /// Effective download directory: the configured one, else the OS download
    /// dir, else the current directory.
    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_location {
            return dir.clone();
        }
        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// URLs the permission gate treats as trusted origins.
    pub fn trusted_urls(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.url.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("nonexistent_config.toml");

        let config = Config::load_from_path(&config_path).expect("Failed to load config");

        assert!(config.servers.is_empty());
        assert_eq!(config.spellcheck_languages, vec!["en-US".to_string()]);
    }

    #[test]
    fn test_config_persistence_lifecycle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.add_server(ServerDescriptor::new("Acme", "https://acme.example"));
        config.download_location = Some(PathBuf::from("/tmp/downloads"));
        config.save_to_path(&config_path).expect("save failed");

        let reloaded = Config::load_from_path(&config_path).expect("load failed");
        assert_eq!(reloaded.servers.len(), 1);
        assert_eq!(reloaded.servers[0].name, "Acme");
        assert_eq!(
            reloaded.download_location.as_deref(),
            Some(Path::new("/tmp/downloads"))
        );

        let mut reloaded = reloaded;
        reloaded.remove_server("Acme");
        reloaded.save_to_path(&config_path).expect("save failed");

        let final_config = Config::load_from_path(&config_path).expect("load failed");
        assert!(final_config.servers.is_empty());
    }

    #[test]
    fn data_dir_override_relocates_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = Config::config_path(Some(temp_dir.path()));
        assert_eq!(path, temp_dir.path().join("config.toml"));
    }

    #[test]
    fn equivalent_servers_detected_by_name_or_url() {
        let a = ServerDescriptor::new("Acme", "https://acme.example");
        assert!(a.is_equivalent(&ServerDescriptor::new("Acme", "https://other.example")));
        assert!(a.is_equivalent(&ServerDescriptor::new("Other", "https://acme.example/")));
        assert!(!a.is_equivalent(&ServerDescriptor::new("Other", "https://other.example")));
    }
}
