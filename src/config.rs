//! Configuration and persisted state for the vox client

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Saved API credentials (`config.json` in the data directory)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// DashScope API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Mutable CLI state persisted between runs (`state.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Voice used by the most recent `say`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_voice: Option<String>,

    /// Language hint used by the most recent `say`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_lang: Option<String>,
}

/// vox client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Saved credentials
    pub credentials: Credentials,

    /// Persisted CLI state
    pub state: State,

    /// Path to the data directory (credentials, state, cache)
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from the platform data directory
    ///
    /// Missing or unparseable files fall back to defaults; the data and
    /// cache directories are created if absent.
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load() -> Result<Self> {
        let data_dir = directories::ProjectDirs::from("dev", "omni", "vox")
            .map_or_else(|| PathBuf::from(".vox"), |d| d.data_dir().to_path_buf());
        Self::load_from(data_dir)
    }

    /// Load configuration rooted at an explicit data directory
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load_from(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        std::fs::create_dir_all(data_dir.join("cache"))?;

        let credentials = read_json(&data_dir.join("config.json"));
        let state = read_json(&data_dir.join("state.json"));

        tracing::debug!(data_dir = %data_dir.display(), "loaded configuration");

        Ok(Self {
            credentials,
            state,
            data_dir,
        })
    }

    /// Directory holding cached synthesis audio and transcripts
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Resolve the API key, environment taking precedence over saved config
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured
    pub fn require_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("DASHSCOPE_API_KEY")
            && !key.is_empty()
        {
            return Ok(key);
        }
        self.credentials.api_key.clone().ok_or_else(|| {
            Error::Config("not authenticated - run: vox auth login --token <key>".to_string())
        })
    }

    /// Persist credentials to `config.json`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_credentials(&self) -> Result<()> {
        write_json(&self.data_dir.join("config.json"), &self.credentials)
    }

    /// Persist CLI state to `state.json`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_state(&self) -> Result<()> {
        write_json(&self.data_dir.join("state.json"), &self.state)
    }
}

fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("data")).unwrap();
        assert!(config.credentials.api_key.is_none());
        assert!(config.state.last_voice.is_none());
        assert!(config.cache_dir().is_dir());
    }

    #[test]
    fn state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path().join("data")).unwrap();
        config.state.last_voice = Some("Cherry".to_string());
        config.state.last_lang = Some("English".to_string());
        config.save_state().unwrap();

        let reloaded = Config::load_from(dir.path().join("data")).unwrap();
        assert_eq!(reloaded.state.last_voice.as_deref(), Some("Cherry"));
        assert_eq!(reloaded.state.last_lang.as_deref(), Some("English"));
    }
}
