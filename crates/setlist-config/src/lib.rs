// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding fetched audio, staging artifacts and the ledger.
    pub work_dir: PathBuf,
    /// Ledger file name within `work_dir`.
    pub ledger_file: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("setlist_workspace"),
            ledger_file: "songs.json".to_string(),
        }
    }
}

impl WorkspaceConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.work_dir.join(&self.ledger_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// API token for the recognition service.
    pub api_token: Option<String>,
    /// Override for the service base URL (useful for testing).
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to the yt-dlp binary.
    pub yt_dlp_path: PathBuf,
    /// Minimum pause between collection items, in seconds.
    pub fetch_interval_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: PathBuf::from("yt-dlp"),
            fetch_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Total attempts per window (first try included).
    pub max_attempts: u32,
    /// Pause between retry attempts, in seconds.
    pub retry_pause_secs: u64,
    /// Reclaim resources before every Nth window.
    pub reclaim_every_windows: usize,
    /// Also reclaim when this many seconds have elapsed since the last point.
    pub reclaim_after_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_pause_secs: 1,
            reclaim_every_windows: 20,
            reclaim_after_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    pub recognition: RecognitionConfig,
    pub media: MediaConfig,
    pub pipeline: PipelineConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: SETLIST_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("SETLIST_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.pipeline.reclaim_every_windows, 20);
        assert_eq!(config.media.fetch_interval_secs, 2);
        assert!(config.recognition.api_token.is_none());
    }

    #[test]
    fn test_ledger_path_joins_work_dir() {
        let workspace = WorkspaceConfig::default();
        assert_eq!(
            workspace.ledger_path(),
            PathBuf::from("setlist_workspace").join("songs.json")
        );
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SETLIST_RECOGNITION__API_TOKEN", "secret");
            jail.set_env("SETLIST_PIPELINE__MAX_ATTEMPTS", "3");
            let config = load(None).expect("config loads");
            assert_eq!(config.recognition.api_token.as_deref(), Some("secret"));
            assert_eq!(config.pipeline.max_attempts, 3);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "setlist.toml",
                r#"
                [workspace]
                work_dir = "/tmp/setlist"
                ledger_file = "ledger.json"
                "#,
            )?;
            let config = load(Some(Path::new("setlist.toml"))).expect("config loads");
            assert_eq!(config.workspace.work_dir, PathBuf::from("/tmp/setlist"));
            assert_eq!(config.workspace.ledger_file, "ledger.json");
            Ok(())
        });
    }
}
