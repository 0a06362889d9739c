use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "changepacks-action.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Action inputs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActionConfig {
    /// GitHub token (falls back to GITHUB_TOKEN)
    #[serde(default)]
    pub token: Option<String>,
    /// Name or path of the changepacks binary
    #[serde(default = "default_changepacks_bin")]
    pub changepacks_bin: String,
    /// Directory git and changepacks run in
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    /// Changelog state directory, relative to the working directory
    #[serde(default = "default_changelog_dir")]
    pub changelog_dir: String,
    /// Run `changepacks publish` after creating releases
    #[serde(default)]
    pub publish: bool,
    #[serde(default = "default_true")]
    pub create_release: bool,
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_changepacks_bin() -> String {
    "changepacks".to_string()
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_changelog_dir() -> String {
    ".changepacks".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            token: None,
            changepacks_bin: default_changepacks_bin(),
            working_directory: default_working_directory(),
            changelog_dir: default_changelog_dir(),
            publish: false,
            create_release: true,
            slack_webhook_url: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ActionConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. `changepacks-action.toml` in the current directory
    /// 3. `INPUT_*` environment variables set by the Actions runner
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_from(Path::new(CONFIG_FILE), vars)
    }

    /// Load from an explicit file and variable set. Empty inputs count as unset,
    /// since the runner exports every declared input even when it is blank.
    pub fn load_from(file: &Path, vars: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        if file.exists() {
            builder = builder.add_source(File::from(file));
        }

        let inputs: HashMap<String, String> = vars
            .iter()
            .filter(|(key, value)| key.starts_with("INPUT_") && !value.trim().is_empty())
            .map(|(key, value)| (key.replace('-', "_"), value.trim().to_string()))
            .collect();

        builder = builder.add_source(
            Environment::with_prefix("INPUT")
                .prefix_separator("_")
                .try_parsing(true)
                .source(Some(inputs)),
        );

        let mut action_config: ActionConfig = builder
            .build()
            .context("Failed to read action inputs")?
            .try_deserialize()
            .context("Invalid action inputs")?;

        if action_config.token.is_none() {
            action_config.token = vars
                .get("GITHUB_TOKEN")
                .filter(|token| !token.trim().is_empty())
                .cloned();
        }

        Ok(action_config)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow!("No GitHub token: set the 'token' input or GITHUB_TOKEN"))
    }

    /// Load .env file if it exists. Runs before telemetry, so the caller
    /// logs whether a file was read.
    pub fn load_env_file() -> Result<bool> {
        if !Path::new(".env").exists() {
            return Ok(false);
        }
        dotenvy::dotenv().context("Failed to read .env file")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_inputs() {
        let config = ActionConfig::load_from(Path::new("missing.toml"), HashMap::new()).unwrap();
        assert_eq!(config, ActionConfig::default());
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_inputs_override_defaults() {
        let config = ActionConfig::load_from(
            Path::new("missing.toml"),
            vars(&[
                ("INPUT_TOKEN", "ghs_input"),
                ("INPUT_PUBLISH", "true"),
                ("INPUT_CREATE_RELEASE", "false"),
                ("INPUT_CHANGELOG_DIR", ".changes"),
                ("INPUT_LOG_FORMAT", "json"),
                ("INPUT_SLACK_WEBHOOK_URL", "https://hooks.slack.test/x"),
                ("GITHUB_TOKEN", "ghs_env"),
            ]),
        )
        .unwrap();

        assert_eq!(config.require_token().unwrap(), "ghs_input");
        assert!(config.publish);
        assert!(!config.create_release);
        assert_eq!(config.changelog_dir, ".changes");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.slack_webhook_url.as_deref(), Some("https://hooks.slack.test/x"));
    }

    #[test]
    fn test_blank_inputs_are_unset() {
        let config = ActionConfig::load_from(
            Path::new("missing.toml"),
            vars(&[
                ("INPUT_TOKEN", ""),
                ("INPUT_PUBLISH", ""),
                ("INPUT_CREATE_RELEASE", "  "),
                ("INPUT_SLACK_WEBHOOK_URL", ""),
                ("GITHUB_TOKEN", "ghs_env"),
            ]),
        )
        .unwrap();

        assert_eq!(config.token.as_deref(), Some("ghs_env"));
        assert!(!config.publish);
        assert!(config.create_release);
        assert!(config.slack_webhook_url.is_none());
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("changepacks-action.toml");
        std::fs::write(&file, "changepacks_bin = \"/opt/changepacks\"\npublish = true\n").unwrap();

        let config = ActionConfig::load_from(&file, vars(&[("INPUT_PUBLISH", "false")])).unwrap();

        assert_eq!(config.changepacks_bin, "/opt/changepacks");
        assert!(!config.publish);
    }
}
