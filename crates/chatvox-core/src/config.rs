//! Configuration loading and validation.
//!
//! All configuration is static and consumed once at startup; the pipeline
//! itself takes no runtime flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatvoxError, Result};

/// Top-level chatvox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat server hostname.
    #[serde(default = "default_server")]
    pub server: String,

    /// Chat server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Channel to join. Stored with or without the leading `#`.
    #[serde(default)]
    pub channel: String,

    /// Path to the file holding the OAuth access token.
    #[serde(default = "default_credential_path")]
    pub credential_path: String,

    /// Directory where synthesized WAV artifacts are written.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Piper voice model passed to the speech engine.
    #[serde(default = "default_voice_model")]
    pub voice_model: String,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Policy for re-establishing a dropped chat connection.
///
/// The default of zero attempts matches the historical behavior: a read
/// failure ends ingestion and the process exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles per attempt.
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            channel: String::new(),
            credential_path: default_credential_path(),
            work_dir: default_work_dir(),
            voice_model: default_voice_model(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_server() -> String {
    "irc.chat.twitch.tv".into()
}

fn default_port() -> u16 {
    6667
}

fn default_credential_path() -> String {
    "twitch_access_token.txt".into()
}

fn default_work_dir() -> String {
    "wav_files".into()
}

fn default_voice_model() -> String {
    "en_US-amy-medium.onnx".into()
}

fn default_backoff_ms() -> u64 {
    1000
}

fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(ChatvoxError::Io)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| ChatvoxError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Check the invariants a running pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim_matches('#').is_empty() {
            return Err(ChatvoxError::Config(
                "no channel configured — set \"channel\" in the config file".into(),
            ));
        }
        Ok(())
    }

    /// Server address in `host:port` form.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Channel identifier with exactly one leading `#`.
    pub fn channel(&self) -> String {
        format!("#{}", self.channel.trim_start_matches('#'))
    }

    /// Credential path with tilde expansion.
    pub fn credential_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.credential_path).as_ref())
    }

    /// Working directory for artifacts, with tilde expansion.
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.work_dir).as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.addr(), "irc.chat.twitch.tv:6667");
        assert_eq!(config.work_dir(), PathBuf::from("wav_files"));
        assert_eq!(config.reconnect.max_attempts, 0);
        assert_eq!(config.reconnect.initial_backoff_ms, 1000);
    }

    #[test]
    fn test_channel_normalization() {
        let mut config = Config::default();
        config.channel = "britishminute".into();
        assert_eq!(config.channel(), "#britishminute");

        config.channel = "#britishminute".into();
        assert_eq!(config.channel(), "#britishminute");
    }

    #[test]
    fn test_validate_rejects_missing_channel() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.channel = "#".into();
        assert!(config.validate().is_err());

        config.channel = "somechannel".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_json5() {
        let raw = r#"{
            // comments are fine
            channel: "teststream",
            port: 6697,
            reconnect: { max_attempts: 3 },
        }"#;
        let config: Config = json5::from_str(raw).unwrap();
        assert_eq!(config.channel(), "#teststream");
        assert_eq!(config.port, 6697);
        assert_eq!(config.server, "irc.chat.twitch.tv");
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.initial_backoff_ms, 1000);
    }

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_CV_CHANNEL", "envstream") };
        let raw = r#"{"channel": "${TEST_CV_CHANNEL}"}"#;
        let substituted = substitute_env_vars(raw);
        let config: Config = json5::from_str(&substituted).unwrap();
        assert_eq!(config.channel(), "#envstream");
        unsafe { std::env::remove_var("TEST_CV_CHANNEL") };
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/chatvox.json5")).unwrap();
        assert_eq!(config.server, "irc.chat.twitch.tv");
    }
}
