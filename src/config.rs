use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing of simulated replies
    pub streaming: StreamingConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// AiRA home directory
    #[serde(skip)]
    pub aira_home: PathBuf,
}

/// How much text each streaming tick reveals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementMode {
    Char,
    Word,
}

/// Reply timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Pause between a prompt and the first revealed increment
    pub think_delay_ms: u64,
    pub increment_interval_ms: u64,
    pub increment_mode: IncrementMode,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub assistant_name: String,
    pub max_messages: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            think_delay_ms: 500,
            increment_interval_ms: 150,
            increment_mode: IncrementMode::Char,
        }
    }
}

impl StreamingConfig {
    pub fn think_delay(&self) -> Duration {
        Duration::from_millis(self.think_delay_ms)
    }

    pub fn increment_interval(&self) -> Duration {
        Duration::from_millis(self.increment_interval_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            assistant_name: "AiRA".to_string(),
            max_messages: 200,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            streaming: StreamingConfig::default(),
            ui: UiConfig::default(),
            aira_home: home.join(".aira"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.aira/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let aira_home = home.join(".aira");
        let config_path = aira_home.join("config.toml");

        fs::create_dir_all(&aira_home)
            .context("Failed to create .aira directory")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            Self::from_toml(&content)?
        } else {
            Config::default()
        };

        config.aira_home = aira_home;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.streaming.increment_interval_ms == 0 {
            bail!("Invalid config: streaming.increment_interval_ms must be at least 1");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.aira_home.join("config.toml");
        fs::write(&config_path, self.to_toml()?)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.aira_home.join("aira.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reply_timing() {
        let config = Config::default();
        assert_eq!(config.streaming.think_delay(), Duration::from_millis(500));
        assert_eq!(config.streaming.increment_interval(), Duration::from_millis(150));
        assert_eq!(config.streaming.increment_mode, IncrementMode::Char);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [streaming]
            increment_mode = "word"
            increment_interval_ms = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.streaming.increment_mode, IncrementMode::Word);
        assert_eq!(config.streaming.increment_interval_ms, 40);
        assert_eq!(config.streaming.think_delay_ms, 500);
        assert_eq!(config.ui.assistant_name, "AiRA");
    }

    #[test]
    fn rejects_unknown_increment_mode() {
        let err = Config::from_toml("[streaming]\nincrement_mode = \"sentence\"\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn rejects_zero_increment_interval() {
        let err = Config::from_toml("[streaming]\nincrement_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("increment_interval_ms"));

        // a zero think-delay is fine, the reply just starts right away
        let config = Config::from_toml("[streaming]\nthink_delay_ms = 0\n").unwrap();
        assert_eq!(config.streaming.think_delay(), Duration::ZERO);
    }

    #[test]
    fn toml_output_parses_back() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.streaming.increment_interval_ms, 150);
    }
}
