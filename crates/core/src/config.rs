use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CAMPAIGN_WIZARD__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Unset by default: a hung request hangs the step.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_publish_target")]
    pub default_target: String,
    #[serde(default = "default_publish_mode")]
    pub mode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_expert_char_delay_ms")]
    pub expert_char_delay_ms: u64,
    #[serde(default = "default_expert_line_pause_ms")]
    pub expert_line_pause_ms: u64,
    #[serde(default = "default_marketing_char_delay_ms")]
    pub marketing_char_delay_ms: u64,
    #[serde(default = "default_marketing_line_pause_ms")]
    pub marketing_line_pause_ms: u64,
    /// Fixed seed for the metric generators; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_preview_rows() -> usize {
    12
}
fn default_publish_target() -> String {
    "NEON_DX".to_string()
}
fn default_publish_mode() -> String {
    "api".to_string()
}
fn default_expert_char_delay_ms() -> u64 {
    12
}
fn default_expert_line_pause_ms() -> u64 {
    300
}
fn default_marketing_char_delay_ms() -> u64 {
    15
}
fn default_marketing_line_pause_ms() -> u64 {
    200
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            preview_rows: default_preview_rows(),
            request_timeout_ms: None,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            default_target: default_publish_target(),
            mode: default_publish_mode(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            expert_char_delay_ms: default_expert_char_delay_ms(),
            expert_line_pause_ms: default_expert_line_pause_ms(),
            marketing_char_delay_ms: default_marketing_char_delay_ms(),
            marketing_line_pause_ms: default_marketing_line_pause_ms(),
            seed: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            publish: PublishConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_WIZARD")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chat_timings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.preview_rows, 12);
        assert!(cfg.api.request_timeout_ms.is_none());
        assert_eq!(cfg.publish.default_target, "NEON_DX");
        assert_eq!(cfg.chat.expert_char_delay_ms, 12);
        assert_eq!(cfg.chat.marketing_char_delay_ms, 15);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .set_override("api.base_url", "http://demo:9000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.api.base_url, "http://demo:9000");
        assert_eq!(cfg.api.preview_rows, 12);
        assert_eq!(cfg.chat.marketing_line_pause_ms, 200);
    }
}
