use super::{ConfigError, ConfigResult, GenerationConfig, LlmConfig, ServerConfig};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &ServerConfig) -> ConfigResult<()> {
        if config.host.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }

        if config.max_payload_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_payload_size".to_string(),
                value: config.max_payload_size.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if let Some(level) = &config.log_level {
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "log_level".to_string(),
                    value: level.clone(),
                    reason: "Must be one of off, error, warn, info, debug, trace".to_string(),
                });
            }
        }

        Self::validate_llm(&config.llm)
    }

    fn validate_llm(llm: &LlmConfig) -> ConfigResult<()> {
        if llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_key (--api-key or GOOGLE_API_KEY)".to_string(),
            });
        }

        if llm.model.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "model".to_string(),
            });
        }

        if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: llm.base_url.clone(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        if llm.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: llm.request_timeout_secs.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        Self::validate_generation(&llm.generation)
    }

    fn validate_generation(generation: &GenerationConfig) -> ConfigResult<()> {
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature".to_string(),
                value: generation.temperature.to_string(),
                reason: "Must be between 0.0 and 2.0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&generation.top_p) {
            return Err(ConfigError::InvalidValue {
                field: "top_p".to_string(),
                value: generation.top_p.to_string(),
                reason: "Must be between 0.0 and 1.0".to_string(),
            });
        }

        if generation.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "top_k".to_string(),
                value: generation.top_k.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if generation.max_output_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_output_tokens".to_string(),
                value: generation.max_output_tokens.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate(self)
    }
}
