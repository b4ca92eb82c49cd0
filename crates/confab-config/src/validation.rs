// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero durations and a sane queue capacity.

use thiserror::Error;

use crate::model::ConfabConfig;

/// A configuration error with an actionable message.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse or type error from the loader.
    #[error("config parse error: {message}")]
    Parse { message: String },

    /// A semantic constraint violation.
    #[error("config validation error: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ConfabConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let c = &config.coordinator;

    if c.max_queue_size == 0 {
        errors.push(ConfigError::Validation {
            message: "coordinator.max_queue_size must be at least 1".to_string(),
        });
    }

    for (name, value) in [
        ("coordinator.message_ttl_secs", c.message_ttl_secs),
        ("coordinator.processing_timeout_secs", c.processing_timeout_secs),
        ("coordinator.cleanup_interval_secs", c.cleanup_interval_secs),
        ("coordinator.state_ttl_secs", c.state_ttl_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be at least 1 second"),
            });
        }
    }

    // A state TTL shorter than the processing timeout would let a stuck
    // conversation's blob expire before it could ever be flagged for reset.
    if c.state_ttl_secs < c.processing_timeout_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "coordinator.state_ttl_secs ({}) must not be shorter than \
                 coordinator.processing_timeout_secs ({})",
                c.state_ttl_secs, c.processing_timeout_secs
            ),
        });
    }

    let level = config.agent.log_level.as_str();
    if !["trace", "debug", "info", "warn", "error"].contains(&level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{level}` is not one of trace, debug, info, warn, error"
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Render a list of config errors into a single multi-line message.
pub fn render_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
