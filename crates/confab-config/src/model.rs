// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Confab coordinator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Confab configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfabConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation state machine and queue settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the coordinator instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "confab".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation coordinator configuration.
///
/// The defaults match the documented fixed defaults: a 10-entry queue,
/// 300 s message TTL, 120 s processing timeout, 60 s cleanup interval,
/// 3600 s state blob TTL, and 3 retries per errored message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Maximum number of pending messages per conversation.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// How long a queued message may wait unserved before being dropped.
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u64,

    /// How long a conversation may stay in processing before it is
    /// considered stuck and recoverable via reset.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,

    /// Period of the background cleanup sweep.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// TTL of the per-conversation state blob; refreshed on every write.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,

    /// Retry budget for a message flagged with an LLM error.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            message_ttl_secs: default_message_ttl_secs(),
            processing_timeout_secs: default_processing_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            state_ttl_secs: default_state_ttl_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl CoordinatorConfig {
    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }
}

fn default_max_queue_size() -> usize {
    10
}

fn default_message_ttl_secs() -> u64 {
    300
}

fn default_processing_timeout_secs() -> u64 {
    120
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_state_ttl_secs() -> u64 {
    3600
}

fn default_max_retries() -> u32 {
    3
}
