//! # Bridge Configuration Module
//!
//! Provides configuration management for the codec bridge.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `BridgeConfig` instance that holds the settings a host chooses when it
//! spawns a bridge client. It enforces fail-fast validation so an invalid
//! queue size or thread name is reported before the worker thread starts.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{BridgeConfig, DurationPolicy};
//!
//! let config = BridgeConfig::builder()
//!     .worker_thread_name("ac3-worker")
//!     .command_queue_capacity(16)
//!     .duration_policy(DurationPolicy::Warn)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.command_queue_capacity, 16);
//! ```
//!
//! Configuration can also be loaded from JSON, with every field optional:
//!
//! ```
//! use core_runtime::config::BridgeConfig;
//!
//! let config = BridgeConfig::from_json_str(r#"{ "duration_policy": "warn" }"#).unwrap();
//! assert_eq!(config.worker_thread_name, "codec-bridge-worker");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const MAX_COMMAND_QUEUE_CAPACITY: usize = 65_536;

/// What the encoder path does when the engine reports a packet duration that
/// differs from its fixed frame size.
///
/// Packet timestamps advance by the reported duration while input timestamps
/// advance by the frame size, so a divergence makes the two drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationPolicy {
    /// Reject the packet with an error.
    #[default]
    Strict,
    /// Log a warning and keep the reported duration.
    Warn,
}

/// Configuration for a bridge client and its background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Name given to the background codec thread.
    ///
    /// Default: `codec-bridge-worker`.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,

    /// Number of commands that may be queued for the worker before
    /// `send_command` starts waiting.
    ///
    /// Default: 64.
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Initial capacity, in samples, of each encoder's frame accumulator.
    ///
    /// Default: 65536 samples.
    #[serde(default = "default_initial_accumulator_capacity")]
    pub initial_accumulator_capacity: usize,

    /// Handling of engine-reported packet durations that differ from the frame size.
    ///
    /// Default: [`DurationPolicy::Strict`].
    #[serde(default)]
    pub duration_policy: DurationPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: default_worker_thread_name(),
            command_queue_capacity: default_command_queue_capacity(),
            initial_accumulator_capacity: default_initial_accumulator_capacity(),
            duration_policy: DurationPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates a new builder for constructing a `BridgeConfig`.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid bridge config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Worker thread name is not empty
    /// - Command queue capacity is in `1..=65536`
    /// - Accumulator capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.worker_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "Worker thread name cannot be empty".to_string(),
            ));
        }

        if self.command_queue_capacity == 0 {
            return Err(Error::Config(
                "Command queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.command_queue_capacity > MAX_COMMAND_QUEUE_CAPACITY {
            return Err(Error::Config(format!(
                "Command queue capacity exceeds maximum of {}",
                MAX_COMMAND_QUEUE_CAPACITY
            )));
        }

        if self.initial_accumulator_capacity == 0 {
            return Err(Error::Config(
                "Initial accumulator capacity must be greater than 0 samples".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_worker_thread_name() -> String {
    "codec-bridge-worker".to_string()
}

fn default_command_queue_capacity() -> usize {
    64
}

fn default_initial_accumulator_capacity() -> usize {
    1 << 16
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    worker_thread_name: Option<String>,
    command_queue_capacity: Option<usize>,
    initial_accumulator_capacity: Option<usize>,
    duration_policy: Option<DurationPolicy>,
}

impl BridgeConfigBuilder {
    /// Sets the name of the background codec thread.
    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = Some(name.into());
        self
    }

    /// Sets how many commands may be queued before submission waits.
    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = Some(capacity);
        self
    }

    /// Sets the starting accumulator capacity in samples.
    pub fn initial_accumulator_capacity(mut self, samples: usize) -> Self {
        self.initial_accumulator_capacity = Some(samples);
        self
    }

    /// Sets the packet-duration divergence policy.
    pub fn duration_policy(mut self, policy: DurationPolicy) -> Self {
        self.duration_policy = Some(policy);
        self
    }

    /// Builds the configuration, validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when any field is out of range.
    pub fn build(self) -> Result<BridgeConfig> {
        let config = BridgeConfig {
            worker_thread_name: self
                .worker_thread_name
                .unwrap_or_else(default_worker_thread_name),
            command_queue_capacity: self
                .command_queue_capacity
                .unwrap_or_else(default_command_queue_capacity),
            initial_accumulator_capacity: self
                .initial_accumulator_capacity
                .unwrap_or_else(default_initial_accumulator_capacity),
            duration_policy: self.duration_policy.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
