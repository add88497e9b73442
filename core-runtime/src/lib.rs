//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the codec bridge:
//! - Logging and tracing infrastructure
//! - Bridge configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the codec and bridge crates
//! depend on. It establishes the logging conventions and the configuration
//! surface a host uses when it constructs a bridge client.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{BridgeConfig, BridgeConfigBuilder, DurationPolicy};
pub use error::{Error, Result};
