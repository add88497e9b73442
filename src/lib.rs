//! Workspace facade crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-runtime`, `core-codec`, `core-bridge`). Host
//! applications can depend on `codec-bridge-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "runtime")]
pub use core_runtime as runtime;

#[cfg(feature = "codec")]
pub use core_codec as codec;

#[cfg(feature = "bridge")]
pub use core_bridge as bridge;
