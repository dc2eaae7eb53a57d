// crates/aigos-config/src/lib.rs
// ============================================================================
// Module: AIGOS Config Library
// Description: Canonical config model, validation, and component builders.
// Purpose: Single source of truth for aigos.toml semantics.
// Dependencies: aigos-core, aigos-kill-switch, serde, toml
// ============================================================================

//! ## Overview
//! `aigos-config` defines the configuration model for the governance control
//! plane. It provides strict, fail-closed validation and builders that turn a
//! validated config into token generators and validators, policy engines,
//! golden thread verifiers, and kill switch receivers.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
pub mod keys;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
pub use keys::TrustedKeyConfig;
