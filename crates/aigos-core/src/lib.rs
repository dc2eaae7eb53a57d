// crates/aigos-core/src/lib.rs
// ============================================================================
// Module: AIGOS Core Library
// Description: Public API surface for the AIGOS governance core.
// Purpose: Expose identity types, golden thread, token protocol, and policy engines.
// Dependencies: crate::{identity, hashing, time, golden_thread, token, policy, handshake}
// ============================================================================

//! ## Overview
//! AIGOS core proves an agent's identity and approval provenance to
//! counterparties and gates agent-to-agent calls with policy engines.
//! Invariants:
//! - Verification and policy functions are total: expected failures are
//!   returned as typed results, never raised.
//! - Key material and policy configuration are owned per instance; there is
//!   no global state.
//!
//! Security posture: tokens and counterpart claims are untrusted input until
//! [`TokenValidator::validate`] accepts them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod golden_thread;
pub mod handshake;
pub mod hashing;
pub mod identity;
pub mod policy;
pub mod time;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use golden_thread::ApprovalFreshness;
pub use golden_thread::ApprovalPolicy;
pub use golden_thread::GoldenThreadHash;
pub use golden_thread::GoldenThreadVerification;
pub use golden_thread::GoldenThreadVerifier;
pub use golden_thread::MismatchReason;
pub use identity::CapabilitiesManifest;
pub use identity::ControlChannel;
pub use identity::GoldenThread;
pub use identity::Identity;
pub use identity::Lineage;
pub use identity::OperatingMode;
pub use identity::RiskLevel;
pub use policy::ClaimsValidator;
pub use policy::DecisionObserver;
pub use policy::DecisionRecord;
pub use policy::InboundPolicyConfig;
pub use policy::InboundPolicyEngine;
pub use policy::OutboundPolicyConfig;
pub use policy::OutboundPolicyEngine;
pub use policy::PolicyDecision;
pub use policy::PolicyDirection;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use token::Audience;
pub use token::CapabilityClaims;
pub use token::ClaimValidation;
pub use token::ControlClaims;
pub use token::ControlState;
pub use token::GeneratedToken;
pub use token::GeneratorConfig;
pub use token::GovernanceClaims;
pub use token::GovernanceStatusClaims;
pub use token::GovernanceTokenPayload;
pub use token::IdentityClaims;
pub use token::LineageClaims;
pub use token::SubsetCheck;
pub use token::TokenError;
pub use token::TokenErrorCode;
pub use token::TokenGenerator;
pub use token::TokenInput;
pub use token::TokenOptions;
pub use token::TokenValidation;
pub use token::TokenValidator;
pub use token::ValidateOptions;
pub use token::ValidatorConfig;
pub use token::is_capability_subset;
