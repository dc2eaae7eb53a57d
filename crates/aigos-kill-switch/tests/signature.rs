// crates/aigos-kill-switch/tests/signature.rs
// ============================================================================
// Module: Signature Verifier Tests
// Description: Integration tests for command signature verification.
// Purpose: Validate every supported algorithm and each failure reason.
// Dependencies: aigos-kill-switch, ed25519-dalek, p256, base64
// ============================================================================

//! ## Overview
//! Signs canonical command strings with Ed25519 and P-256 keys, verifies a
//! pre-computed RSA-SHA256 vector, and checks each failure kind.

#![allow(dead_code, reason = "Shared helpers are not used by every test crate.")]
#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use aigos_kill_switch::CommandType;
use aigos_kill_switch::KeyError;
use aigos_kill_switch::PublicKey;
use aigos_kill_switch::SignatureAlgorithm;
use aigos_kill_switch::SignatureFailure;
use aigos_kill_switch::SignatureVerifier;
use aigos_kill_switch::TrustedKey;
use aigos_kill_switch::canonical_command_string;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::EncodePublicKey;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use p256::ecdsa::signature::Signer;

use common::OPERATOR_KEY_ID;
use common::clock;
use common::operator_key;
use common::sign_with;
use common::signed;
use common::unsigned;
use common::verifier;

const RSA_PUBLIC_PEM: &str = include_str!("fixtures/rsa_operator_pub.pem");
const RSA_SIGNATURE: &str = include_str!("fixtures/rsa_terminate.sig");

// ============================================================================
// SECTION: Canonical Form
// ============================================================================

#[test]
fn canonical_string_orders_fields_and_joins_scope() {
    let mut command = unsigned("cmd-1", CommandType::Pause);
    command.instance_id = Some("agent-1".to_string());
    command.organization = Some("acme".to_string());
    assert_eq!(
        canonical_command_string(&command),
        "cmd-1\nPAUSE\n2026-03-01T12:00:00Z\noperator request\nops@example.com\nagent-1,acme"
    );
}

// ============================================================================
// SECTION: Ed25519
// ============================================================================

#[test]
fn ed25519_signature_verifies_with_explicit_key_id() {
    let check = verifier(clock()).verify(&signed("cmd-1", CommandType::Terminate));
    assert!(check.valid, "{check:?}");
    assert_eq!(check.key_id.as_deref(), Some(OPERATOR_KEY_ID));
}

#[test]
fn ed25519_signature_without_key_id_uses_first_matching_key() {
    let command = sign_with(unsigned("cmd-1", CommandType::Pause), &operator_key(), None);
    let check = verifier(clock()).verify(&command);
    assert!(check.valid);
    assert_eq!(check.key_id.as_deref(), Some(OPERATOR_KEY_ID));
}

#[test]
fn ed25519_pem_key_is_accepted() {
    let pem = operator_key().verifying_key().to_public_key_pem(LineEnding::LF).unwrap();
    let trusted = TrustedKey::decode("pem-key", "ed25519", &pem).unwrap();
    let verifier = SignatureVerifier::new(vec![trusted], 300, clock());
    let command =
        sign_with(unsigned("cmd-1", CommandType::Pause), &operator_key(), Some("pem-key"));
    assert!(verifier.verify(&command).valid);
}

#[test]
fn raw_base64_ed25519_key_is_accepted() {
    let material = STANDARD.encode(operator_key().verifying_key().to_bytes());
    let trusted = TrustedKey::decode("raw", "Ed25519", &material).unwrap();
    assert_eq!(trusted.key.algorithm(), SignatureAlgorithm::Ed25519);
}

#[test]
fn tampered_reason_fails_verification() {
    let mut command = signed("cmd-1", CommandType::Terminate);
    command.reason = "something else".to_string();
    let check = verifier(clock()).verify(&command);
    assert!(!check.valid);
    assert_eq!(check.failure, Some(SignatureFailure::InvalidSignature));
}

#[test]
fn signature_from_untrusted_key_fails() {
    let rogue = SigningKey::from_bytes(&[99u8; 32]);
    let command =
        sign_with(unsigned("cmd-1", CommandType::Terminate), &rogue, Some(OPERATOR_KEY_ID));
    let check = verifier(clock()).verify(&command);
    assert_eq!(check.failure, Some(SignatureFailure::InvalidSignature));
}

// ============================================================================
// SECTION: ECDSA P-256
// ============================================================================

fn p256_setup() -> (p256::ecdsa::SigningKey, SignatureVerifier) {
    let signing = p256::ecdsa::SigningKey::from_slice(&[1u8; 32]).unwrap();
    let point = signing.verifying_key().to_encoded_point(false);
    let material = STANDARD.encode(point.as_bytes());
    let trusted = TrustedKey::decode("ecdsa-ops", "ECDSA-P256", &material).unwrap();
    (signing, SignatureVerifier::new(vec![trusted], 300, clock()))
}

#[test]
fn ecdsa_der_signature_verifies() {
    let (signing, verifier) = p256_setup();
    let mut command = unsigned("cmd-ec-1", CommandType::Pause);
    let signature: p256::ecdsa::Signature =
        signing.sign(canonical_command_string(&command).as_bytes());
    command.signature = format!("ECDSA-P256:{}", STANDARD.encode(signature.to_der().as_bytes()));
    let check = verifier.verify(&command);
    assert!(check.valid, "{check:?}");
}

#[test]
fn ecdsa_fixed_size_signature_verifies() {
    let (signing, verifier) = p256_setup();
    let mut command = unsigned("cmd-ec-2", CommandType::Resume);
    let signature: p256::ecdsa::Signature =
        signing.sign(canonical_command_string(&command).as_bytes());
    command.signature = format!("ECDSA-P256:{}:ecdsa-ops", STANDARD.encode(signature.to_bytes()));
    assert!(verifier.verify(&command).valid);
}

#[test]
fn p256_pem_key_is_accepted() {
    let signing = p256::ecdsa::SigningKey::from_slice(&[1u8; 32]).unwrap();
    let pem =
        p256::PublicKey::from(signing.verifying_key()).to_public_key_pem(LineEnding::LF).unwrap();
    let trusted = TrustedKey::decode("ecdsa-pem", "ECDSA-P256", &pem).unwrap();
    let verifier = SignatureVerifier::new(vec![trusted], 300, clock());
    let mut command = unsigned("cmd-ec-3", CommandType::Pause);
    let signature: p256::ecdsa::Signature =
        signing.sign(canonical_command_string(&command).as_bytes());
    command.signature = format!("ECDSA-P256:{}:ecdsa-pem", STANDARD.encode(signature.to_bytes()));
    assert!(verifier.verify(&command).valid);
}

// ============================================================================
// SECTION: RSA-SHA256
// ============================================================================

#[test]
fn rsa_reference_vector_verifies() {
    let trusted = TrustedKey::decode("rsa-ops", "RSA-SHA256", RSA_PUBLIC_PEM).unwrap();
    let verifier = SignatureVerifier::new(vec![trusted], 300, clock());
    let mut command = unsigned("cmd-rsa-1", CommandType::Terminate);
    command.reason = "incident 42".to_string();
    command.instance_id = Some("agent-1".to_string());
    command.signature = format!("RSA-SHA256:{}:rsa-ops", RSA_SIGNATURE.trim());
    let check = verifier.verify(&command);
    assert!(check.valid, "{check:?}");

    command.instance_id = Some("agent-2".to_string());
    assert_eq!(verifier.verify(&command).failure, Some(SignatureFailure::InvalidSignature));
}

// ============================================================================
// SECTION: Failure Reasons
// ============================================================================

#[test]
fn missing_signature_is_reported() {
    let check = verifier(clock()).verify(&unsigned("cmd-1", CommandType::Pause));
    assert_eq!(check.failure, Some(SignatureFailure::MissingSignature));
}

#[test]
fn malformed_signature_is_reported() {
    let mut command = unsigned("cmd-1", CommandType::Pause);
    command.signature = "Ed25519".to_string();
    let malformed = Some(SignatureFailure::MalformedSignature);
    assert_eq!(verifier(clock()).verify(&command).failure, malformed);
    command.signature = "Ed25519:%%%".to_string();
    assert_eq!(verifier(clock()).verify(&command).failure, malformed);
}

#[test]
fn unsupported_algorithm_is_reported() {
    let mut command = unsigned("cmd-1", CommandType::Pause);
    command.signature = "HMAC-SHA1:AAAA".to_string();
    let check = verifier(clock()).verify(&command);
    assert_eq!(check.failure, Some(SignatureFailure::UnsupportedAlgorithm));
}

#[test]
fn unknown_key_id_is_reported() {
    let command =
        sign_with(unsigned("cmd-1", CommandType::Pause), &operator_key(), Some("retired"));
    let check = verifier(clock()).verify(&command);
    assert_eq!(check.failure, Some(SignatureFailure::KeyNotFound));
    assert!(check.reason.unwrap().contains("retired"));
}

#[test]
fn stale_and_future_commands_are_rejected() {
    let mut stale = unsigned("cmd-old", CommandType::Pause);
    stale.timestamp = "2026-03-01T11:54:00Z".to_string();
    let stale = sign_with(stale, &operator_key(), None);
    assert_eq!(verifier(clock()).verify(&stale).failure, Some(SignatureFailure::CommandTooOld));

    let mut future = unsigned("cmd-future", CommandType::Pause);
    future.timestamp = "2026-03-01T12:05:00Z".to_string();
    let future = sign_with(future, &operator_key(), None);
    assert_eq!(verifier(clock()).verify(&future).failure, Some(SignatureFailure::CommandInFuture));

    let mut garbled = unsigned("cmd-bad-ts", CommandType::Pause);
    garbled.timestamp = "yesterday".to_string();
    let garbled = sign_with(garbled, &operator_key(), None);
    let check = verifier(clock()).verify(&garbled);
    assert_eq!(check.failure, Some(SignatureFailure::InvalidTimestamp));
}

// ============================================================================
// SECTION: Key Management
// ============================================================================

#[test]
fn keys_can_be_rotated_at_runtime() {
    let mut verifier = SignatureVerifier::new(Vec::new(), 300, clock());
    assert!(verifier.is_empty());
    let command = signed("cmd-1", CommandType::Pause);
    assert_eq!(verifier.verify(&command).failure, Some(SignatureFailure::KeyNotFound));

    let operator = PublicKey::Ed25519(operator_key().verifying_key());
    verifier.add_key(TrustedKey::new(OPERATOR_KEY_ID, operator));
    assert!(verifier.verify(&command).valid);
    assert_eq!(verifier.key_ids(), vec![OPERATOR_KEY_ID.to_string()]);

    assert!(verifier.remove_key(OPERATOR_KEY_ID));
    assert!(!verifier.remove_key(OPERATOR_KEY_ID));
    assert_eq!(verifier.verify(&command).failure, Some(SignatureFailure::KeyNotFound));
}

#[test]
fn invalid_key_material_is_rejected() {
    assert!(matches!(TrustedKey::decode("k", "Ed25519", "AAAA"), Err(KeyError::InvalidKey { .. })));
    let unsupported = TrustedKey::decode("k", "DSA", "AAAA");
    assert!(matches!(unsupported, Err(KeyError::UnsupportedAlgorithm(_))));
}
