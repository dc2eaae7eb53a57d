// crates/aigos-core/src/token/validation.rs
// ============================================================================
// Module: AIGOS Claim Validators
// Description: Structural validators for each governance claim block.
// Purpose: Reject malformed claim blocks before typed decoding and detect capability escalation.
// Dependencies: serde_json, crate::{hashing, identity}
// ============================================================================

//! ## Overview
//! Validators operate on untyped JSON so every structural defect in a block
//! is reported individually instead of stopping at the first decode error.
//! They are used during token validation and standalone.
//! Invariants:
//! - `valid` is true exactly when `errors` is empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::claims::CapabilityClaims;
use crate::hashing::is_sha256_digest;
use crate::identity::RiskLevel;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Result of a structural claim validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimValidation {
    /// Whether the block is structurally valid.
    pub valid: bool,
    /// Individual defects.
    pub errors: Vec<String>,
}

impl ClaimValidation {
    /// Builds a result from collected errors.
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Result of a capability subset check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetCheck {
    /// Whether the child is within the parent's capabilities.
    pub valid: bool,
    /// Individual escalations.
    pub violations: Vec<String>,
}

// ============================================================================
// SECTION: Field Checks
// ============================================================================

/// Collects field-level defects for one claim block.
struct FieldChecker<'a> {
    /// Block name used as the error prefix.
    block: &'static str,
    /// Block object, when the value is an object.
    object: Option<&'a serde_json::Map<String, Value>>,
    /// Collected defects.
    errors: Vec<String>,
}

impl<'a> FieldChecker<'a> {
    /// Starts checking `value` as the named block.
    fn new(block: &'static str, value: &'a Value) -> Self {
        let object = value.as_object();
        let mut errors = Vec::new();
        if object.is_none() {
            errors.push(format!("{block}: must be an object"));
        }
        Self {
            block,
            object,
            errors,
        }
    }

    /// Returns the field value, recording a defect when absent.
    fn field(&mut self, name: &str) -> Option<&'a Value> {
        let object = self.object?;
        let value = object.get(name);
        if value.is_none() {
            self.errors.push(format!("{}.{name}: missing", self.block));
        }
        value
    }

    /// Records a defect for a present field.
    fn invalid(&mut self, name: &str, expectation: &str) {
        self.errors.push(format!("{}.{name}: {expectation}", self.block));
    }

    /// Requires a non-empty string field.
    fn non_empty_string(&mut self, name: &str) -> Option<&'a str> {
        let value = self.field(name)?;
        match value.as_str() {
            Some(text) if !text.trim().is_empty() => Some(text),
            _ => {
                self.invalid(name, "must be a non-empty string");
                None
            }
        }
    }

    /// Requires a string field, which may be empty.
    fn string(&mut self, name: &str) -> Option<&'a str> {
        let value = self.field(name)?;
        let text = value.as_str();
        if text.is_none() {
            self.invalid(name, "must be a string");
        }
        text
    }

    /// Requires a boolean field.
    fn boolean(&mut self, name: &str) -> Option<bool> {
        let value = self.field(name)?;
        let flag = value.as_bool();
        if flag.is_none() {
            self.invalid(name, "must be a boolean");
        }
        flag
    }

    /// Requires a non-negative integer field.
    fn unsigned(&mut self, name: &str) -> Option<u64> {
        let value = self.field(name)?;
        let number = value.as_u64();
        if number.is_none() {
            self.invalid(name, "must be a non-negative integer");
        }
        number
    }

    /// Requires a string field drawn from a fixed set.
    fn one_of(&mut self, name: &str, allowed: &[&str]) {
        let Some(value) = self.field(name) else {
            return;
        };
        let matches = value.as_str().is_some_and(|text| allowed.contains(&text));
        if !matches {
            self.invalid(name, &format!("must be one of {}", allowed.join(", ")));
        }
    }

    /// Finishes the block.
    fn finish(self) -> ClaimValidation {
        ClaimValidation::from_errors(self.errors)
    }
}

// ============================================================================
// SECTION: Block Validators
// ============================================================================

/// Validates the identity claim block.
#[must_use]
pub fn validate_identity_claims(value: &Value) -> ClaimValidation {
    let mut checker = FieldChecker::new("identity", value);
    for name in ["instance_id", "asset_id", "asset_name"] {
        checker.non_empty_string(name);
    }
    checker.string("asset_version");
    checker.finish()
}

/// Validates the governance status claim block.
#[must_use]
pub fn validate_governance_claims(value: &Value) -> ClaimValidation {
    let mut checker = FieldChecker::new("governance", value);
    let risk_levels: Vec<&str> = RiskLevel::ALL.iter().map(|level| level.as_str()).collect();
    checker.one_of("risk_level", &risk_levels);
    checker.one_of("mode", &["NORMAL", "SANDBOX", "RESTRICTED"]);
    if let Some(thread) = checker.field("golden_thread") {
        let mut nested = FieldChecker::new("governance.golden_thread", thread);
        let hash = nested.string("hash");
        let verified = nested.boolean("verified");
        let ticket_id = nested.string("ticket_id");
        // An unverified thread may carry no hash; the policy layer decides.
        match hash {
            Some(hash) if !hash.is_empty() && !is_sha256_digest(hash) => {
                nested.invalid("hash", "must be a sha256: digest");
            }
            Some("") if verified == Some(true) => {
                nested.invalid("hash", "required when verified");
            }
            _ => {}
        }
        if verified == Some(true) && ticket_id.is_some_and(|id| id.trim().is_empty()) {
            nested.invalid("ticket_id", "required when verified");
        }
        checker.errors.extend(nested.errors);
    }
    checker.finish()
}

/// Validates the control claim block.
#[must_use]
pub fn validate_control_claims(value: &Value) -> ClaimValidation {
    let mut checker = FieldChecker::new("control", value);
    if let Some(kill_switch) = checker.field("kill_switch") {
        let mut nested = FieldChecker::new("control.kill_switch", kill_switch);
        nested.boolean("enabled");
        nested.one_of("channel", &["sse", "polling", "file"]);
        checker.errors.extend(nested.errors);
    }
    checker.boolean("paused");
    checker.boolean("termination_pending");
    checker.finish()
}

/// Validates the capability claim block.
#[must_use]
pub fn validate_capability_claims(value: &Value) -> ClaimValidation {
    let mut checker = FieldChecker::new("capabilities", value);
    checker.non_empty_string("hash");
    if let Some(tools) = checker.field("tools") {
        let all_strings =
            tools.as_array().is_some_and(|items| items.iter().all(Value::is_string));
        if !all_strings {
            checker.invalid("tools", "must be an array of strings");
        }
    }
    if let Some(budget) = checker.field("max_budget_usd") {
        let acceptable = budget.is_null() || budget.as_f64().is_some_and(|amount| amount >= 0.0);
        if !acceptable {
            checker.invalid("max_budget_usd", "must be null or a non-negative number");
        }
    }
    checker.boolean("can_spawn");
    checker.unsigned("max_child_depth");
    checker.finish()
}

/// Validates the lineage claim block.
#[must_use]
pub fn validate_lineage_claims(value: &Value) -> ClaimValidation {
    let mut checker = FieldChecker::new("lineage", value);
    let depth = checker.unsigned("generation_depth");
    checker.non_empty_string("root_instance_id");
    if let Some(parent) = checker.field("parent_instance_id") {
        match parent {
            Value::Null => {
                if depth.is_some_and(|depth| depth > 0) {
                    checker.invalid("parent_instance_id", "required when generation_depth > 0");
                }
            }
            Value::String(text) if !text.trim().is_empty() => {}
            _ => checker.invalid("parent_instance_id", "must be null or a non-empty string"),
        }
    }
    checker.finish()
}

/// Validates every block of a namespaced governance claim object.
#[must_use]
pub fn validate_claims(value: &Value) -> ClaimValidation {
    let mut errors = Vec::new();
    let Some(object) = value.as_object() else {
        return ClaimValidation::from_errors(vec!["aigos: must be an object".to_string()]);
    };
    let blocks: [(&str, fn(&Value) -> ClaimValidation); 5] = [
        ("identity", validate_identity_claims),
        ("governance", validate_governance_claims),
        ("control", validate_control_claims),
        ("capabilities", validate_capability_claims),
        ("lineage", validate_lineage_claims),
    ];
    for (name, validator) in blocks {
        match object.get(name) {
            Some(block) => errors.extend(validator(block).errors),
            None => errors.push(format!("{name}: missing")),
        }
    }
    ClaimValidation::from_errors(errors)
}

// ============================================================================
// SECTION: Capability Subset
// ============================================================================

/// Checks that `child` does not exceed any capability granted to `parent`.
#[must_use]
pub fn is_capability_subset(child: &CapabilityClaims, parent: &CapabilityClaims) -> SubsetCheck {
    let mut violations = Vec::new();
    for tool in &child.tools {
        if !parent.tools.contains(tool) {
            violations.push(format!("tool '{tool}' is not granted to the parent"));
        }
    }
    match (child.max_budget_usd, parent.max_budget_usd) {
        (_, None) => {}
        (None, Some(limit)) => {
            violations.push(format!("max_budget_usd unlimited exceeds parent limit {limit}"));
        }
        (Some(budget), Some(limit)) if budget > limit => {
            violations.push(format!("max_budget_usd {budget} exceeds parent limit {limit}"));
        }
        (Some(_), Some(_)) => {}
    }
    if child.can_spawn && !parent.can_spawn {
        violations.push("can_spawn is not permitted by the parent".to_string());
    }
    if child.max_child_depth > parent.max_child_depth {
        violations.push(format!(
            "max_child_depth {} exceeds parent limit {}",
            child.max_child_depth, parent.max_child_depth
        ));
    }
    SubsetCheck {
        valid: violations.is_empty(),
        violations,
    }
}
