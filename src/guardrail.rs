//! Guardrail Enforcer
//!
//! Decides whether a mutation may run against a profile. Protected profiles reject
//! every mutation, with or without an override. Read-only profiles reject mutations
//! unless the caller explicitly passed the override; the override is never implied.
//! Reads are never gated.

use crate::error::{ApiError, GuardrailKind};
use crate::operation::Operation;
use crate::profile::Profile;

/// Outcome of a permitted guardrail check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailDecision {
    /// Read operation, not gated
    Read,
    /// Mutation on a writable profile
    Allowed,
    /// Mutation on a read-only profile, allowed by the explicit override
    Overridden,
}

/// Check an operation against the profile's safety flags.
pub fn check(
    profile: &Profile,
    operation: &Operation,
    allow_mutation_override: bool,
) -> Result<GuardrailDecision, ApiError> {
    if !operation.is_mutation() {
        return Ok(GuardrailDecision::Read);
    }

    let rejection = |kind| ApiError::Guardrail {
        kind,
        profile: profile.name.clone(),
        model: operation.model.clone(),
        method: operation.method.clone(),
    };

    if profile.protected {
        tracing::warn!(
            profile = %profile.name,
            model = %operation.model,
            method = %operation.method,
            "Mutation rejected: profile is protected"
        );
        return Err(rejection(GuardrailKind::Protected));
    }

    if profile.readonly {
        if !allow_mutation_override {
            tracing::warn!(
                profile = %profile.name,
                model = %operation.model,
                method = %operation.method,
                "Mutation rejected: profile is readonly"
            );
            return Err(rejection(GuardrailKind::Readonly));
        }
        tracing::warn!(
            profile = %profile.name,
            model = %operation.model,
            method = %operation.method,
            "Readonly profile overridden for mutation"
        );
        return Ok(GuardrailDecision::Overridden);
    }

    Ok(GuardrailDecision::Allowed)
}
