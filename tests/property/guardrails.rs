//! Property-based tests for mutation guardrails

use odoo_agent::error::{ApiError, GuardrailKind};
use odoo_agent::guardrail::{check, GuardrailDecision};
use odoo_agent::operation::{OperationKind, KNOWN_READ_METHODS};
use odoo_agent::{Operation, Profile};
use proptest::prelude::*;

fn profile(readonly: bool, protected: bool) -> Profile {
    let mut profile = Profile::new("p", "http://localhost:8069", "db", "admin", "pw");
    profile.readonly = readonly;
    profile.protected = protected;
    profile
}

fn unknown_method() -> impl Strategy<Value = String> {
    "[a-z_]{1,20}".prop_filter("known read method", |m| {
        !KNOWN_READ_METHODS.contains(&m.as_str())
    })
}

/// Any method off the read list is a mutation
#[test]
fn test_unknown_methods_are_mutations() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&unknown_method(), |method| {
            prop_assert_eq!(OperationKind::classify(&method), OperationKind::Mutation);
            prop_assert!(Operation::new("res.partner", method.as_str()).is_mutation());
            Ok(())
        })
        .unwrap();
}

/// Protected profiles reject every mutation regardless of flags and override
#[test]
fn test_protected_always_rejects_mutations() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(unknown_method(), any::<bool>(), any::<bool>()),
            |(method, readonly, allow_override)| {
                let operation = Operation::new("res.partner", method.as_str());
                let result = check(&profile(readonly, true), &operation, allow_override);
                prop_assert!(matches!(
                    result,
                    Err(ApiError::Guardrail {
                        kind: GuardrailKind::Protected,
                        ..
                    })
                ), "expected Protected guardrail error, got {:?}", result);
                Ok(())
            },
        )
        .unwrap();
}

/// Read-only profiles allow a mutation exactly when the override is given
#[test]
fn test_readonly_requires_override() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(unknown_method(), any::<bool>()), |(method, allow_override)| {
            let operation = Operation::new("res.partner", method.as_str());
            let result = check(&profile(true, false), &operation, allow_override);
            if allow_override {
                prop_assert_eq!(result.ok(), Some(GuardrailDecision::Overridden));
            } else {
                prop_assert!(matches!(
                    result,
                    Err(ApiError::Guardrail {
                        kind: GuardrailKind::Readonly,
                        ..
                    })
                ), "expected Readonly guardrail error, got {:?}", result);
            }
            Ok(())
        })
        .unwrap();
}

/// Reads pass on every profile
#[test]
fn test_reads_are_never_gated() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::sample::select(KNOWN_READ_METHODS.to_vec()),
                any::<bool>(),
                any::<bool>(),
                any::<bool>(),
            ),
            |(method, readonly, protected, allow_override)| {
                let operation = Operation::new("res.partner", method);
                let result = check(&profile(readonly, protected), &operation, allow_override);
                prop_assert_eq!(result.ok(), Some(GuardrailDecision::Read));
                Ok(())
            },
        )
        .unwrap();
}
