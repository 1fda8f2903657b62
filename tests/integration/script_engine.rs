//! Integration tests for the script engine: ordering, references, failure policies, rollback

use super::support::{client, ctx, profile, protected_profile, readonly_profile, MockTransport};
use odoo_agent::error::{ApiError, ErrorKind};
use odoo_agent::script::{
    OnError, RollbackAction, RunState, ScriptDocument, ScriptEngine,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn document(value: Value) -> ScriptDocument {
    ScriptDocument::from_json_str(&value.to_string()).unwrap()
}

/// A succeeds, B fails, C depends on B.
fn a_b_c() -> ScriptDocument {
    document(json!({
        "version": 1,
        "operations": [
            {"id": "A", "action": "search", "model": "res.partner"},
            {"id": "B", "action": "search", "model": "fail.model"},
            {"id": "C", "action": "read", "model": "res.partner", "ids": "$B.ids"}
        ]
    }))
}

#[tokio::test]
async fn test_stop_policy_skips_remaining_steps() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());

    let result = ScriptEngine::new(&client)
        .run(&a_b_c(), Some(OnError::Stop))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.state, RunState::Failed);
    assert!(result.get("A").unwrap().success);
    assert!(!result.get("B").unwrap().success);
    assert!(result.get("C").is_none());
    assert_eq!(result.order, vec!["A", "B"]);
    assert_eq!(result.failed_steps, vec!["B"]);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_stop_is_the_default_policy() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport);

    let result = ScriptEngine::new(&client).run(&a_b_c(), None).await.unwrap();
    assert_eq!(result.on_error, OnError::Stop);
    assert!(result.get("C").is_none());
}

#[tokio::test]
async fn test_continue_policy_marks_dependents_failed() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());

    let result = ScriptEngine::new(&client)
        .run(&a_b_c(), Some(OnError::Continue))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.state, RunState::Completed);
    assert!(result.get("A").unwrap().success);
    assert_eq!(
        result.get("B").unwrap().error.as_ref().unwrap().kind,
        ErrorKind::Remote
    );
    let c = result.get("C").unwrap();
    assert!(!c.success);
    assert_eq!(c.error.as_ref().unwrap().kind, ErrorKind::DependencyFailed);
    assert_eq!(result.failed_steps, vec!["B", "C"]);
    assert!(transport.calls_to("read").is_empty());
}

#[tokio::test]
async fn test_dependency_failure_is_transitive() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "on_error": "continue",
        "operations": [
            {"id": "B", "action": "search", "model": "fail.model"},
            {"id": "C", "action": "read", "model": "res.partner", "ids": "$B.ids"},
            {"id": "D", "action": "read", "model": "res.partner", "ids": "$C.ids"},
            {"id": "E", "action": "search_count", "model": "res.partner"}
        ]
    }));

    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();
    assert_eq!(
        result.get("D").unwrap().error.as_ref().unwrap().kind,
        ErrorKind::DependencyFailed
    );
    assert!(result.get("E").unwrap().success);
    assert_eq!(result.order, vec!["B", "C", "D", "E"]);
}

#[tokio::test]
async fn test_ids_reference_substitutes_literal_list() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "A", "action": "search", "model": "res.partner", "domain": [["is_company", "=", true]]},
            {"id": "B", "action": "search_read", "model": "sale.order",
             "domain": [["partner_id", "in", "$A.ids"]], "fields": ["name"]},
            {"id": "C", "action": "read", "model": "res.partner", "ids": "$A.ids"}
        ]
    }));

    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();
    assert!(result.success);

    let search_read = &transport.calls_to("search_read")[0];
    assert_eq!(search_read.args, vec![json!([["partner_id", "in", [1, 2, 3]]])]);
    assert_eq!(search_read.kwargs["fields"], json!(["name"]));

    let read = &transport.calls_to("read")[0];
    assert_eq!(read.args, vec![json!([1, 2, 3])]);
    assert_eq!(result.get("C").unwrap().ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_created_id_feeds_later_steps() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "partner", "action": "create", "model": "res.partner", "values": {"name": "Acme"}},
            {"id": "order", "action": "create", "model": "sale.order",
             "values": {"partner_id": "$partner", "note": "Costs $5"}},
            {"id": "confirm", "action": "execute", "model": "sale.order",
             "method": "action_confirm", "args": ["$order.ids"]}
        ]
    }));

    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.get("partner").unwrap().ids, vec![100]);

    let order_create = &transport.calls_to("create")[1];
    assert_eq!(
        order_create.args,
        vec![json!({"partner_id": 100, "note": "Costs $5"})]
    );
    let confirm = &transport.calls_to("action_confirm")[0];
    assert_eq!(confirm.args, vec![json!([101])]);
}

#[tokio::test]
async fn test_resolution_failure_is_attributed_to_current_step() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "A", "action": "search_read", "model": "res.partner"},
            {"id": "B", "action": "write", "model": "res.partner", "ids": [1],
             "values": {"name": "$A.5.name"}}
        ]
    }));

    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();
    assert!(result.get("A").unwrap().success);
    let b = result.get("B").unwrap();
    let error = b.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::VariableResolution);
    assert!(error.message.contains("'B'"));
    assert!(transport.calls_to("write").is_empty());
}

#[tokio::test]
async fn test_forward_reference_rejected_before_execution() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "A", "action": "search", "model": "res.partner"},
            {"id": "B", "action": "read", "model": "res.partner", "ids": "$C.ids"},
            {"id": "C", "action": "search", "model": "res.partner"}
        ]
    }));

    let err = ScriptEngine::new(&client).run(&doc, None).await.unwrap_err();
    assert!(matches!(err, ApiError::ScriptDefinition(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_rollback_deletes_created_records_in_reverse_order() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());
    let doc = document(json!({
        "version": 1,
        "on_error": "rollback",
        "operations": [
            {"id": "first", "action": "create", "model": "res.partner", "values": {"name": "One"}},
            {"id": "rename", "action": "write", "model": "res.partner", "ids": [7], "values": {"name": "Seven"}},
            {"id": "second", "action": "create", "model": "res.partner.category", "values": {"name": "Two"}},
            {"id": "lookup", "action": "search", "model": "res.partner"},
            {"id": "boom", "action": "create", "model": "fail.model", "values": {}},
            {"id": "never", "action": "search", "model": "res.partner"}
        ]
    }));

    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.state, RunState::RolledBack);
    assert!(result.get("never").is_none());

    let steps: Vec<&str> = result.rollback.iter().map(|e| e.step.as_str()).collect();
    assert_eq!(steps, vec!["second", "rename", "first"]);
    assert_eq!(result.rollback[0].action, RollbackAction::Deleted);
    assert_eq!(result.rollback[0].ids, vec![101]);
    assert_eq!(result.rollback[1].action, RollbackAction::Skipped);
    assert_eq!(result.rollback[2].action, RollbackAction::Deleted);
    assert_eq!(result.rollback[2].ids, vec![100]);

    let unlinks = transport.calls_to("unlink");
    assert_eq!(unlinks.len(), 2);
    assert_eq!(unlinks[0].model, "res.partner.category");
    assert_eq!(unlinks[0].args, vec![json!([101])]);
    assert_eq!(unlinks[1].model, "res.partner");
    assert_eq!(unlinks[1].args, vec![json!([100])]);
}

#[tokio::test]
async fn test_failed_rollback_leaves_run_failed() {
    let transport = MockTransport::new(|call| match call.method.as_str() {
        "create" if call.model == "res.partner" => Ok(json!(42)),
        "unlink" => Err(ApiError::Remote("Record is referenced".to_string())),
        _ => Err(ApiError::Remote("boom".to_string())),
    });
    let client = client(profile("dev"), transport);
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "make", "action": "create", "model": "res.partner", "values": {"name": "X"}},
            {"id": "break", "action": "search", "model": "res.partner"}
        ]
    }));

    let result = ScriptEngine::new(&client)
        .run(&doc, Some(OnError::Rollback))
        .await
        .unwrap();
    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.rollback[0].action, RollbackAction::Failed);
    assert!(result.rollback[0].message.as_ref().unwrap().contains("referenced"));
}

#[tokio::test]
async fn test_script_mutations_respect_guardrails() {
    let doc = document(json!({
        "version": 1,
        "operations": [
            {"id": "find", "action": "search", "model": "res.partner"},
            {"id": "drop", "action": "unlink", "model": "res.partner", "ids": "$find.ids"}
        ]
    }));

    let transport = MockTransport::odoo();
    let readonly = client(readonly_profile("staging"), transport.clone());
    let result = ScriptEngine::new(&readonly).run(&doc, None).await.unwrap();
    assert_eq!(
        result.get("drop").unwrap().error.as_ref().unwrap().kind,
        ErrorKind::GuardrailReadonly
    );

    let result = ScriptEngine::new(&readonly)
        .with_mutation_override(true)
        .run(&doc, None)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.get("drop").unwrap().ids, vec![1, 2, 3]);

    let protected = client(protected_profile("prod"), MockTransport::odoo());
    let result = ScriptEngine::new(&protected)
        .with_mutation_override(true)
        .run(&doc, None)
        .await
        .unwrap();
    assert_eq!(
        result.get("drop").unwrap().error.as_ref().unwrap().kind,
        ErrorKind::GuardrailProtected
    );
}

#[tokio::test]
async fn test_script_and_step_context_layering() {
    let transport = MockTransport::odoo();
    let mut profile = profile("dev");
    profile.context = Some(ctx(json!({"lang": "en_US", "tz": "UTC", "company": 1})));
    let client = client(profile, transport.clone())
        .with_global_context(Some(ctx(json!({"tz": "Europe/Paris", "global": true}))));
    let doc = document(json!({
        "version": 1,
        "context": {"lang": "fr_FR", "script": true},
        "operations": [
            {"id": "plain", "action": "search", "model": "res.partner"},
            {"id": "local", "action": "search", "model": "res.partner", "context": {"lang": "de_DE"}}
        ]
    }));

    ScriptEngine::new(&client).run(&doc, None).await.unwrap();

    let calls = transport.calls_to("search");
    assert_eq!(
        calls[0].kwargs["context"],
        json!({"lang": "fr_FR", "tz": "Europe/Paris", "company": 1, "global": true, "script": true})
    );
    assert_eq!(calls[1].kwargs["context"]["lang"], json!("de_DE"));
    assert_eq!(calls[1].kwargs["context"]["script"], json!(true));
}

#[tokio::test]
async fn test_toml_document_from_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("batch.toml");
    std::fs::write(
        &path,
        r#"
version = 1

[[operations]]
id = "count"
action = "search_count"
model = "res.partner"
domain = [["customer_rank", ">", 0]]
"#,
    )
    .unwrap();

    let doc = ScriptDocument::from_path(&path).unwrap();
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport);
    let result = ScriptEngine::new(&client).run(&doc, None).await.unwrap();
    assert_eq!(result.get("count").unwrap().value, Some(json!(3)));
}

fn three_independent_steps() -> ScriptDocument {
    document(json!({
        "version": 1,
        "operations": [
            {"id": "a", "action": "search", "model": "res.partner"},
            {"id": "b", "action": "search_count", "model": "res.partner"},
            {"id": "c", "action": "fields_get", "model": "res.partner"}
        ]
    }))
}

#[tokio::test]
async fn test_auth_failure_ends_the_run_under_every_policy() {
    for policy in [OnError::Continue, OnError::Stop, OnError::Rollback] {
        let transport =
            MockTransport::new(|_| Err(ApiError::Auth("Access Denied".to_string())));
        let client = client(profile("dev"), transport.clone());

        let result = ScriptEngine::new(&client)
            .run(&three_independent_steps(), Some(policy))
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 1, "policy {}", policy);
        assert_eq!(result.order, vec!["a"]);
        assert!(!result.success);
        assert_eq!(result.state, RunState::Failed);
        assert_eq!(
            result.get("a").unwrap().error.as_ref().unwrap().kind,
            ErrorKind::Auth
        );
        assert!(result.rollback.is_empty());
    }
}
