//! Integration tests for the RPC execution core: guardrails, context folding, transport pass-through

use super::support::{client, ctx, profile, protected_profile, readonly_profile, MockTransport};
use odoo_agent::error::{ApiError, ErrorKind, ErrorReport, GuardrailKind};
use odoo_agent::Operation;
use serde_json::json;

#[tokio::test]
async fn test_protected_profile_rejects_mutations_even_with_override() {
    let transport = MockTransport::odoo();
    let client = client(protected_profile("prod"), transport.clone());

    for allow in [false, true] {
        let err = client
            .invoke(
                &Operation::create("res.partner", json!({"name": "Acme"})),
                None,
                allow,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Guardrail {
                kind: GuardrailKind::Protected,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::GuardrailProtected);
        assert!(!err.is_retryable());
    }
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_readonly_profile_needs_explicit_override() {
    let transport = MockTransport::odoo();
    let client = client(readonly_profile("staging"), transport.clone());
    let op = Operation::write("res.partner", &[7], json!({"name": "Renamed"}));

    let err = client.invoke(&op, None, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GuardrailReadonly);
    assert_eq!(transport.call_count(), 0);

    let result = client.invoke(&op, None, true).await.unwrap();
    assert_eq!(result, json!(true));
    assert_eq!(transport.calls_to("write").len(), 1);
}

#[tokio::test]
async fn test_unknown_methods_are_guarded_and_reads_are_not() {
    let transport = MockTransport::odoo();
    let client = client(readonly_profile("staging"), transport.clone());

    let err = client
        .execute("sale.order", "action_confirm", vec![json!([5])], Default::default(), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GuardrailReadonly);

    let groups = client
        .execute(
            "sale.order",
            "read_group",
            vec![json!([]), json!(["amount_total"]), json!(["partner_id"])],
            Default::default(),
            false,
        )
        .await
        .unwrap();
    assert_eq!(groups, json!({"called": "read_group"}));

    let ids = client
        .search("res.partner", json!([]), Some(10), None, None)
        .await
        .unwrap();
    assert_eq!(ids, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_effective_context_is_folded_into_kwargs() {
    let transport = MockTransport::odoo();
    let mut profile = profile("dev");
    profile.context = Some(ctx(json!({"lang": "en_US", "tz": "UTC"})));
    let client = client(profile.clone(), transport.clone())
        .with_global_context(Some(ctx(json!({"active_test": false, "tz": "Europe/Berlin"}))));

    let op = Operation::search("res.partner", json!([]))
        .kwarg("context", json!({"lang": "fr_FR", "from_kwargs": 1}))
        .with_context(Some(ctx(json!({"from_operation": true}))));
    let override_ctx = ctx(json!({"lang": "de_DE"}));

    client.invoke(&op, Some(&override_ctx), false).await.unwrap();

    let call = &transport.calls()[0];
    assert_eq!(
        call.kwargs["context"],
        json!({
            "lang": "de_DE",
            "tz": "Europe/Berlin",
            "active_test": false,
            "from_kwargs": 1,
            "from_operation": true
        })
    );
    assert_eq!(
        profile.context.unwrap(),
        ctx(json!({"lang": "en_US", "tz": "UTC"}))
    );
}

#[tokio::test]
async fn test_no_context_key_when_every_layer_is_empty() {
    let transport = MockTransport::odoo();
    let client = client(profile("dev"), transport.clone());

    client
        .search_read("res.partner", json!([]), None, Some(5), None, Some("name asc"))
        .await
        .unwrap();

    let call = &transport.calls()[0];
    assert!(!call.kwargs.contains_key("context"));
    assert_eq!(call.kwargs["limit"], json!(5));
    assert_eq!(call.kwargs["order"], json!("name asc"));
    assert_eq!(call.args, vec![json!([])]);
}

#[tokio::test]
async fn test_remote_errors_surface_verbatim() {
    let transport = MockTransport::new(|_| {
        Err(ApiError::Remote(
            "Invalid field 'colour' on model 'res.partner'".to_string(),
        ))
    });
    let client = client(profile("dev"), transport);

    let err = client
        .read("res.partner", &[1], Some(&["colour".to_string()]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(err.to_string().contains("Invalid field 'colour'"));

    let report = ErrorReport::new(&err, Some("dev"));
    assert_eq!(report.profile_name.as_deref(), Some("dev"));
    assert!(!report.retryable);
}

#[tokio::test]
async fn test_connection_errors_are_retryable_and_not_retried() {
    let transport = MockTransport::new(|_| {
        Err(ApiError::Connection {
            message: "Request timeout".to_string(),
            timeout: true,
        })
    });
    let client = client(profile("dev"), transport.clone());

    let err = client
        .search_count("res.partner", json!([]))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_payload_is_returned_unchanged() {
    let payload = json!({"weird": [1, {"nested": null}], "shape": "kept"});
    let expected = payload.clone();
    let transport = MockTransport::new(move |_| Ok(payload.clone()));
    let client = client(profile("dev"), transport);

    let result = client
        .execute("x.model", "search", vec![json!([])], Default::default(), false)
        .await
        .unwrap();
    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_list_models_sorted() {
    let transport = MockTransport::new(|call| {
        assert_eq!(call.model, "ir.model");
        Ok(json!([{"model": "sale.order"}, {"model": "res.partner"}, {"model": "account.move"}]))
    });
    let client = client(profile("dev"), transport);

    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["account.move", "res.partner", "sale.order"]);
}

#[tokio::test]
async fn test_search_count_rejects_non_integer() {
    let transport = MockTransport::new(|_| Ok(json!("three")));
    let client = client(profile("dev"), transport);
    let err = client
        .search_count("res.partner", json!([]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
}
