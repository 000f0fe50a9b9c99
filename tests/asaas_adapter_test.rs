mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use paygate_sync::adapters::asaas::{AsaasAdapter, AsaasConfig, is_billing_type_rejection};
use paygate_sync::domain::error::PaymentError;
use paygate_sync::domain::gateway::{CustomerRef, GatewayAdapter};
use paygate_sync::domain::money::MoneyAmount;
use paygate_sync::domain::payment::{Gateway, PaymentMethod, PaymentStatus};
use serde_json::json;
use std::time::Duration;

/// Happy-path provider: no existing customers, charges echo the requested
/// billing type, QR codes come from the dedicated endpoint.
fn asaas_ok(req: &RecordedRequest) -> (u16, serde_json::Value) {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/customers") => (200, json!({ "data": [], "totalCount": 0 })),
        ("POST", "/customers") => (200, json!({ "id": "cus_000001" })),
        ("POST", "/payments") => (
            200,
            json!({
                "id": "pay_000001",
                "status": "PENDING",
                "billingType": req.body["billingType"],
                "value": req.body["value"],
            }),
        ),
        ("GET", "/payments/pay_000001/pixQrCode") => (
            200,
            json!({
                "encodedImage": "iVBORw0KGgo=",
                "payload": "00020126580014br.gov.bcb.pix0136asaas",
                "expirationDate": "2026-10-20 23:59:59",
            }),
        ),
        _ => (404, json!({ "errors": [{ "code": "not_found", "description": "not found" }] })),
    }
}

// ── 1. pix_charge_resolves_customer_then_fetches_qr ────────────────────────

#[tokio::test]
async fn pix_charge_resolves_customer_then_fetches_qr() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::Pix, 10_000, 1);

    let created = adapter.create(&req).await.unwrap();

    assert_eq!(created.gateway_payment_id, "pay_000001");
    assert_eq!(created.status, PaymentStatus::Pending);
    assert_eq!(created.payment_method, PaymentMethod::Pix);
    let pix = created.pix.expect("pix data");
    assert_eq!(pix.code, "00020126580014br.gov.bcb.pix0136asaas");
    assert_eq!(pix.qr_code_base64.as_deref(), Some("iVBORw0KGgo="));

    // Expiry is ours (request time + 5 min), not the provider's end-of-day.
    let expected = req.requested_at + ChronoDuration::minutes(5);
    assert_eq!(pix.expires_at, Some(expected));

    let order: Vec<_> = fake
        .requests()
        .iter()
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(
        order,
        [
            "GET /customers",
            "POST /customers",
            "POST /payments",
            "GET /payments/pay_000001/pixQrCode",
        ]
    );
}

// ── 2. charge_body_carries_reference_value_and_due_date ────────────────────

#[tokio::test]
async fn charge_body_carries_reference_value_and_due_date() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::Boleto, 15_050, 1);

    adapter.create(&req).await.unwrap();

    let post = &fake.requests_to("POST", "/payments")[0];
    assert_eq!(post.headers.get("access_token").map(String::as_str), Some("asaas_test_key"));
    assert_eq!(post.body["customer"], "cus_000001");
    assert_eq!(post.body["billingType"], "BOLETO");
    assert_eq!(post.body["value"], 150.5);
    assert_eq!(post.body["externalReference"], req.order_id.to_string());
    let due = post.body["dueDate"].as_str().unwrap();
    assert_eq!(due.len(), 10, "date only: {due}");
}

// ── 3. single_installment_sends_no_installment_fields ──────────────────────

#[tokio::test]
async fn single_installment_sends_no_installment_fields() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::CreditCard, 10_000, 1);

    adapter.create(&req).await.unwrap();

    let body = &fake.requests_to("POST", "/payments")[0].body;
    assert!(body.get("installmentCount").is_none());
    assert!(body.get("installmentValue").is_none());
    assert_eq!(body["creditCardToken"], "card_tok_123");
    assert_eq!(body["remoteIp"], "200.100.50.25");
}

// ── 4. installments_split_value_rounded_to_centavos ────────────────────────

#[tokio::test]
async fn installments_split_value_rounded_to_centavos() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::CreditCard, 10_000, 3);

    adapter.create(&req).await.unwrap();

    let body = &fake.requests_to("POST", "/payments")[0].body;
    assert_eq!(body["installmentCount"], 3);
    assert_eq!(body["installmentValue"], 33.33);
}

// ── 5. raw_card_goes_with_holder_info ──────────────────────────────────────

#[tokio::test]
async fn raw_card_goes_with_holder_info() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let mut req = charge_request(PaymentMethod::CreditCard, 5_000, 1);
    req.card = Some(raw_card());

    adapter.create(&req).await.unwrap();

    let body = &fake.requests_to("POST", "/payments")[0].body;
    assert!(body.get("creditCardToken").is_none());
    assert_eq!(body["creditCard"]["number"], "4111111111111111");
    assert_eq!(body["creditCard"]["ccv"], "123");
    assert_eq!(body["creditCardHolderInfo"]["cpfCnpj"], "52998224725");
    assert_eq!(body["creditCardHolderInfo"]["postalCode"], "01310-100");
}

// ── 6. missing_tax_id_fails_before_any_network_call ────────────────────────

#[tokio::test]
async fn missing_tax_id_fails_before_any_network_call() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);
    let mut req = charge_request(PaymentMethod::Pix, 10_000, 1);
    req.customer = customer_without_tax_id();

    let err = adapter.create(&req).await.unwrap_err();

    assert!(matches!(err, PaymentError::Precondition(_)), "got {err:?}");
    assert!(fake.requests().is_empty());
}

// ── 7. existing_customer_is_reused ─────────────────────────────────────────

#[tokio::test]
async fn existing_customer_is_reused() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/customers") => (200, json!({ "data": [{ "id": "cus_existing" }] })),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);

    let resolver = adapter.customer_resolver().expect("asaas resolves customers");
    let found = resolver.resolve(&customer()).await.unwrap();

    assert_eq!(
        found,
        CustomerRef {
            id: "cus_existing".into(),
            created: false
        }
    );
    let search = &fake.requests_to("GET", "/customers")[0];
    assert_eq!(search.query.as_deref(), Some("cpfCnpj=52998224725"));
    assert!(fake.requests_to("POST", "/customers").is_empty());
}

// ── 8. new_customer_is_created_with_address ────────────────────────────────

#[tokio::test]
async fn new_customer_is_created_with_address() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);

    let created = adapter
        .customer_resolver()
        .unwrap()
        .resolve(&customer())
        .await
        .unwrap();

    assert!(created.created);
    assert_eq!(created.id, "cus_000001");
    let body = &fake.requests_to("POST", "/customers")[0].body;
    assert_eq!(body["cpfCnpj"], "52998224725");
    assert_eq!(body["name"], "Maria Souza");
    assert_eq!(body["addressNumber"], "1000");
    assert_eq!(body["province"], "Bela Vista");
    assert_eq!(body["notificationDisabled"], true);
}

// ── 9. resolver_without_tax_id_never_creates ───────────────────────────────

#[tokio::test]
async fn resolver_without_tax_id_never_creates() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);

    let err = adapter
        .customer_resolver()
        .unwrap()
        .resolve(&customer_without_tax_id())
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Precondition(_)));
    assert!(fake.requests_to("POST", "/customers").is_empty());
}

// ── 10. card_rejection_falls_back_to_boleto_then_pays_with_card ────────────

#[tokio::test]
async fn card_rejection_falls_back_to_boleto_then_pays_with_card() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/payments") if req.body["billingType"] == "CREDIT_CARD" => {
            bad_request("invalid_billingType", "Forma de pagamento não permitida para esta cobrança")
        }
        ("POST", "/payments") => (
            200,
            json!({ "id": "pay_boleto", "status": "PENDING", "billingType": "BOLETO" }),
        ),
        ("POST", "/payments/pay_boleto/payWithCreditCard") => (
            200,
            json!({ "id": "pay_boleto", "status": "CONFIRMED", "billingType": "CREDIT_CARD" }),
        ),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::CreditCard, 10_000, 1);

    let created = adapter.create(&req).await.unwrap();

    assert_eq!(created.gateway_payment_id, "pay_boleto");
    assert_eq!(created.payment_method, PaymentMethod::CreditCard);
    assert_eq!(created.status, PaymentStatus::Approved);

    let charges = fake.requests_to("POST", "/payments");
    assert_eq!(charges.len(), 2);
    assert_eq!(charges[1].body["billingType"], "BOLETO");
    assert!(charges[1].body.get("creditCardToken").is_none());
    let pay = &fake.requests_to("POST", "/payments/pay_boleto/payWithCreditCard")[0];
    assert_eq!(pay.body["creditCardToken"], "card_tok_123");
}

// ── 11. failed_pay_with_card_keeps_the_boleto_charge ───────────────────────

#[tokio::test]
async fn failed_pay_with_card_keeps_the_boleto_charge() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/payments") if req.body["billingType"] == "CREDIT_CARD" => {
            bad_request("invalid_billingType", "billingType not allowed")
        }
        ("POST", "/payments") => (
            200,
            json!({ "id": "pay_boleto", "status": "PENDING", "billingType": "BOLETO" }),
        ),
        ("POST", "/payments/pay_boleto/payWithCreditCard") => {
            bad_request("invalid_creditCard", "Cartão recusado")
        }
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::CreditCard, 10_000, 1);

    let created = adapter.create(&req).await.unwrap();

    assert_eq!(created.gateway_payment_id, "pay_boleto");
    assert_eq!(created.payment_method, PaymentMethod::Boleto);
    assert_eq!(created.status, PaymentStatus::Pending);
}

// ── 12. other_rejections_are_not_retried ───────────────────────────────────

#[tokio::test]
async fn other_rejections_are_not_retried() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/payments") => (
            400,
            json!({ "errors": [
                { "code": "invalid_value", "description": "Valor mínimo é R$ 5,00" },
                { "code": "invalid_dueDate", "description": "Data de vencimento inválida" },
            ]}),
        ),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);
    let req = charge_request(PaymentMethod::CreditCard, 100, 1);

    let err = adapter.create(&req).await.unwrap_err();

    match err {
        PaymentError::Provider {
            gateway,
            status,
            message,
            code,
        } => {
            assert_eq!(gateway, Gateway::Asaas);
            assert_eq!(status, 400);
            assert_eq!(message, "Valor mínimo é R$ 5,00; Data de vencimento inválida");
            assert_eq!(code.as_deref(), Some("invalid_value"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.requests_to("POST", "/payments").len(), 1);
}

// ── 13. inline_pix_payload_skips_qr_endpoint ───────────────────────────────

#[tokio::test]
async fn inline_pix_payload_skips_qr_endpoint() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/payments") => (
            200,
            json!({
                "id": "pay_inline",
                "status": "PENDING",
                "billingType": "PIX",
                "pixQrCode": null,
                "qrCode": { "payload": "000201inline", "encodedImage": "aW5saW5l" },
            }),
        ),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);

    let created = adapter
        .create(&charge_request(PaymentMethod::Pix, 2_000, 1))
        .await
        .unwrap();

    let pix = created.pix.unwrap();
    assert_eq!(pix.code, "000201inline");
    assert_eq!(pix.qr_code_base64.as_deref(), Some("aW5saW5l"));
    assert!(fake.requests_to("GET", "/payments/pay_inline/pixQrCode").is_empty());
}

// ── 14. qr_failure_does_not_fail_creation ──────────────────────────────────

#[tokio::test]
async fn qr_failure_does_not_fail_creation() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/payments/pay_000001/pixQrCode") => (500, json!({ "message": "try again" })),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);

    let created = adapter
        .create(&charge_request(PaymentMethod::Pix, 2_000, 1))
        .await
        .unwrap();

    assert_eq!(created.status, PaymentStatus::Pending);
    assert!(created.pix.is_none());
}

// ── 15. fetch_and_refund_use_payment_endpoints ─────────────────────────────

#[tokio::test]
async fn fetch_and_refund_use_payment_endpoints() {
    let fake = FakeProvider::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/payments/pay_42") => (
            200,
            json!({ "id": "pay_42", "status": "RECEIVED", "billingType": "PIX", "transactionId": "E1234" }),
        ),
        ("POST", "/payments/pay_42/refund") => (200, json!({ "id": "pay_42", "status": "REFUNDED" })),
        _ => asaas_ok(req),
    })
    .await;
    let adapter = asaas_adapter(&fake.base_url);

    let fetched = adapter.fetch("pay_42").await.unwrap();
    assert_eq!(fetched.status, PaymentStatus::Approved);
    assert_eq!(fetched.provider_status, "RECEIVED");
    assert_eq!(fetched.gateway_transaction_id.as_deref(), Some("E1234"));

    adapter
        .refund("pay_42", Some(MoneyAmount::new(2_550).unwrap()))
        .await
        .unwrap();
    adapter.refund("pay_42", None).await.unwrap();

    let refunds = fake.requests_to("POST", "/payments/pay_42/refund");
    assert_eq!(refunds[0].body, json!({ "value": 25.5 }));
    assert_eq!(refunds[1].body, json!({}));
}

// ── 16. slow_provider_surfaces_as_timeout ──────────────────────────────────

#[tokio::test]
async fn slow_provider_surfaces_as_timeout() {
    let fake = FakeProvider::slow(Duration::from_secs(2), asaas_ok).await;
    let adapter = AsaasAdapter::new(
        AsaasConfig {
            api_key: "asaas_test_key".into(),
            base_url: fake.base_url.clone(),
        },
        Duration::from_millis(200),
    )
    .unwrap();

    let err = adapter.fetch("pay_000001").await.unwrap_err();

    assert!(err.is_timeout(), "got {err:?}");
}

// ── 17. billing_type_rejection_detection ───────────────────────────────────

#[test]
fn billing_type_rejection_detection() {
    let provider = |code: Option<&str>, message: &str| PaymentError::Provider {
        gateway: Gateway::Asaas,
        status: 400,
        message: message.into(),
        code: code.map(str::to_string),
    };

    assert!(is_billing_type_rejection(&provider(Some("invalid_billingType"), "x")));
    assert!(is_billing_type_rejection(&provider(
        None,
        "Forma de pagamento não permitida"
    )));
    assert!(!is_billing_type_rejection(&provider(Some("invalid_value"), "Valor inválido")));
    // naming the field is not the same as refusing the billing type
    assert!(!is_billing_type_rejection(&provider(
        Some("invalid_creditCard"),
        "Informe os dados do titular do cartão para billingType CREDIT_CARD"
    )));
    assert!(!is_billing_type_rejection(&provider(None, "billing type is required")));
    assert!(is_billing_type_rejection(&provider(None, "Billing type not allowed for this charge")));
    assert!(!is_billing_type_rejection(&PaymentError::precondition("billingType")));
}

// ── 18. due_date_for_pix_is_today_or_tomorrow ─────────────────────────────

#[tokio::test]
async fn due_date_for_pix_is_today_or_tomorrow() {
    let fake = FakeProvider::start(asaas_ok).await;
    let adapter = asaas_adapter(&fake.base_url);

    adapter
        .create(&charge_request(PaymentMethod::Pix, 1_000, 1))
        .await
        .unwrap();

    let due = fake.requests_to("POST", "/payments")[0].body["dueDate"]
        .as_str()
        .unwrap()
        .to_string();
    let brt = chrono::FixedOffset::west_opt(3 * 3600).unwrap();
    let today = Utc::now().with_timezone(&brt).date_naive();
    let tomorrow = today.succ_opt().unwrap();
    assert!(
        due == today.to_string() || due == tomorrow.to_string(),
        "due date {due}"
    );
}
