/// Integration tests for billing and the Stripe webhook
///
/// - Price listing and subscription lookup
/// - Checkout (including first-time onboarding) and the billing portal
/// - Webhook signature enforcement
/// - Company reconciliation from checkout, subscription and invoice events

mod common;

use axum::http::StatusCode;
use common::{
    TestContext, APP_URL, PRICE_ENTERPRISE, PRICE_PROFESSIONAL, PRICE_STARTER, WEBHOOK_SECRET,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use shyft_shared::{
    billing::provider::{Price, Subscription, SubscriptionItem, SubscriptionItems},
    db::store::Store,
    models::company::{CreateCompany, SubscriptionTier, UpdateCompany},
};

/// Signs a body the way Stripe does: HMAC-SHA256 over `"{t}.{body}"`
fn stripe_signature(body: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn event(event_type: &str, object: Value) -> Value {
    json!({
        "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
        "object": "event",
        "type": event_type,
        "data": { "object": object }
    })
}

fn subscription_object(customer: &str, status: &str, price: &str) -> Value {
    json!({
        "id": "sub_123",
        "object": "subscription",
        "customer": customer,
        "status": status,
        "items": { "data": [ { "price": { "id": price } } ] }
    })
}

async fn attach_customer(ctx: &TestContext, customer_id: &str) {
    ctx.store
        .update_company(
            ctx.company.id,
            UpdateCompany {
                stripe_customer_id: Some(Some(customer_id.to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_prices() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.call("GET", "/billing/prices", None).await;
    assert_eq!(status, StatusCode::OK);

    let prices = body["data"].as_array().unwrap();
    assert_eq!(prices.len(), 3);
    assert_eq!(prices[0]["tier"], "starter");
    assert_eq!(prices[0]["price_id"], PRICE_STARTER);
    assert_eq!(prices[0]["unit_amount"], 2900);
    assert_eq!(prices[0]["currency"], "usd");
    assert_eq!(prices[0]["interval"], "month");
    assert_eq!(prices[1]["price_id"], PRICE_PROFESSIONAL);
    assert_eq!(prices[2]["price_id"], PRICE_ENTERPRISE);
}

#[tokio::test]
async fn test_subscription_defaults_to_free() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.call("GET", "/billing/subscription", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tier"], "free");
    assert!(body["data"]["subscription"].is_null());

    // Not onboarded yet
    let (_, token) = ctx.auth.create_user("new@user.test", "password1").await;
    let (status, body) = ctx
        .call_as(Some(&token), "GET", "/billing/subscription", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tier"], "free");
    assert!(body["data"]["status"].is_null());
}

#[tokio::test]
async fn test_subscription_reports_stripe_state() {
    let ctx = TestContext::new().await;
    attach_customer(&ctx, "cus_live").await;
    ctx.store
        .update_company(
            ctx.company.id,
            UpdateCompany {
                subscription_tier: Some(SubscriptionTier::Professional),
                subscription_status: Some("active".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    ctx.payments
        .set_subscription(Subscription {
            id: "sub_live".to_string(),
            customer: "cus_live".to_string(),
            status: "active".to_string(),
            current_period_end: Some(1_767_225_600),
            cancel_at_period_end: true,
            items: SubscriptionItems {
                data: vec![SubscriptionItem {
                    price: Price {
                        id: PRICE_PROFESSIONAL.to_string(),
                        unit_amount: Some(7900),
                        currency: "usd".to_string(),
                        recurring: None,
                    },
                }],
            },
        })
        .await;

    let (status, body) = ctx.call("GET", "/billing/subscription", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["tier"], "professional");
    assert_eq!(data["status"], "active");
    assert_eq!(data["subscription"]["id"], "sub_live");
    assert_eq!(data["subscription"]["price_id"], PRICE_PROFESSIONAL);
    assert_eq!(data["subscription"]["cancel_at_period_end"], true);
    assert_eq!(
        data["subscription"]["current_period_end"],
        "2026-01-01T00:00:00Z"
    );
}

#[tokio::test]
async fn test_checkout_unknown_price() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .call(
            "POST",
            "/billing/checkout",
            Some(json!({ "price_id": "price_made_up" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown price: price_made_up");
    assert!(ctx.payments.customers().await.is_empty());
}

#[tokio::test]
async fn test_checkout_creates_customer_once() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .call(
            "POST",
            "/billing/checkout",
            Some(json!({ "price_id": PRICE_STARTER })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["session_id"], "cs_mock_1");
    assert_eq!(body["data"]["url"], "https://checkout.mock/cs_mock_1");

    let company = ctx.company().await;
    assert_eq!(company.stripe_customer_id.as_deref(), Some("cus_mock_1"));
    // Tier only changes once the webhook confirms payment
    assert_eq!(company.subscription_tier, SubscriptionTier::Free);

    let checkouts = ctx.payments.checkouts().await;
    assert_eq!(checkouts.len(), 1);
    assert_eq!(checkouts[0].company_id, ctx.company.id);
    assert_eq!(checkouts[0].price_id, PRICE_STARTER);
    assert_eq!(
        checkouts[0].success_url,
        format!(
            "{}/dashboard/billing?success=true&session_id={{CHECKOUT_SESSION_ID}}",
            APP_URL
        )
    );
    assert_eq!(
        checkouts[0].cancel_url,
        format!("{}/dashboard/billing?canceled=true", APP_URL)
    );

    let (status, _) = ctx
        .call(
            "POST",
            "/billing/checkout",
            Some(json!({ "price_id": PRICE_ENTERPRISE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.payments.customers().await.len(), 1);
    assert_eq!(ctx.payments.checkouts().await[1].customer_id, "cus_mock_1");
}

#[tokio::test]
async fn test_checkout_onboards_first_time_user() {
    let ctx = TestContext::new().await;
    let (user, token) = ctx.auth.create_user("fresh@start.test", "password1").await;

    let (status, body) = ctx
        .call_as(
            Some(&token),
            "POST",
            "/billing/checkout",
            Some(json!({ "price_id": PRICE_PROFESSIONAL, "company_name": "Fresh Start LLC" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let profile = ctx
        .store
        .find_profile_by_user(user.id)
        .await
        .unwrap()
        .expect("profile created on checkout");
    let company = ctx
        .store
        .find_company(profile.company_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(company.name, "Fresh Start LLC");
    assert_eq!(company.stripe_customer_id.as_deref(), Some("cus_mock_1"));

    let customers = ctx.payments.customers().await;
    assert_eq!(customers[0].company_id, company.id);
    assert_eq!(customers[0].email.as_deref(), Some("fresh@start.test"));
}

#[tokio::test]
async fn test_portal_requires_customer() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.call("POST", "/billing/portal", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No billing account for this company");

    attach_customer(&ctx, "cus_portal").await;
    let (status, body) = ctx.call("POST", "/billing/portal", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["url"], "https://billing.mock/cus_portal");

    let portals = ctx.payments.portals().await;
    assert_eq!(
        portals,
        vec![(
            "cus_portal".to_string(),
            format!("{}/dashboard/billing", APP_URL)
        )]
    );
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let ctx = TestContext::new().await;
    let body = event(
        "checkout.session.completed",
        json!({
            "customer": "cus_x",
            "subscription": "sub_x",
            "metadata": { "company_id": ctx.company.id.to_string(), "price_id": PRICE_ENTERPRISE }
        }),
    )
    .to_string();
    let now = chrono::Utc::now().timestamp();

    let (status, _) = ctx.post_webhook_raw(body.clone(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post_webhook_raw(body.clone(), Some("garbage".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong_secret = stripe_signature(&body, "whsec_someone_else", now);
    let (status, _) = ctx.post_webhook_raw(body.clone(), Some(wrong_secret)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = stripe_signature(&body, WEBHOOK_SECRET, now - 3600);
    let (status, _) = ctx.post_webhook_raw(body.clone(), Some(stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let company = ctx.company().await;
    assert_eq!(company.subscription_tier, SubscriptionTier::Free);
    assert!(company.stripe_customer_id.is_none());

    // Same body, correctly signed
    let valid = stripe_signature(&body, WEBHOOK_SECRET, now);
    let (status, ack) = ctx.post_webhook_raw(body, Some(valid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn test_webhook_checkout_completed_sets_tier() {
    let ctx = TestContext::new().await;

    let (status, ack) = ctx
        .post_webhook(&event(
            "checkout.session.completed",
            json!({
                "id": "cs_123",
                "client_reference_id": ctx.company.id.to_string(),
                "customer": "cus_new",
                "subscription": "sub_new",
                "metadata": { "price_id": PRICE_PROFESSIONAL }
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    let company = ctx.company().await;
    assert_eq!(company.subscription_tier, SubscriptionTier::Professional);
    assert_eq!(company.subscription_status.as_deref(), Some("active"));
    assert_eq!(company.stripe_customer_id.as_deref(), Some("cus_new"));
    assert_eq!(company.stripe_subscription_id.as_deref(), Some("sub_new"));
}

#[tokio::test]
async fn test_webhook_subscription_lifecycle() {
    let ctx = TestContext::new().await;
    attach_customer(&ctx, "cus_life").await;

    ctx.post_webhook(&event(
        "customer.subscription.updated",
        subscription_object("cus_life", "active", PRICE_ENTERPRISE),
    ))
    .await;
    let company = ctx.company().await;
    assert_eq!(company.subscription_tier, SubscriptionTier::Enterprise);
    assert_eq!(company.subscription_status.as_deref(), Some("active"));
    assert_eq!(company.stripe_subscription_id.as_deref(), Some("sub_123"));

    ctx.post_webhook(&event(
        "invoice.payment_failed",
        json!({ "id": "in_1", "customer": "cus_life" }),
    ))
    .await;
    let company = ctx.company().await;
    assert_eq!(company.subscription_status.as_deref(), Some("past_due"));
    assert_eq!(company.subscription_tier, SubscriptionTier::Enterprise);

    let (status, _) = ctx
        .post_webhook(&event(
            "customer.subscription.deleted",
            subscription_object("cus_life", "canceled", PRICE_ENTERPRISE),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let company = ctx.company().await;
    assert_eq!(company.subscription_tier, SubscriptionTier::Free);
    assert_eq!(company.subscription_status.as_deref(), Some("canceled"));
    assert!(company.stripe_subscription_id.is_none());
    assert_eq!(company.stripe_customer_id.as_deref(), Some("cus_life"));
}

#[tokio::test]
async fn test_webhook_ignores_unknown_targets() {
    let ctx = TestContext::new().await;

    let (status, ack) = ctx
        .post_webhook(&event("customer.created", json!({ "id": "cus_z" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    // Customer that no company owns
    let (status, ack) = ctx
        .post_webhook(&event(
            "customer.subscription.updated",
            subscription_object("cus_stranger", "active", PRICE_STARTER),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    assert_eq!(ctx.company().await.subscription_tier, SubscriptionTier::Free);
}

#[tokio::test]
async fn test_webhook_acknowledges_customer_owned_elsewhere() {
    let ctx = TestContext::new().await;
    let other = ctx
        .store
        .create_company(CreateCompany {
            name: "Rival Plumbing".to_string(),
        })
        .await
        .unwrap();
    ctx.store
        .update_company(
            other.id,
            UpdateCompany {
                stripe_customer_id: Some(Some("cus_taken".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (status, ack) = ctx
        .post_webhook(&event(
            "checkout.session.completed",
            json!({
                "id": "cs_dup",
                "client_reference_id": ctx.company.id.to_string(),
                "customer": "cus_taken",
                "subscription": "sub_dup",
                "metadata": { "price_id": PRICE_STARTER }
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    let company = ctx.company().await;
    assert_eq!(company.subscription_tier, SubscriptionTier::Free);
    assert!(company.stripe_customer_id.is_none());
    assert!(company.stripe_subscription_id.is_none());

    let rival = ctx.store.find_company(other.id).await.unwrap().unwrap();
    assert_eq!(rival.stripe_customer_id.as_deref(), Some("cus_taken"));
}

#[tokio::test]
async fn test_webhook_rejects_non_event_body() {
    let ctx = TestContext::new().await;
    let body = "not json at all".to_string();
    let signature = stripe_signature(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());

    let (status, _) = ctx.post_webhook_raw(body, Some(signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
