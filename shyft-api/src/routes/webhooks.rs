/// Stripe webhook receiver
///
/// # Endpoint
///
/// ```text
/// POST /webhooks/stripe
/// Stripe-Signature: t=<unix>,v1=<hex hmac>
/// ```
///
/// The raw body is verified before anything is parsed. A bad signature is a
/// 400 and touches nothing. Verified events always answer
/// `{ "received": true }`, including ones that change nothing or whose
/// customer id already belongs to another company, so Stripe stops retrying
/// them.

use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use serde::Serialize;
use shyft_shared::{
    billing::{
        reconcile::{reconcile, CompanyRef},
        webhook::{construct_event, BillingEvent},
    },
    db::store::StoreError,
};
use tracing::{debug, info, warn};

use crate::{app::AppState, error::ApiResult};

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Acknowledgement body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Receive a Stripe event
///
/// # Errors
///
/// - `400 Bad Request`: Missing, malformed, mismatched or stale signature, or
///   a body that isn't an event
/// - `500 Internal Server Error`: Database failure while applying the update
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = construct_event(&body, signature, &state.config.stripe.webhook_secret)
        .map_err(|e| {
            warn!(error = %e, "Rejected webhook delivery");
            e
        })?;

    let billing_event = event.billing_event()?;
    debug!(event_id = %event.id, event_type = %event.event_type, "Webhook verified");

    if let BillingEvent::Ignored(event_type) = &billing_event {
        info!(event_id = %event.id, %event_type, "Ignoring webhook event");
        return Ok(Json(WebhookAck { received: true }));
    }

    let Some(reconciliation) = reconcile(&billing_event, &state.config.stripe.plans) else {
        return Ok(Json(WebhookAck { received: true }));
    };

    let company_id = match &reconciliation.company {
        CompanyRef::Id(id) => Some(*id),
        CompanyRef::StripeCustomer(customer_id) => state
            .store
            .find_company_by_stripe_customer(customer_id)
            .await?
            .map(|c| c.id),
    };

    let Some(company_id) = company_id else {
        warn!(event_id = %event.id, company = ?reconciliation.company, "Webhook for unknown company");
        return Ok(Json(WebhookAck { received: true }));
    };

    let updated = match state
        .store
        .update_company(company_id, reconciliation.update)
        .await
    {
        Ok(updated) => updated,
        Err(StoreError::Conflict(constraint)) => {
            // Redelivery cannot fix a customer id owned by another company
            warn!(
                event_id = %event.id,
                %company_id,
                %constraint,
                "Webhook update conflicts with another company, skipping"
            );
            return Ok(Json(WebhookAck { received: true }));
        }
        Err(e) => return Err(e.into()),
    };

    match updated {
        Some(company) => info!(
            event_id = %event.id,
            event_type = %event.event_type,
            %company_id,
            tier = company.subscription_tier.as_str(),
            status = ?company.subscription_status,
            "Company billing updated"
        ),
        None => warn!(event_id = %event.id, %company_id, "Webhook for unknown company"),
    }

    Ok(Json(WebhookAck { received: true }))
}
