/// Billing endpoints
///
/// Checkout and the billing portal are hosted by Stripe; these handlers only
/// create sessions and read state back. Tier changes happen in the webhook
/// handler once Stripe confirms them.
///
/// # Endpoints
///
/// - `GET  /billing/prices` - Configured plans with live pricing
/// - `GET  /billing/subscription` - The company's current subscription
/// - `POST /billing/checkout` - Start a subscription checkout
/// - `POST /billing/portal` - Open the self-service billing portal

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shyft_shared::{
    auth::context::AuthContext,
    billing::provider::CheckoutRequest,
    models::company::{Company, SubscriptionTier, UpdateCompany},
};
use tracing::info;
use validator::Validate;

use super::{data, onboard, require_company, Data};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// One purchasable plan
#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    pub tier: SubscriptionTier,
    pub name: String,
    pub price_id: String,
    /// Minor currency units
    pub unit_amount: Option<i64>,
    pub currency: String,
    pub interval: Option<String>,
}

/// Live subscription details from Stripe
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionDetails {
    pub id: String,
    pub status: String,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Subscription state of the caller's company
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub tier: SubscriptionTier,
    pub status: Option<String>,
    pub subscription: Option<SubscriptionDetails>,
}

/// Checkout request
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutBody {
    #[serde(default)]
    #[validate(length(min = 1, message = "price_id is required"))]
    pub price_id: String,

    /// Name for the company when the caller has none yet
    #[validate(length(max = 255, message = "company_name must be at most 255 characters"))]
    pub company_name: Option<String>,
}

/// Checkout response
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

/// Portal response
#[derive(Debug, Serialize, Deserialize)]
pub struct PortalResponse {
    pub url: String,
}

/// List plans with pricing
///
/// # Errors
///
/// - `500 Internal Server Error`: A price lookup failed at Stripe
pub async fn list_prices(State(state): State<AppState>) -> ApiResult<Json<Data<Vec<PriceResponse>>>> {
    let mut prices = Vec::new();

    for plan in state.config.stripe.plans.plans() {
        let price = state.payments.retrieve_price(&plan.price_id).await?;
        prices.push(PriceResponse {
            tier: plan.tier,
            name: plan.tier.display_name().to_string(),
            price_id: plan.price_id.clone(),
            unit_amount: price.unit_amount,
            currency: price.currency,
            interval: price.recurring.map(|r| r.interval),
        });
    }

    Ok(data(prices))
}

/// Current subscription
///
/// First-time users without a company get the `free` tier.
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<SubscriptionResponse>>> {
    let Some(profile) = state.store.find_profile_by_user(ctx.user_id()).await? else {
        return Ok(data(SubscriptionResponse {
            tier: SubscriptionTier::Free,
            status: None,
            subscription: None,
        }));
    };

    let company = state
        .store
        .find_company(profile.company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?;

    let subscription = match company.stripe_customer_id.as_deref() {
        Some(customer_id) => state
            .payments
            .latest_subscription(customer_id)
            .await?
            .map(|sub| SubscriptionDetails {
                price_id: sub.price_id().map(str::to_string),
                current_period_end: sub
                    .current_period_end
                    .and_then(|ts| DateTime::from_timestamp(ts, 0)),
                cancel_at_period_end: sub.cancel_at_period_end,
                id: sub.id,
                status: sub.status,
            }),
        None => None,
    };

    Ok(data(SubscriptionResponse {
        tier: company.subscription_tier,
        status: subscription
            .as_ref()
            .map(|s| s.status.clone())
            .or(company.subscription_status),
        subscription,
    }))
}

/// Returns the company's Stripe customer, creating and storing one if needed
async fn ensure_customer(state: &AppState, company: &Company, email: Option<&str>) -> ApiResult<String> {
    if let Some(customer_id) = &company.stripe_customer_id {
        return Ok(customer_id.clone());
    }

    let customer = state
        .payments
        .create_customer(email, &company.name, company.id)
        .await?;

    state
        .store
        .update_company(
            company.id,
            UpdateCompany {
                stripe_customer_id: Some(Some(customer.id.clone())),
                ..Default::default()
            },
        )
        .await?;

    info!(company_id = %company.id, customer_id = %customer.id, "Stripe customer created");
    Ok(customer.id)
}

/// Start a subscription checkout
///
/// # Endpoint
///
/// ```text
/// POST /billing/checkout
/// Content-Type: application/json
///
/// { "price_id": "price_...", "company_name": "Acme Plumbing" }
/// ```
///
/// Callers without a profile are onboarded on the spot: a company and an
/// admin profile are created before the checkout.
///
/// # Errors
///
/// - `400 Bad Request`: `price_id` is not one of the configured plans
/// - `500 Internal Server Error`: Stripe call failed
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<Json<Data<CheckoutResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    if state.config.stripe.plans.tier_for_price(&req.price_id).is_none() {
        return Err(ApiError::BadRequest(format!("Unknown price: {}", req.price_id)));
    }

    let company = match state.store.find_profile_by_user(ctx.user_id()).await? {
        Some(profile) => state
            .store
            .find_company(profile.company_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?,
        None => {
            let full_name = ctx.user.metadata_str("full_name").map(str::to_string);
            onboard(
                &state,
                ctx.user_id(),
                ctx.email(),
                full_name.as_deref(),
                req.company_name.as_deref(),
            )
            .await?
            .1
        }
    };

    let customer_id = ensure_customer(&state, &company, ctx.email()).await?;

    let session = state
        .payments
        .create_checkout_session(CheckoutRequest {
            customer_id,
            price_id: req.price_id.clone(),
            company_id: company.id,
            success_url: state
                .config
                .app_link("/dashboard/billing?success=true&session_id={CHECKOUT_SESSION_ID}"),
            cancel_url: state.config.app_link("/dashboard/billing?canceled=true"),
        })
        .await?;

    info!(company_id = %company.id, price_id = %req.price_id, session_id = %session.id, "Checkout session created");

    Ok(data(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Open the billing portal
///
/// # Errors
///
/// - `400 Bad Request`: The company has never checked out
pub async fn create_portal(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<PortalResponse>>> {
    let (_, company) = require_company(&state, &ctx).await?;

    let customer_id = company
        .stripe_customer_id
        .ok_or_else(|| ApiError::BadRequest("No billing account for this company".to_string()))?;

    let session = state
        .payments
        .create_portal_session(&customer_id, &state.config.app_link("/dashboard/billing"))
        .await?;

    Ok(data(PortalResponse { url: session.url }))
}
