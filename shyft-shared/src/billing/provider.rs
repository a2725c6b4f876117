/// Hosted payments provider contract
///
/// The API creates customers, hosted checkout sessions and billing-portal
/// sessions, and reads subscription and price state back. Everything else
/// (card collection, invoicing, dunning) happens on the provider's side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for payments-provider calls
#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    /// The provider answered with an error body
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Network failure
    #[error("Payments provider unreachable: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("Unexpected payments provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PaymentsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PaymentsError::Decode(err.to_string())
        } else {
            PaymentsError::Transport(err.to_string())
        }
    }
}

/// Payments result type alias
pub type PaymentsResult<T> = Result<T, PaymentsError>;

/// Provider-side customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// Hosted checkout page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Hosted billing-portal page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Recurring component of a price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurring {
    pub interval: String,
}

/// Price object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,

    /// Amount in the currency's minor unit
    pub unit_amount: Option<i64>,

    pub currency: String,

    pub recurring: Option<Recurring>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItems {
    pub data: Vec<SubscriptionItem>,
}

/// Subscription object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,

    /// Owning customer ID
    pub customer: String,

    /// `active`, `trialing`, `past_due`, `canceled`, ...
    pub status: String,

    /// Unix timestamp the current period ends at
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    pub items: SubscriptionItems,
}

impl Subscription {
    /// Price of the first subscription item
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

/// Parameters for a subscription checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub company_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
}

/// Operations the API needs from the payments provider
#[async_trait]
pub trait PaymentsProvider: Send + Sync {
    /// Creates a customer tagged with the company ID
    async fn create_customer(
        &self,
        email: Option<&str>,
        name: &str,
        company_id: Uuid,
    ) -> PaymentsResult<Customer>;

    /// Creates a hosted subscription checkout
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> PaymentsResult<CheckoutSession>;

    /// Creates a billing-portal session
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> PaymentsResult<PortalSession>;

    /// Most recent subscription of a customer in any status
    async fn latest_subscription(&self, customer_id: &str) -> PaymentsResult<Option<Subscription>>;

    /// Looks up a price
    async fn retrieve_price(&self, price_id: &str) -> PaymentsResult<Price>;
}
