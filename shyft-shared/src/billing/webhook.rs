/// Stripe webhook verification and event parsing
///
/// Stripe signs every delivery with the endpoint secret. The
/// `Stripe-Signature` header looks like
///
/// ```text
/// t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
/// ```
///
/// where `v1` is the hex HMAC-SHA256 of `"{t}.{raw body}"`. A delivery is
/// accepted when any `v1` entry matches and `t` is within the tolerance of
/// the current time.
///
/// # Example
///
/// ```
/// use shyft_shared::billing::webhook::{sign_payload, verify_signature, DEFAULT_TOLERANCE_SECS};
///
/// let body = br#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;
/// let header = sign_payload(body, "whsec_test", 1_700_000_000);
///
/// assert!(verify_signature(body, &header, "whsec_test", 1_700_000_010, DEFAULT_TOLERANCE_SECS).is_ok());
/// assert!(verify_signature(body, &header, "whsec_other", 1_700_000_010, DEFAULT_TOLERANCE_SECS).is_err());
/// ```

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sha2::Sha256;
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum accepted age (or clock skew) of a signature timestamp
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Webhook verification errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("Malformed Stripe-Signature header")]
    MalformedSignature,

    #[error("No signature matches the payload")]
    SignatureMismatch,

    #[error("Signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Produces a `Stripe-Signature` header value for `payload`
///
/// Used to sign fixtures in tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = mac_for(secret, timestamp, payload).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(WebhookError::MalformedSignature)?;

        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                )
            }
            // Undecodable entries can't match, skip them like other schemes
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Verifies a signature header against the raw body
///
/// `now` is the current Unix time in seconds. Comparison is constant-time.
///
/// # Errors
///
/// - `MalformedSignature` if the header lacks `t` or any `v1`
/// - `SignatureMismatch` if no `v1` entry matches
/// - `TimestampOutOfTolerance` if `t` is more than `tolerance` seconds from `now`
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance: i64,
) -> Result<(), WebhookError> {
    let parsed = parse_header(header)?;

    let matched = parsed.signatures.iter().any(|candidate| {
        mac_for(secret, parsed.timestamp, payload)
            .verify_slice(candidate)
            .is_ok()
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now - parsed.timestamp).abs() > tolerance {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    Ok(())
}

/// A Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: JsonValue,
}

/// Verifies the header and parses the body into an event
///
/// # Errors
///
/// Any verification error, or `InvalidPayload` when the body isn't an event.
pub fn construct_event(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
) -> Result<StripeEvent, WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;
    verify_signature(
        payload,
        header,
        secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )?;

    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    client_reference_id: Option<String>,
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct PriceRef {
    id: String,
}

#[derive(Deserialize)]
struct ItemRef {
    price: PriceRef,
}

#[derive(Deserialize, Default)]
struct ItemList {
    #[serde(default)]
    data: Vec<ItemRef>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    items: ItemList,
}

#[derive(Deserialize)]
struct InvoiceObject {
    customer: Option<String>,
}

/// The subset of events that change company billing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// Hosted checkout finished
    CheckoutCompleted {
        company_id: Option<Uuid>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
        price_id: Option<String>,
    },

    /// Subscription changed status or plan
    SubscriptionUpdated {
        customer_id: String,
        subscription_id: String,
        status: String,
        price_id: Option<String>,
    },

    /// Subscription ended
    SubscriptionDeleted { customer_id: String },

    /// A renewal charge failed
    PaymentFailed { customer_id: String },

    /// Any other event type
    Ignored(String),
}

fn object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, WebhookError> {
    T::deserialize(&event.data.object).map_err(|e| {
        WebhookError::InvalidPayload(format!("{} object: {}", event.event_type, e))
    })
}

impl StripeEvent {
    /// Extracts the billing-relevant content of this event
    ///
    /// # Errors
    ///
    /// `InvalidPayload` when a handled event type carries an object of the
    /// wrong shape.
    pub fn billing_event(&self) -> Result<BillingEvent, WebhookError> {
        let event = match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = object(self)?;
                let company_id = session
                    .metadata
                    .get("company_id")
                    .or(session.client_reference_id.as_ref())
                    .and_then(|id| Uuid::parse_str(id).ok());

                BillingEvent::CheckoutCompleted {
                    company_id,
                    customer_id: session.customer,
                    subscription_id: session.subscription,
                    price_id: session.metadata.get("price_id").cloned(),
                }
            }
            "customer.subscription.updated" => {
                let sub: SubscriptionObject = object(self)?;
                BillingEvent::SubscriptionUpdated {
                    price_id: sub.items.data.into_iter().next().map(|item| item.price.id),
                    customer_id: sub.customer,
                    subscription_id: sub.id,
                    status: sub.status,
                }
            }
            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = object(self)?;
                BillingEvent::SubscriptionDeleted {
                    customer_id: sub.customer,
                }
            }
            "invoice.payment_failed" => {
                let invoice: InvoiceObject = object(self)?;
                match invoice.customer {
                    Some(customer_id) => BillingEvent::PaymentFailed { customer_id },
                    None => BillingEvent::Ignored(self.event_type.clone()),
                }
            }
            other => BillingEvent::Ignored(other.to_string()),
        };

        Ok(event)
    }
}
