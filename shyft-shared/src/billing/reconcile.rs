/// Turns verified billing events into company updates
///
/// Every update is a plain value assignment, so replaying an event leaves the
/// company in the same state.

use tracing::warn;
use uuid::Uuid;

use super::plans::PlanCatalog;
use super::webhook::BillingEvent;
use crate::models::company::{SubscriptionTier, UpdateCompany};

/// How the event identifies its company
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyRef {
    Id(Uuid),
    StripeCustomer(String),
}

/// A company update derived from an event
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub company: CompanyRef,
    pub update: UpdateCompany,
}

/// Subscription statuses that end paid access
const DOWNGRADE_STATUSES: &[&str] = &["canceled", "incomplete_expired", "unpaid"];

/// Computes the company update for an event
///
/// Returns `None` when the event changes nothing: ignored types, checkouts
/// without a company or with a price that isn't in the catalog.
pub fn reconcile(event: &BillingEvent, plans: &PlanCatalog) -> Option<Reconciliation> {
    match event {
        BillingEvent::CheckoutCompleted {
            company_id,
            customer_id,
            subscription_id,
            price_id,
        } => {
            let Some(company_id) = company_id else {
                warn!("Checkout completed without a company reference");
                return None;
            };
            let Some(tier) = price_id.as_deref().and_then(|p| plans.tier_for_price(p)) else {
                warn!(%company_id, price_id = ?price_id, "Checkout completed with unknown price");
                return None;
            };

            Some(Reconciliation {
                company: CompanyRef::Id(*company_id),
                update: UpdateCompany {
                    subscription_tier: Some(tier),
                    subscription_status: Some("active".to_string()),
                    stripe_customer_id: customer_id.clone().map(Some),
                    stripe_subscription_id: subscription_id.clone().map(Some),
                    ..Default::default()
                },
            })
        }

        BillingEvent::SubscriptionUpdated {
            customer_id,
            subscription_id,
            status,
            price_id,
        } => {
            let tier = match status.as_str() {
                "active" | "trialing" => {
                    let tier = price_id.as_deref().and_then(|p| plans.tier_for_price(p));
                    if tier.is_none() {
                        warn!(%customer_id, price_id = ?price_id, "Subscription on unknown price, tier kept");
                    }
                    tier
                }
                s if DOWNGRADE_STATUSES.contains(&s) => Some(SubscriptionTier::Free),
                _ => None,
            };

            Some(Reconciliation {
                company: CompanyRef::StripeCustomer(customer_id.clone()),
                update: UpdateCompany {
                    subscription_tier: tier,
                    subscription_status: Some(status.clone()),
                    stripe_subscription_id: Some(Some(subscription_id.clone())),
                    ..Default::default()
                },
            })
        }

        BillingEvent::SubscriptionDeleted { customer_id } => Some(Reconciliation {
            company: CompanyRef::StripeCustomer(customer_id.clone()),
            update: UpdateCompany {
                subscription_tier: Some(SubscriptionTier::Free),
                subscription_status: Some("canceled".to_string()),
                stripe_subscription_id: Some(None),
                ..Default::default()
            },
        }),

        BillingEvent::PaymentFailed { customer_id } => Some(Reconciliation {
            company: CompanyRef::StripeCustomer(customer_id.clone()),
            update: UpdateCompany {
                subscription_status: Some("past_due".to_string()),
                ..Default::default()
            },
        }),

        BillingEvent::Ignored(_) => None,
    }
}
