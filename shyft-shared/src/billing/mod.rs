/// Subscription billing through Stripe
///
/// # Modules
///
/// - [`provider`]: `PaymentsProvider` trait, provider objects and errors
/// - [`stripe`]: `PaymentsProvider` over the Stripe REST API
/// - [`mock`]: `PaymentsProvider` in process memory for tests
/// - [`plans`]: Tier to price-ID catalog
/// - [`webhook`]: Signature verification and event parsing
/// - [`reconcile`]: Company updates derived from webhook events

pub mod mock;
pub mod plans;
pub mod provider;
pub mod reconcile;
pub mod stripe;
pub mod webhook;
