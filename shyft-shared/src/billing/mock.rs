/// In-process [`PaymentsProvider`] for tests and local demos
///
/// Returns deterministic IDs (`cus_mock_1`, `cs_mock_1`, ...) and records
/// every call. Prices and subscriptions are seeded by the test.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::provider::{
    CheckoutRequest, CheckoutSession, Customer, PaymentsError, PaymentsProvider, PaymentsResult,
    PortalSession, Price, Recurring, Subscription,
};

/// A customer created through the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub company_id: Uuid,
}

#[derive(Default)]
struct MockPaymentsState {
    customers: Vec<MockCustomer>,
    checkouts: Vec<CheckoutRequest>,
    portals: Vec<(String, String)>,
    prices: HashMap<String, Price>,
    subscriptions: HashMap<String, Subscription>,
}

/// Payments provider that never leaves the process
#[derive(Default)]
pub struct MockPaymentsProvider {
    state: Mutex<MockPaymentsState>,
}

impl MockPaymentsProvider {
    /// Creates an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a monthly recurring price
    pub async fn add_price(&self, price_id: &str, unit_amount: i64) {
        self.state.lock().await.prices.insert(
            price_id.to_string(),
            Price {
                id: price_id.to_string(),
                unit_amount: Some(unit_amount),
                currency: "usd".to_string(),
                recurring: Some(Recurring {
                    interval: "month".to_string(),
                }),
            },
        );
    }

    /// Seeds the latest subscription of a customer
    pub async fn set_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .await
            .subscriptions
            .insert(subscription.customer.clone(), subscription);
    }

    /// Customers created so far
    pub async fn customers(&self) -> Vec<MockCustomer> {
        self.state.lock().await.customers.clone()
    }

    /// Checkout requests seen so far
    pub async fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.state.lock().await.checkouts.clone()
    }

    /// Portal requests seen so far as `(customer_id, return_url)`
    pub async fn portals(&self) -> Vec<(String, String)> {
        self.state.lock().await.portals.clone()
    }
}

#[async_trait]
impl PaymentsProvider for MockPaymentsProvider {
    async fn create_customer(
        &self,
        email: Option<&str>,
        name: &str,
        company_id: Uuid,
    ) -> PaymentsResult<Customer> {
        let mut state = self.state.lock().await;
        let id = format!("cus_mock_{}", state.customers.len() + 1);
        state.customers.push(MockCustomer {
            id: id.clone(),
            email: email.map(str::to_string),
            name: name.to_string(),
            company_id,
        });
        Ok(Customer { id })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> PaymentsResult<CheckoutSession> {
        let mut state = self.state.lock().await;
        if !state.customers.iter().any(|c| c.id == request.customer_id) {
            return Err(PaymentsError::Api {
                status: 400,
                message: format!("No such customer: '{}'", request.customer_id),
            });
        }

        let id = format!("cs_mock_{}", state.checkouts.len() + 1);
        state.checkouts.push(request);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.mock/{}", id)),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> PaymentsResult<PortalSession> {
        let mut state = self.state.lock().await;
        state
            .portals
            .push((customer_id.to_string(), return_url.to_string()));
        Ok(PortalSession {
            url: format!("https://billing.mock/{}", customer_id),
        })
    }

    async fn latest_subscription(&self, customer_id: &str) -> PaymentsResult<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .get(customer_id)
            .cloned())
    }

    async fn retrieve_price(&self, price_id: &str) -> PaymentsResult<Price> {
        self.state
            .lock()
            .await
            .prices
            .get(price_id)
            .cloned()
            .ok_or_else(|| PaymentsError::Api {
                status: 404,
                message: format!("No such price: '{}'", price_id),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_requires_known_customer() {
        let payments = MockPaymentsProvider::new();
        let company_id = Uuid::new_v4();
        let request = |customer: &str| CheckoutRequest {
            customer_id: customer.to_string(),
            price_id: "price_s".to_string(),
            company_id,
            success_url: "s".to_string(),
            cancel_url: "c".to_string(),
        };

        assert!(payments.create_checkout_session(request("cus_nope")).await.is_err());

        let customer = payments
            .create_customer(Some("a@b.co"), "Acme", company_id)
            .await
            .unwrap();
        assert_eq!(customer.id, "cus_mock_1");

        let session = payments
            .create_checkout_session(request(&customer.id))
            .await
            .unwrap();
        assert_eq!(session.id, "cs_mock_1");
        assert_eq!(payments.checkouts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_price_is_error() {
        let payments = MockPaymentsProvider::new();
        payments.add_price("price_s", 2900).await;

        assert_eq!(
            payments.retrieve_price("price_s").await.unwrap().unit_amount,
            Some(2900)
        );
        let err = payments.retrieve_price("price_x").await.unwrap_err();
        assert_eq!(err.to_string(), "No such price: 'price_x'");
    }
}
