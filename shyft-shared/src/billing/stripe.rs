/// [`PaymentsProvider`] over the Stripe REST API
///
/// Requests are form-encoded (Stripe's bracket syntax for nested fields) and
/// authenticated with the secret key as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::provider::{
    CheckoutRequest, CheckoutSession, Customer, PaymentsError, PaymentsProvider, PaymentsResult,
    PortalSession, Price, Subscription,
};

/// Production Stripe API root
pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

impl StripeClient {
    /// Creates a client against the production API
    pub fn new(http: Client, secret_key: impl Into<String>) -> Self {
        Self::with_base_url(http, STRIPE_API_BASE, secret_key)
    }

    /// Creates a client against another API root (e.g. a local stripe-mock)
    pub fn with_base_url(
        http: Client,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.secret_key)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> PaymentsResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());

        warn!(status = status.as_u16(), %message, "Stripe request failed");
        Err(PaymentsError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> PaymentsResult<T> {
        let response = self
            .authed(self.http.post(self.url(path)))
            .form(form)
            .send()
            .await?;
        Self::parse(response).await
    }
}

/// Builds the form body of a subscription checkout
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let company_id = request.company_id.to_string();
    vec![
        ("mode".into(), "subscription".into()),
        ("customer".into(), request.customer_id.clone()),
        ("line_items[0][price]".into(), request.price_id.clone()),
        ("line_items[0][quantity]".into(), "1".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("client_reference_id".into(), company_id.clone()),
        ("metadata[company_id]".into(), company_id.clone()),
        ("metadata[price_id]".into(), request.price_id.clone()),
        ("subscription_data[metadata][company_id]".into(), company_id),
    ]
}

#[async_trait]
impl PaymentsProvider for StripeClient {
    async fn create_customer(
        &self,
        email: Option<&str>,
        name: &str,
        company_id: Uuid,
    ) -> PaymentsResult<Customer> {
        debug!(%company_id, "Creating Stripe customer");

        let mut form = vec![
            ("name".to_string(), name.to_string()),
            ("metadata[company_id]".to_string(), company_id.to_string()),
        ];
        if let Some(email) = email {
            form.push(("email".to_string(), email.to_string()));
        }

        self.post_form("/customers", &form).await
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> PaymentsResult<CheckoutSession> {
        debug!(company_id = %request.company_id, price_id = %request.price_id, "Creating checkout session");
        self.post_form("/checkout/sessions", &checkout_form(&request))
            .await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> PaymentsResult<PortalSession> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        self.post_form("/billing_portal/sessions", &form).await
    }

    async fn latest_subscription(&self, customer_id: &str) -> PaymentsResult<Option<Subscription>> {
        let response = self
            .authed(self.http.get(self.url("/subscriptions")))
            .query(&[("customer", customer_id), ("status", "all"), ("limit", "1")])
            .send()
            .await?;

        let list: StripeList<Subscription> = Self::parse(response).await?;
        Ok(list.data.into_iter().next())
    }

    async fn retrieve_price(&self, price_id: &str) -> PaymentsResult<Price> {
        let response = self
            .authed(self.http.get(self.url(&format!("/prices/{}", price_id))))
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = StripeClient::with_base_url(Client::new(), "http://localhost:12111/", "sk");
        assert_eq!(client.url("/customers"), "http://localhost:12111/v1/customers");

        let client = StripeClient::new(Client::new(), "sk");
        assert_eq!(
            client.url("/checkout/sessions"),
            "https://api.stripe.com/v1/checkout/sessions"
        );
    }

    #[test]
    fn test_checkout_form_carries_company_and_price() {
        let company_id = Uuid::new_v4();
        let form = checkout_form(&CheckoutRequest {
            customer_id: "cus_1".to_string(),
            price_id: "price_pro".to_string(),
            company_id,
            success_url: "https://app/ok".to_string(),
            cancel_url: "https://app/cancel".to_string(),
        });

        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("line_items[0][price]"), Some("price_pro"));
        assert_eq!(get("client_reference_id"), Some(company_id.to_string().as_str()));
        assert_eq!(get("metadata[price_id]"), Some("price_pro"));
    }

    #[test]
    fn test_error_body_shape() {
        let body: StripeErrorBody = serde_json::from_str(
            r#"{"error":{"message":"No such customer: 'cus_x'","type":"invalid_request_error"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.message.as_deref(), Some("No such customer: 'cus_x'"));
    }
}
