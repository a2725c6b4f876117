//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An app wired to the in-memory store and mock auth/payments providers
//! - A seeded company with an admin user and one technician
//! - Request helpers that return status and parsed JSON
//! - Stripe webhook signing

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use shyft_api::{
    app::{build_router, AppState},
    config::Config,
};
use shyft_shared::{
    auth::mock::MockAuthProvider,
    billing::{mock::MockPaymentsProvider, webhook::sign_payload},
    db::{memory::MemoryStore, store::Store},
    models::{
        company::{Company, CreateCompany},
        profile::{CreateProfile, Profile, ProfileRole},
        technician::{CreateTechnician, Technician},
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";
pub const PRICE_STARTER: &str = "price_starter_test";
pub const PRICE_PROFESSIONAL: &str = "price_professional_test";
pub const PRICE_ENTERPRISE: &str = "price_enterprise_test";
pub const APP_URL: &str = "https://app.shyft.test";

/// Configuration pointing at nothing real
pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgresql://unused/shyft"),
        ("SUPABASE_URL", "https://auth.shyft.test"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("STRIPE_SECRET_KEY", "sk_test"),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("STRIPE_PRICE_STARTER", PRICE_STARTER),
        ("STRIPE_PRICE_PROFESSIONAL", PRICE_PROFESSIONAL),
        ("STRIPE_PRICE_ENTERPRISE", PRICE_ENTERPRISE),
        ("APP_URL", APP_URL),
    ]);

    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test config is complete")
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<MockAuthProvider>,
    pub payments: Arc<MockPaymentsProvider>,
    pub company: Company,
    pub admin: Profile,
    pub token: String,
    pub technician: Technician,
}

impl TestContext {
    /// Creates a context with a seeded company, admin and technician
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(MockAuthProvider::new());
        let payments = Arc::new(MockPaymentsProvider::new());

        payments.add_price(PRICE_STARTER, 2900).await;
        payments.add_price(PRICE_PROFESSIONAL, 7900).await;
        payments.add_price(PRICE_ENTERPRISE, 19900).await;

        let company = store
            .create_company(CreateCompany {
                name: "Acme Plumbing".to_string(),
            })
            .await
            .unwrap();

        let (user, token) = auth.create_user("owner@acme.test", "password1").await;
        let admin = store
            .create_profile(CreateProfile {
                user_id: user.id,
                company_id: company.id,
                full_name: "Olive Owner".to_string(),
                email: user.email.clone(),
                role: ProfileRole::Admin,
            })
            .await
            .unwrap();

        let technician =
            seed_technician(&store, &auth, company.id, "Terry Tech", "terry@acme.test").await;

        let state = AppState::new(store.clone(), auth.clone(), payments.clone(), test_config());
        let app = build_router(state);

        TestContext {
            app,
            store,
            auth,
            payments,
            company,
            admin,
            token,
            technician,
        }
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Adds a technician profile to the seeded company
    pub async fn add_technician(&self, name: &str, email: &str) -> Technician {
        seed_technician(&self.store, &self.auth, self.company.id, name, email).await
    }

    /// Sends a request as the seeded admin
    pub async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(Some(&self.token), method, uri, body).await
    }

    /// Sends a request with an optional bearer token
    pub async fn call_as(
        &self,
        token: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    /// Sends a prepared request
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };

        (status, json)
    }

    /// Posts a webhook body signed with the test secret
    pub async fn post_webhook(&self, body: &Value) -> (StatusCode, Value) {
        let raw = body.to_string();
        let header = sign_payload(raw.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        self.post_webhook_raw(raw, Some(header)).await
    }

    /// Posts a raw webhook body with an arbitrary signature header
    pub async fn post_webhook_raw(&self, raw: String, signature: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("stripe-signature", signature);
        }
        self.send(builder.body(Body::from(raw)).unwrap()).await
    }

    /// Reloads the seeded company
    pub async fn company(&self) -> Company {
        self.store
            .find_company(self.company.id)
            .await
            .unwrap()
            .unwrap()
    }
}

async fn seed_technician(
    store: &MemoryStore,
    auth: &MockAuthProvider,
    company_id: Uuid,
    name: &str,
    email: &str,
) -> Technician {
    let (user, _) = auth.create_user(email, "password1").await;
    let profile = store
        .create_profile(CreateProfile {
            user_id: user.id,
            company_id,
            full_name: name.to_string(),
            email: Some(email.to_string()),
            role: ProfileRole::Technician,
        })
        .await
        .unwrap();

    store
        .create_technician(CreateTechnician {
            profile_id: profile.id,
            company_id,
            skills: vec!["plumbing".to_string()],
        })
        .await
        .unwrap()
}
