/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// Required:
///
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `SUPABASE_URL`: Auth service base URL
/// - `SUPABASE_ANON_KEY`: Auth service public API key
/// - `STRIPE_SECRET_KEY`: Stripe secret API key
/// - `STRIPE_WEBHOOK_SECRET`: Stripe webhook endpoint secret
/// - `STRIPE_PRICE_STARTER`, `STRIPE_PRICE_PROFESSIONAL`, `STRIPE_PRICE_ENTERPRISE`:
///   Price IDs of the paid tiers
///
/// Optional:
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8787)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `APP_URL`: Frontend origin used for redirects (default: http://localhost:3000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: `true` enables HSTS (default: false)
/// - `HTTP_TIMEOUT_SECS`: Timeout for outbound calls (default: 15)
/// - `RUST_LOG`: Log filter (default: shyft_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use shyft_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use shyft_shared::billing::plans::PlanCatalog;
use shyft_shared::db::pool::DatabaseConfig;
use std::env;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Auth service configuration
    pub auth: AuthServiceConfig,

    /// Stripe configuration
    pub stripe: StripeConfig,

    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Frontend origin, used to build redirect URLs
    pub app_url: String,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

/// Hosted auth service configuration
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Project base URL
    pub url: String,

    /// Public API key sent on every call
    pub anon_key: String,
}

/// Stripe configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key
    pub secret_key: String,

    /// Webhook endpoint signing secret
    pub webhook_secret: String,

    /// Paid plans
    pub plans: PlanCatalog,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_port = optional("API_PORT", "8787")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let max_connections = optional("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let production = matches!(
            optional("PRODUCTION", "false").to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        let http_timeout_secs = optional("HTTP_TIMEOUT_SECS", "15")
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("HTTP_TIMEOUT_SECS is invalid: {}", e))?;

        let cors_origins = optional("CORS_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: optional("API_HOST", "0.0.0.0"),
                port: api_port,
                app_url: optional("APP_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections,
                ..Default::default()
            },
            auth: AuthServiceConfig {
                url: required("SUPABASE_URL")?,
                anon_key: required("SUPABASE_ANON_KEY")?,
            },
            stripe: StripeConfig {
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                plans: PlanCatalog::new(
                    required("STRIPE_PRICE_STARTER")?,
                    required("STRIPE_PRICE_PROFESSIONAL")?,
                    required("STRIPE_PRICE_ENTERPRISE")?,
                ),
            },
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds a frontend URL from a path
    pub fn app_link(&self, path: &str) -> String {
        format!("{}{}", self.api.app_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shyft_shared::models::company::SubscriptionTier;
    use std::collections::HashMap;

    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgresql://localhost/shyft"),
            ("SUPABASE_URL", "https://proj.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("STRIPE_SECRET_KEY", "sk_test"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
            ("STRIPE_PRICE_STARTER", "price_s"),
            ("STRIPE_PRICE_PROFESSIONAL", "price_p"),
            ("STRIPE_PRICE_ENTERPRISE", "price_e"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> anyhow::Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&required_vars()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8787");
        assert_eq!(config.api.app_url, "http://localhost:3000");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(
            config.stripe.plans.tier_for_price("price_p"),
            Some(SubscriptionTier::Professional)
        );
    }

    #[test]
    fn test_overrides() {
        let mut vars = required_vars();
        vars.insert("API_PORT", "9000");
        vars.insert("APP_URL", "https://app.shyft.test/");
        vars.insert("CORS_ORIGINS", "https://a.test, https://b.test");
        vars.insert("PRODUCTION", "true");

        let config = load(&vars).unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.app_link("/reset-password"), "https://app.shyft.test/reset-password");
        assert_eq!(config.api.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert!(config.api.production);
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = required_vars();
        vars.remove("STRIPE_WEBHOOK_SECRET");

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = required_vars();
        vars.insert("API_PORT", "eighty");
        assert!(load(&vars).is_err());
    }
}
