//! Agent configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment.
//! Without a file the agent talks about the built-in sample order.

use anyhow::{Context, Result};
use disclosure::{Decimal, OrderDraft, PolicyConfig, ShippingStatus};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable holding the hosted model API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Hosted generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the `generateContent` REST API
    pub endpoint: String,
    pub model: String,
    /// Upper bound on one generation call, after which the templated reply is used
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-1.5-flash".into(),
            timeout_secs: 20,
            temperature: 0.3,
            max_output_tokens: 512,
        }
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// The order this session is about. Missing required fields abort startup.
    pub order: OrderDraft,
    pub policy: PolicyConfig,
    pub backend: BackendConfig,
    /// Prefix for rendered amounts
    pub currency: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            order: sample_order(),
            policy: PolicyConfig::default(),
            backend: BackendConfig::default(),
            currency: disclosure::render::DEFAULT_CURRENCY.into(),
        }
    }
}

fn amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).ok()
}

/// The fixed order the support widget was built around
pub fn sample_order() -> OrderDraft {
    OrderDraft {
        item: Some("BIODERMA Node G Purifying shampoo".into()),
        shipping_status: Some(ShippingStatus::Shipped),
        is_installable: Some(false),
        taxable_value: amount("1385.60"),
        sgst: amount("124.70"),
        cgst: amount("124.70"),
        goods_transport_charge: amount("238.00"),
        platform_fee: amount("7.00"),
        grand_total: amount("1880.00"),
        order_id: Some("OD336636889712015100".into()),
        invoice_date: Some("27-01-2026".into()),
        seller: Some("NAOS SKIN CARE INDIA PRIVATE LIMITED".into()),
        gstin: Some("29AAECN7906P1ZP".into()),
        customer_name: Some("Rohit".into()),
    }
}

impl AgentConfig {
    /// Load from `path` if given, otherwise start from defaults; then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid agent config TOML")
    }

    /// Apply `SUPPORT_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("SUPPORT_BACKEND_ENDPOINT") {
            self.backend.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("SUPPORT_BACKEND_MODEL") {
            self.backend.model = model;
        }
        if let Ok(secs) = std::env::var("SUPPORT_BACKEND_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(n) => self.backend.timeout_secs = n,
                Err(_) => tracing::warn!(value = %secs, "Ignoring invalid SUPPORT_BACKEND_TIMEOUT_SECS"),
            }
        }
        if let Ok(name) = std::env::var("SUPPORT_CUSTOMER_NAME") {
            self.order.customer_name = Some(name);
        }
    }
}

/// Read the hosted model API key, if set and non-empty
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use disclosure::OrderContext;

    #[test]
    fn test_default_order_validates() {
        let ctx = OrderContext::from_draft(AgentConfig::default().order).unwrap();
        assert_eq!(ctx.shipping_status(), ShippingStatus::Shipped);
        assert_eq!(ctx.tax_summary().taxable_value.to_string(), "1385.60");
        assert_eq!(ctx.customer_name(), Some("Rohit"));
    }

    #[test]
    fn test_toml_order_keeps_string_amount_scale() {
        let config = AgentConfig::from_toml(
            r#"
            currency = "INR "

            [order]
            item = "Desk lamp"
            shipping_status = "delivered"
            is_installable = true
            taxable_value = "100.50"
            sgst = "9.05"
            cgst = "9.05"
            goods_transport_charge = "0.00"
            platform_fee = "7.00"
            grand_total = "125.60"

            [backend]
            model = "gemini-pro"
            "#,
        )
        .unwrap();
        assert_eq!(config.currency, "INR ");
        assert_eq!(config.backend.model, "gemini-pro");
        assert_eq!(config.backend.timeout_secs, 20);
        let ctx = OrderContext::from_draft(config.order).unwrap();
        assert_eq!(ctx.tax_summary().goods_transport_charge.to_string(), "0.00");
        assert!(ctx.is_installable());
    }

    #[test]
    fn test_toml_float_amount_is_rejected() {
        let err = AgentConfig::from_toml(
            r#"
            [order]
            item = "Desk lamp"
            taxable_value = 1385.60
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("must be quoted"), "{err:#}");

        let config = AgentConfig::from_toml(
            r#"
            [order]
            platform_fee = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.order.platform_fee.unwrap().to_string(), "7");
    }

    #[test]
    fn test_partial_order_table_fails_closed() {
        let config = AgentConfig::from_toml(
            r#"
            [order]
            item = "Desk lamp"
            shipping_status = "shipped"
            "#,
        )
        .unwrap();
        let err = OrderContext::from_draft(config.order).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_policy_overrides() {
        let config = AgentConfig::from_toml(
            r#"
            [policy]
            deflection_threshold = 3

            [policy.keywords]
            frustration = ["furious"]
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.deflection_threshold, 3);
        assert_eq!(config.policy.keywords.frustration, vec!["furious"]);
        assert!(!config.policy.keywords.invoice.is_empty());
        assert_eq!(config.order, sample_order());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(AgentConfig::from_toml("order = 5").is_err());
    }
}
