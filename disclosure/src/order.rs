//! Order Context: the immutable purchase record a session talks about
//!
//! An [`OrderContext`] is only obtainable through [`OrderContext::from_draft`],
//! which fails closed when a required field is missing. Amounts are
//! [`Decimal`]s so the stored scale survives: `1385.60` stays `1385.60`.

use crate::error::{PolicyError, PolicyResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shipping status of the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    #[serde(alias = "Placed", alias = "PLACED")]
    Placed,
    #[serde(alias = "Shipped", alias = "SHIPPED")]
    Shipped,
    #[serde(alias = "Delivered", alias = "DELIVERED")]
    Delivered,
}

impl ShippingStatus {
    /// Whether the invoice is final (documents are only issued on delivery)
    pub fn invoice_final(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

/// Unvalidated order record as read from configuration.
///
/// Every field is optional here; [`OrderContext::from_draft`] decides which
/// ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDraft {
    pub item: Option<String>,
    pub shipping_status: Option<ShippingStatus>,
    pub is_installable: Option<bool>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub taxable_value: Option<Decimal>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub sgst: Option<Decimal>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub cgst: Option<Decimal>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub goods_transport_charge: Option<Decimal>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub platform_fee: Option<Decimal>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub grand_total: Option<Decimal>,
    pub order_id: Option<String>,
    pub invoice_date: Option<String>,
    pub seller: Option<String>,
    pub gstin: Option<String>,
    pub customer_name: Option<String>,
}

/// Amount fields of an [`OrderDraft`].
///
/// Accepts decimal strings and integers. Floats are refused: by the time a
/// parser hands over `1385.60` as an `f64` it is already `1385.6`.
mod amount {
    use rust_decimal::Decimal;
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;
    use std::str::FromStr;

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Option<Decimal>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an amount as a quoted decimal string, e.g. \"1385.60\"")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Decimal::from_str(v.trim())
                .map(Some)
                .map_err(|e| E::custom(format!("invalid amount '{}': {}", v, e)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(Decimal::from(v)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Decimal::from(v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Err(E::custom(format!(
                "amount {} must be quoted so its exact digits are kept",
                v
            )))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        d.deserialize_option(AmountVisitor)
    }
}

/// Validated, immutable order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderContext {
    item: String,
    shipping_status: ShippingStatus,
    is_installable: bool,
    taxable_value: Decimal,
    sgst: Decimal,
    cgst: Decimal,
    goods_transport_charge: Decimal,
    platform_fee: Decimal,
    grand_total: Decimal,
    order_id: Option<String>,
    invoice_date: Option<String>,
    seller: Option<String>,
    gstin: Option<String>,
    customer_name: Option<String>,
}

/// The monetary breakdown disclosed for an office claim or reimbursement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub taxable_value: Decimal,
    pub sgst: Decimal,
    pub cgst: Decimal,
    pub goods_transport_charge: Decimal,
    pub platform_fee: Decimal,
    pub grand_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
}

fn required<T>(value: Option<T>, field: &'static str) -> PolicyResult<T> {
    value.ok_or(PolicyError::missing(field))
}

/// Blank strings count as absent so a config line like `item = ""` cannot
/// smuggle an empty value past validation.
fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl OrderContext {
    /// Validate a draft into an order context.
    ///
    /// Fields are checked in declaration order; the first missing one is
    /// reported.
    pub fn from_draft(draft: OrderDraft) -> PolicyResult<Self> {
        let ctx = Self {
            item: required(non_blank(draft.item), "item")?,
            shipping_status: required(draft.shipping_status, "shipping_status")?,
            is_installable: required(draft.is_installable, "is_installable")?,
            taxable_value: required(draft.taxable_value, "taxable_value")?,
            sgst: required(draft.sgst, "sgst")?,
            cgst: required(draft.cgst, "cgst")?,
            goods_transport_charge: required(
                draft.goods_transport_charge,
                "goods_transport_charge",
            )?,
            platform_fee: required(draft.platform_fee, "platform_fee")?,
            grand_total: required(draft.grand_total, "grand_total")?,
            order_id: non_blank(draft.order_id),
            invoice_date: non_blank(draft.invoice_date),
            seller: non_blank(draft.seller),
            gstin: non_blank(draft.gstin),
            customer_name: non_blank(draft.customer_name),
        };
        tracing::debug!(
            item = %ctx.item,
            status = %ctx.shipping_status,
            installable = ctx.is_installable,
            "Order context validated"
        );
        Ok(ctx)
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn shipping_status(&self) -> ShippingStatus {
        self.shipping_status
    }

    pub fn is_installable(&self) -> bool {
        self.is_installable
    }

    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Snapshot of the stored monetary fields, unrounded
    pub fn tax_summary(&self) -> TaxSummary {
        TaxSummary {
            taxable_value: self.taxable_value,
            sgst: self.sgst,
            cgst: self.cgst,
            goods_transport_charge: self.goods_transport_charge,
            platform_fee: self.platform_fee,
            grand_total: self.grand_total,
            order_id: self.order_id.clone(),
            invoice_date: self.invoice_date.clone(),
            seller: self.seller.clone(),
            gstin: self.gstin.clone(),
        }
    }

    /// Render the record as `key: value` lines for a model system instruction.
    ///
    /// Optional fields that are absent are left out rather than filled in.
    pub fn context_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Item: {}", self.item),
            format!("Status: {}", self.shipping_status),
            format!("Installable: {}", if self.is_installable { "yes" } else { "no" }),
            format!("Taxable Value: {}", self.taxable_value),
            format!("SGST: {}", self.sgst),
            format!("CGST: {}", self.cgst),
            format!("Goods Transport Charges: {}", self.goods_transport_charge),
            format!("Platform Fee: {}", self.platform_fee),
            format!("Grand Total: {}", self.grand_total),
        ];
        let optional = [
            ("Order ID", &self.order_id),
            ("Invoice Date", &self.invoice_date),
            ("Seller", &self.seller),
            ("GSTIN", &self.gstin),
        ];
        for (label, value) in optional {
            if let Some(v) = value {
                lines.push(format!("{}: {}", label, v));
            }
        }
        lines
    }
}

impl TryFrom<OrderDraft> for OrderContext {
    type Error = PolicyError;

    fn try_from(draft: OrderDraft) -> PolicyResult<Self> {
        Self::from_draft(draft)
    }
}
