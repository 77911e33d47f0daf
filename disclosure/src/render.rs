//! Response Renderer: fixed templates for each policy action
//!
//! Output depends only on the action and the renderer's currency symbol.
//! Amounts print at their stored scale with no grouping separators.

use crate::escalation::engine::{Action, OfferTrigger};
use crate::order::{OrderContext, ShippingStatus, TaxSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default currency symbol prefixed to amounts
pub const DEFAULT_CURRENCY: &str = "₹";

/// Renders actions into user-facing text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderer {
    currency: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl Renderer {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    fn amount(&self, value: Decimal) -> String {
        format!("{}{}", self.currency, value)
    }

    pub fn render(&self, action: &Action) -> String {
        match action {
            Action::DeflectInvoice {
                item,
                status,
                already_explained: false,
            } => format!(
                "Your {} is currently {}. The invoice is finalised and issued only once the \
                 order is delivered, so it isn't available yet. If you need the tax details \
                 for an office claim or reimbursement, let me know and I'll share them.",
                item,
                status_phrase(*status)
            ),
            Action::DeflectInvoice {
                item,
                status,
                already_explained: true,
            } => format!(
                "As mentioned, the invoice for your {} becomes available after delivery, and \
                 the order is currently {}. I can share the tax breakdown now if you need it \
                 for a claim.",
                item,
                status_phrase(*status)
            ),
            Action::ProvideTaxSummary { summary } => self.tax_summary(summary),
            Action::RejectServiceRequest { item } => format!(
                "I'm sorry, {} doesn't need installation, so a technician visit can't be \
                 arranged for this order. Is there anything else I can help you with?",
                item
            ),
            Action::OfferEscalationChannel {
                trigger,
                already_offered: false,
            } => {
                let opener = match trigger {
                    OfferTrigger::Frustration => "I understand this is urgent.",
                    OfferTrigger::RepeatedDeflection { .. } => {
                        "I understand you still need the invoice."
                    }
                };
                format!(
                    "{} I can set up a WhatsApp reminder so you're notified as soon as your \
                     order is delivered and the invoice is ready. Would you like me to do that?",
                    opener
                )
            }
            Action::OfferEscalationChannel {
                already_offered: true,
                ..
            } => "My offer still stands: I can send you a WhatsApp reminder the moment the \
                  invoice is available after delivery. Just reply yes to set it up."
                .to_string(),
            Action::GenericAck { item, status } => format!(
                "I'm here to help with your {}, which is currently {}. You can ask me about \
                 your invoice or the tax details for a claim.",
                item,
                status_phrase(*status)
            ),
        }
    }

    fn tax_summary(&self, s: &TaxSummary) -> String {
        let mut lines = vec!["Here are the tax details from your order:".to_string()];
        let optional = [
            ("Order ID", &s.order_id),
            ("Invoice Date", &s.invoice_date),
            ("Seller", &s.seller),
            ("GSTIN", &s.gstin),
        ];
        for (label, value) in optional {
            if let Some(v) = value {
                lines.push(format!("{}: {}", label, v));
            }
        }
        lines.push(format!("Taxable Value: {}", self.amount(s.taxable_value)));
        lines.push(format!("SGST: {}", self.amount(s.sgst)));
        lines.push(format!("CGST: {}", self.amount(s.cgst)));
        lines.push(format!(
            "Goods Transport Charges: {}",
            self.amount(s.goods_transport_charge)
        ));
        lines.push(format!("Platform Fee: {}", self.amount(s.platform_fee)));
        lines.push(format!("Grand Total: {}", self.amount(s.grand_total)));
        lines.join("\n")
    }

    /// Opening agent turns shown before the user types anything
    pub fn greeting(&self, order: &OrderContext) -> Vec<String> {
        let hello = match order.customer_name() {
            Some(name) => format!("Hey {} 👋, I'm your Support Assistant", name),
            None => "Hey 👋, I'm your Support Assistant".to_string(),
        };
        vec![
            hello,
            format!(
                "I see that your {} is {}. How may I help you?",
                order.item(),
                status_phrase(order.shipping_status())
            ),
        ]
    }
}

fn status_phrase(status: ShippingStatus) -> &'static str {
    match status {
        ShippingStatus::Placed => "placed and being prepared for dispatch",
        ShippingStatus::Shipped => "shipped and on its way",
        ShippingStatus::Delivered => "delivered",
    }
}
