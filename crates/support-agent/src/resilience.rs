//! Resilience: degraded mode for generated replies
//!
//! The templated reply is always available. A hosted backend may phrase it
//! better, but any failure falls back to the template instead of surfacing
//! an error in the conversation.
//!
//! ```text
//! generate()
//!   ├─ ok within timeout, passes guard → DegradedReply { level: Full }
//!   ├─ timeout / error / guard failure  → DegradedReply { level: Fallback, warnings }
//!   └─ no backend configured            → DegradedReply { level: Fallback }
//! ```

use crate::backend::{BackendError, GenerationBackend, GenerationRequest};
use disclosure::{Action, OrderContext};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Name recorded when the templated reply is served
pub const TEMPLATE_SOURCE: &str = "template";

/// How the reply was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    /// The backend phrased the reply
    Full,
    /// The templated reply was used
    Fallback,
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A reply wrapped with degradation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedReply {
    pub text: String,
    pub level: DegradationLevel,
    /// Which source produced the text
    pub served_by: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DegradedReply {
    pub fn full(text: String, served_by: &str) -> Self {
        Self {
            text,
            level: DegradationLevel::Full,
            served_by: served_by.to_string(),
            warnings: Vec::new(),
        }
    }

    pub fn fallback(text: &str, warning: Option<String>) -> Self {
        Self {
            text: text.to_string(),
            level: DegradationLevel::Fallback,
            served_by: TEMPLATE_SOURCE.to_string(),
            warnings: warning.into_iter().collect(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.level != DegradationLevel::Full
    }
}

/// Words that belong only to an escalation offer
const OFFER_MARKERS: [&str; 2] = ["whatsapp", "reminder"];

/// Whether `text` quotes `literal` as a whole number, ignoring digit grouping
fn mentions_amount(text: &str, literal: &str) -> bool {
    let plain = text.replace(',', "");
    plain.match_indices(literal).any(|(at, _)| {
        let before = plain[..at].chars().next_back();
        let after = plain[at + literal.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit())
            && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

/// Stored amounts as they could appear in a reply: the stored literal and,
/// when different, its normalized form (`1385.6` for `1385.60`). Bare one- or
/// two-digit integers are skipped; they are indistinguishable from counts.
fn amount_forms(order: &OrderContext) -> Vec<String> {
    let s = order.tax_summary();
    let mut forms = Vec::new();
    for value in [
        s.taxable_value,
        s.sgst,
        s.cgst,
        s.goods_transport_charge,
        s.platform_fee,
        s.grand_total,
    ] {
        for form in [value.to_string(), value.normalize().to_string()] {
            if (form.contains('.') || form.len() >= 3) && !forms.contains(&form) {
                forms.push(form);
            }
        }
    }
    forms
}

/// Check generated text against the hard rules of the decided action.
///
/// Besides the action's own rules, a reply may not carry content that only
/// another action is allowed to give: stored amounts outside a tax summary,
/// a reminder outside an escalation offer. Returns the violated rule, if any.
pub fn guard_reply(action: &Action, order: &OrderContext, text: &str) -> Result<(), String> {
    let lower = text.to_lowercase();
    match action {
        Action::DeflectInvoice { .. } => {
            if ["http://", "https://", "www.", ".pdf"]
                .iter()
                .any(|m| lower.contains(m))
            {
                return Err("deflection must not contain a document link".into());
            }
        }
        Action::RejectServiceRequest { .. } => {
            if lower.contains("approved") {
                return Err("refusal must not claim approval".into());
            }
        }
        Action::ProvideTaxSummary { summary } => {
            for (label, value) in [
                ("taxable value", summary.taxable_value),
                ("SGST", summary.sgst),
                ("CGST", summary.cgst),
            ] {
                if !text.contains(&value.to_string()) {
                    return Err(format!("tax summary must quote {} {} exactly", label, value));
                }
            }
        }
        Action::OfferEscalationChannel { .. } | Action::GenericAck { .. } => {}
    }

    if !matches!(action, Action::ProvideTaxSummary { .. }) {
        if let Some(form) = amount_forms(order)
            .into_iter()
            .find(|form| mentions_amount(text, form))
        {
            return Err(format!("{} must not disclose amount {}", action.kind(), form));
        }
    }
    if !matches!(action, Action::OfferEscalationChannel { .. }) {
        if let Some(marker) = OFFER_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Err(format!("{} must not offer a {}", action.kind(), marker));
        }
    }
    if text.contains('[') && text.contains(']') {
        return Err("reply contains a bracketed placeholder".into());
    }
    Ok(())
}

/// Phrase a decided action through `backend`, falling back to `template`.
///
/// Never fails: every error path returns the template with a warning.
pub async fn reply_with_fallback(
    backend: Option<&dyn GenerationBackend>,
    request: &GenerationRequest,
    action: &Action,
    order: &OrderContext,
    template: &str,
    timeout: Duration,
) -> DegradedReply {
    let Some(backend) = backend else {
        return DegradedReply::fallback(template, None);
    };

    let outcome = match tokio::time::timeout(timeout, backend.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(timeout)),
    };

    let warning = match outcome {
        Ok(text) => match guard_reply(action, order, &text) {
            Ok(()) => return DegradedReply::full(text, backend.name()),
            Err(rule) => format!("{}: reply rejected: {}", backend.name(), rule),
        },
        Err(e) => format!("{}: {}", backend.name(), e),
    };

    warn!(
        backend = backend.name(),
        action = %action.kind(),
        warning = %warning,
        "Serving templated reply"
    );
    DegradedReply::fallback(template, Some(warning))
}
