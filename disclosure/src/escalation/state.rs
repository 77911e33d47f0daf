//! Escalation State: counters derived from the user turns of a conversation
//!
//! Never stored alongside the log. The engine rebuilds it on every decision
//! by folding prior user turns through the same trigger rules, so it cannot
//! drift from the history it describes.

use crate::intent::IntentSignals;
use serde::{Deserialize, Serialize};

/// What the policy chose for a turn, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DeflectInvoice,
    ProvideTaxSummary,
    RejectServiceRequest,
    OfferEscalationChannel,
    GenericAck,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeflectInvoice => write!(f, "deflect_invoice"),
            Self::ProvideTaxSummary => write!(f, "provide_tax_summary"),
            Self::RejectServiceRequest => write!(f, "reject_service_request"),
            Self::OfferEscalationChannel => write!(f, "offer_escalation_channel"),
            Self::GenericAck => write!(f, "generic_ack"),
        }
    }
}

/// Derived conversation counters at the moment a message is decided.
///
/// Counts that describe the message itself (`user_turn`,
/// `invoice_request_count`, `frustration_detected`) include it. Counts of
/// agent actions (`deflection_count`, `offers_made`) cover earlier turns only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationState {
    /// 1-based index of the user message being decided
    pub user_turn: u32,
    /// User messages so far that asked for the invoice
    pub invoice_request_count: u32,
    /// Earlier turns answered with an invoice deflection
    pub deflection_count: u32,
    /// Whether the invoice-on-delivery policy was already explained
    pub already_explained_policy: bool,
    /// Earlier turns answered with an escalation offer
    pub offers_made: u32,
    /// Whether the message being decided carries a frustration marker
    pub frustration_detected: bool,
}

impl EscalationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next user message
    pub fn begin_turn(&mut self, signals: &IntentSignals) {
        self.user_turn += 1;
        if signals.invoice_request {
            self.invoice_request_count += 1;
        }
        self.frustration_detected = signals.frustration;
    }

    /// Record the action chosen for the current user message
    pub fn record_action(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::DeflectInvoice => {
                self.deflection_count += 1;
                self.already_explained_policy = true;
            }
            ActionKind::OfferEscalationChannel => {
                self.offers_made += 1;
            }
            ActionKind::ProvideTaxSummary
            | ActionKind::RejectServiceRequest
            | ActionKind::GenericAck => {}
        }
    }

    /// Whether an invoice need has been voiced at any point so far
    pub fn invoice_need_established(&self) -> bool {
        self.invoice_request_count > 0
    }

    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "turn={} invoice_requests={} deflections={} offers={} frustrated={}",
            self.user_turn,
            self.invoice_request_count,
            self.deflection_count,
            self.offers_made,
            self.frustration_detected,
        )
    }
}
