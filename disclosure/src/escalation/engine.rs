//! Disclosure Policy: deterministic decision for each user message
//!
//! Consumes the order context, the prior conversation and the newest message
//! to produce a [`Decision`]. No I/O and no model calls in this module.
//!
//! Precedence, first match wins:
//!
//! ```text
//! RejectServiceRequest    technician keyword, item not installable
//! ProvideTaxSummary       office/claim/reimbursement, no technician keyword
//! OfferEscalationChannel  turn >= 3 and (2+ deflections of a repeated
//!                         invoice request, or frustration with an invoice
//!                         need on record); never once delivered
//! DeflectInvoice          invoice request before delivery
//!                         (after delivery the tax summary is disclosed)
//! GenericAck              anything else
//! ```

use crate::conversation::{Speaker, Turn};
use crate::error::{PolicyError, PolicyResult};
use crate::escalation::state::{ActionKind, EscalationState};
use crate::intent::{IntentClassifier, IntentSignals, Keywords};
use crate::order::{OrderContext, ShippingStatus, TaxSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Offers are never made before this user turn
pub const MIN_OFFER_TURN: u32 = 3;

/// Offers on a repeated request need at least this many prior deflections
pub const MIN_DEFLECTIONS: u32 = 2;

/// Why an escalation offer was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferTrigger {
    /// The same invoice need was deflected repeatedly
    RepeatedDeflection { deflections: u32 },
    /// The user signalled urgency about an established need
    Frustration,
}

impl std::fmt::Display for OfferTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepeatedDeflection { deflections } => {
                write!(f, "invoice request deflected {}x", deflections)
            }
            Self::Frustration => write!(f, "frustration marker on an open invoice need"),
        }
    }
}

/// Policy action plus the literal values needed to render it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    DeflectInvoice {
        item: String,
        status: ShippingStatus,
        already_explained: bool,
    },
    ProvideTaxSummary {
        summary: TaxSummary,
    },
    RejectServiceRequest {
        item: String,
    },
    OfferEscalationChannel {
        trigger: OfferTrigger,
        already_offered: bool,
    },
    GenericAck {
        item: String,
        status: ShippingStatus,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::DeflectInvoice { .. } => ActionKind::DeflectInvoice,
            Self::ProvideTaxSummary { .. } => ActionKind::ProvideTaxSummary,
            Self::RejectServiceRequest { .. } => ActionKind::RejectServiceRequest,
            Self::OfferEscalationChannel { .. } => ActionKind::OfferEscalationChannel,
            Self::GenericAck { .. } => ActionKind::GenericAck,
        }
    }
}

/// Decision produced by the policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Which rule fired, for logs and operators
    pub rationale: String,
    /// Counters the decision was based on
    pub state: EscalationState,
    /// Triggers found in the message
    pub signals: IntentSignals,
}

/// Configuration for the disclosure policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub keywords: Keywords,
    /// Earliest user turn an offer may be made on (never below 3)
    pub earliest_offer_turn: u32,
    /// Deflections of the same need before offering (never below 2)
    pub deflection_threshold: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            keywords: Keywords::default(),
            earliest_offer_turn: MIN_OFFER_TURN,
            deflection_threshold: MIN_DEFLECTIONS,
        }
    }
}

/// The disclosure policy, a pure decision procedure
#[derive(Debug, Clone)]
pub struct DisclosurePolicy {
    config: PolicyConfig,
    classifier: IntentClassifier,
}

/// Internal outcome of the rule ladder, before payloads are attached
struct Choice {
    kind: ActionKind,
    trigger: Option<OfferTrigger>,
    rationale: String,
}

impl Choice {
    fn new(kind: ActionKind, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            trigger: None,
            rationale: rationale.into(),
        }
    }
}

impl DisclosurePolicy {
    /// Create a policy with default config
    pub fn new() -> PolicyResult<Self> {
        Self::with_config(PolicyConfig::default())
    }

    /// Create with custom config.
    ///
    /// Thresholds below the floors are raised to them; the keyword sets must
    /// compile.
    pub fn with_config(mut config: PolicyConfig) -> PolicyResult<Self> {
        if config.earliest_offer_turn < MIN_OFFER_TURN {
            warn!(
                configured = config.earliest_offer_turn,
                floor = MIN_OFFER_TURN,
                "earliest_offer_turn below floor, raising"
            );
            config.earliest_offer_turn = MIN_OFFER_TURN;
        }
        if config.deflection_threshold < MIN_DEFLECTIONS {
            warn!(
                configured = config.deflection_threshold,
                floor = MIN_DEFLECTIONS,
                "deflection_threshold below floor, raising"
            );
            config.deflection_threshold = MIN_DEFLECTIONS;
        }
        let classifier = IntentClassifier::new(&config.keywords)?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn classify(&self, message: &str) -> IntentSignals {
        self.classifier.classify(message)
    }

    /// Decide how to answer `message`.
    ///
    /// `turns` is the history strictly preceding the message; every user turn
    /// in it counts, even one whose text repeats `message`. Callers that have
    /// already appended the message use [`DisclosurePolicy::decide_last`].
    pub fn decide(
        &self,
        order: &OrderContext,
        turns: &[Turn],
        message: &str,
    ) -> PolicyResult<Decision> {
        if message.trim().is_empty() {
            return Err(PolicyError::EmptyMessage);
        }

        let signals = self.classifier.classify(message);
        let state = self.derive_state(order, turns, &signals);
        let choice = self.choose(order, &state, &signals);

        debug!(
            action = %choice.kind,
            user_turn = state.user_turn,
            deflections = state.deflection_count,
            frustrated = state.frustration_detected,
            "Disclosure decision"
        );

        Ok(Decision {
            action: self.build_action(order, &state, choice.kind, choice.trigger),
            rationale: choice.rationale,
            state,
            signals,
        })
    }

    /// Decide on the final turn of `turns`, which must be a user turn.
    ///
    /// Returns [`PolicyError::EmptyMessage`] when the log does not end with a
    /// user message.
    pub fn decide_last(&self, order: &OrderContext, turns: &[Turn]) -> PolicyResult<Decision> {
        match turns.split_last() {
            Some((last, prior)) if last.speaker == Speaker::User => {
                self.decide(order, prior, &last.text)
            }
            _ => Err(PolicyError::EmptyMessage),
        }
    }

    /// Rebuild the escalation state for a message with the given signals.
    ///
    /// Each prior user turn is replayed through the rule ladder so that the
    /// deflection and offer counts are exactly what the policy produced then.
    fn derive_state(
        &self,
        order: &OrderContext,
        prior: &[Turn],
        signals: &IntentSignals,
    ) -> EscalationState {
        let mut state = EscalationState::new();
        for text in prior
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .map(|t| t.text.as_str())
        {
            let past = self.classifier.classify(text);
            state.begin_turn(&past);
            let choice = self.choose(order, &state, &past);
            state.record_action(choice.kind);
        }
        state.begin_turn(signals);
        state
    }

    fn choose(
        &self,
        order: &OrderContext,
        state: &EscalationState,
        signals: &IntentSignals,
    ) -> Choice {
        if signals.service_request && !order.is_installable() {
            return Choice::new(
                ActionKind::RejectServiceRequest,
                format!("service request for non-installable item '{}'", order.item()),
            );
        }

        if signals.tax_claim && !signals.service_request {
            return Choice::new(
                ActionKind::ProvideTaxSummary,
                "claim or reimbursement need: disclosing stored amounts",
            );
        }

        if let Some(trigger) = self.offer_trigger(order, state, signals) {
            return Choice {
                kind: ActionKind::OfferEscalationChannel,
                trigger: Some(trigger),
                rationale: format!("Escalating: {}", trigger),
            };
        }

        if signals.invoice_request {
            if order.shipping_status().invoice_final() {
                return Choice::new(
                    ActionKind::ProvideTaxSummary,
                    "invoice request after delivery: invoice is final",
                );
            }
            return Choice::new(
                ActionKind::DeflectInvoice,
                format!(
                    "invoice request while {}: invoice finalises on delivery",
                    order.shipping_status()
                ),
            );
        }

        Choice::new(ActionKind::GenericAck, "no trigger matched")
    }

    fn offer_trigger(
        &self,
        order: &OrderContext,
        state: &EscalationState,
        signals: &IntentSignals,
    ) -> Option<OfferTrigger> {
        if order.shipping_status().invoice_final()
            || state.user_turn < self.config.earliest_offer_turn
        {
            return None;
        }

        if signals.invoice_request && state.deflection_count >= self.config.deflection_threshold {
            return Some(OfferTrigger::RepeatedDeflection {
                deflections: state.deflection_count,
            });
        }

        if signals.frustration && state.invoice_need_established() {
            return Some(OfferTrigger::Frustration);
        }

        None
    }

    fn build_action(
        &self,
        order: &OrderContext,
        state: &EscalationState,
        kind: ActionKind,
        trigger: Option<OfferTrigger>,
    ) -> Action {
        match (kind, trigger) {
            (ActionKind::DeflectInvoice, _) => Action::DeflectInvoice {
                item: order.item().to_string(),
                status: order.shipping_status(),
                already_explained: state.already_explained_policy,
            },
            (ActionKind::ProvideTaxSummary, _) => Action::ProvideTaxSummary {
                summary: order.tax_summary(),
            },
            (ActionKind::RejectServiceRequest, _) => Action::RejectServiceRequest {
                item: order.item().to_string(),
            },
            (ActionKind::OfferEscalationChannel, Some(trigger)) => {
                Action::OfferEscalationChannel {
                    trigger,
                    already_offered: state.offers_made > 0,
                }
            }
            (ActionKind::OfferEscalationChannel, None) | (ActionKind::GenericAck, _) => {
                Action::GenericAck {
                    item: order.item().to_string(),
                    status: order.shipping_status(),
                }
            }
        }
    }
}
