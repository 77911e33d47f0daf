//! Escalation: deciding when to disclose, deflect, refuse or offer
//!
//! The state is derived from the conversation on every call and the engine
//! is a pure function of (order, history, message). All decisions are
//! deterministic.
//!
//! # Escalation ladder
//!
//! ```text
//! user turn 1..2   invoice request → DeflectInvoice (never an offer)
//!     │
//!     ├─ claim / reimbursement signal → ProvideTaxSummary at any point
//!     │
//!     ▼
//! user turn 3+     invoice request deflected 2x → OfferEscalationChannel
//!                  frustration + open invoice need → OfferEscalationChannel
//!     │
//!     ▼
//! delivered        invoice is final → ProvideTaxSummary, no offers
//! ```

pub mod engine;
pub mod state;

pub use engine::{
    Action, Decision, DisclosurePolicy, OfferTrigger, PolicyConfig, MIN_DEFLECTIONS,
    MIN_OFFER_TURN,
};
pub use state::{ActionKind, EscalationState};
