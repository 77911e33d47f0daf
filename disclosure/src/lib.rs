//! Order-support disclosure policy
//!
//! This library provides:
//! - An immutable [`OrderContext`] validated from configuration
//! - An append-only [`ConversationLog`]
//! - A deterministic [`DisclosurePolicy`] that decides, per user message,
//!   whether to deflect an invoice request, disclose tax figures, refuse a
//!   service request, offer an escalation channel, or acknowledge
//! - A template [`Renderer`] and a [`SupportSession`] loop tying them together
//!
//! # Usage
//!
//! ```rust,ignore
//! use disclosure::{DisclosurePolicy, OrderContext, Renderer, SupportSession};
//!
//! let order = OrderContext::from_draft(draft)?;
//! let mut session = SupportSession::start(order, DisclosurePolicy::new()?, Renderer::default());
//! let exchange = session.submit("where is my invoice")?;
//! println!("{}", exchange.rendered);
//! ```

pub mod conversation;
pub mod error;
pub mod escalation;
pub mod intent;
pub mod order;
pub mod render;
pub mod session;

pub use conversation::{ConversationLog, LogIntegrityError, Speaker, Turn};
pub use error::{PolicyError, PolicyResult};
pub use escalation::{
    Action, ActionKind, Decision, DisclosurePolicy, EscalationState, OfferTrigger, PolicyConfig,
};
pub use intent::{IntentClassifier, IntentSignals, Keywords};
pub use order::{OrderContext, OrderDraft, ShippingStatus, TaxSummary};
pub use render::Renderer;
pub use rust_decimal::Decimal;
pub use session::{Exchange, SupportSession};

/// Decide on `message` with the default policy configuration
pub fn decide(order: &OrderContext, turns: &[Turn], message: &str) -> PolicyResult<Decision> {
    DisclosurePolicy::new()?.decide(order, turns, message)
}

/// Render an action with the default renderer
pub fn render(action: &Action) -> String {
    Renderer::default().render(action)
}
