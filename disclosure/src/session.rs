//! Conversation loop: one session owns one order and one log
//!
//! Each submitted message is processed to completion before the next is
//! accepted: append the user turn, decide, render, append the agent turn.

use crate::conversation::{ConversationLog, Speaker, Turn};
use crate::error::{PolicyError, PolicyResult};
use crate::escalation::engine::{Decision, DisclosurePolicy};
use crate::order::OrderContext;
use crate::render::Renderer;
use tracing::info;

/// Result of one processed user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub decision: Decision,
    /// Deterministic text for the decision
    pub rendered: String,
}

/// A single support conversation
#[derive(Debug, Clone)]
pub struct SupportSession {
    order: OrderContext,
    log: ConversationLog,
    policy: DisclosurePolicy,
    renderer: Renderer,
}

impl SupportSession {
    /// Start a fresh session, seeding the log with the greeting turns
    pub fn start(order: OrderContext, policy: DisclosurePolicy, renderer: Renderer) -> Self {
        let mut log = ConversationLog::new();
        for line in renderer.greeting(&order) {
            log.append(Speaker::Agent, line);
        }
        Self::resume(order, log, policy, renderer)
    }

    /// Continue a session from an existing log
    pub fn resume(
        order: OrderContext,
        log: ConversationLog,
        policy: DisclosurePolicy,
        renderer: Renderer,
    ) -> Self {
        Self {
            order,
            log,
            policy,
            renderer,
        }
    }

    pub fn order(&self) -> &OrderContext {
        &self.order
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn turns(&self) -> &[Turn] {
        self.log.turns()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Decide on a message without touching the log
    pub fn preview(&self, message: &str) -> PolicyResult<Exchange> {
        let decision = self.policy.decide(&self.order, self.log.turns(), message)?;
        let rendered = self.renderer.render(&decision.action);
        Ok(Exchange { decision, rendered })
    }

    /// Append the user message and decide on it, leaving the reply to the caller.
    ///
    /// Pair with [`SupportSession::record_reply`]. Empty input is rejected
    /// before anything is appended.
    pub fn accept(&mut self, message: &str) -> PolicyResult<Exchange> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PolicyError::EmptyMessage);
        }
        let exchange = self.preview(message)?;
        self.log.append(Speaker::User, message);
        info!(
            action = %exchange.decision.action.kind(),
            state = %exchange.decision.state.summary(),
            rationale = %exchange.decision.rationale,
            "Message accepted"
        );
        Ok(exchange)
    }

    /// Append the agent reply for the last accepted message
    pub fn record_reply(&mut self, text: impl Into<String>) -> &Turn {
        self.log.append(Speaker::Agent, text)
    }

    /// Full deterministic cycle: accept, render, append the rendered reply
    pub fn submit(&mut self, message: &str) -> PolicyResult<Exchange> {
        let exchange = self.accept(message)?;
        self.record_reply(exchange.rendered.clone());
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::state::ActionKind;
    use crate::order::{OrderDraft, ShippingStatus};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn session() -> SupportSession {
        let d = |s: &str| Some(Decimal::from_str(s).unwrap());
        let order = OrderContext::from_draft(OrderDraft {
            item: Some("shampoo".into()),
            shipping_status: Some(ShippingStatus::Shipped),
            is_installable: Some(false),
            taxable_value: d("1385.60"),
            sgst: d("124.70"),
            cgst: d("124.70"),
            goods_transport_charge: d("238.00"),
            platform_fee: d("7.00"),
            grand_total: d("1880.00"),
            customer_name: Some("Rohit".into()),
            ..Default::default()
        })
        .unwrap();
        SupportSession::start(order, DisclosurePolicy::new().unwrap(), Renderer::default())
    }

    #[test]
    fn test_start_seeds_greeting() {
        let s = session();
        assert_eq!(s.turns().len(), 2);
        assert!(s.turns()[0].text.starts_with("Hey Rohit"));
        assert!(s.turns().iter().all(|t| t.speaker == Speaker::Agent));
    }

    #[test]
    fn test_submit_appends_user_then_agent() {
        let mut s = session();
        let ex = s.submit("  where is my invoice ").unwrap();
        assert_eq!(ex.decision.action.kind(), ActionKind::DeflectInvoice);
        let turns = s.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].speaker, Speaker::User);
        assert_eq!(turns[2].text, "where is my invoice");
        assert_eq!(turns[3].text, ex.rendered);
        assert_eq!(turns[3].ordinal, 4);
    }

    #[test]
    fn test_empty_submit_leaves_log_untouched() {
        let mut s = session();
        assert_eq!(s.submit(" \n"), Err(PolicyError::EmptyMessage));
        assert_eq!(s.turns().len(), 2);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let s = session();
        let a = s.preview("invoice").unwrap();
        let b = s.preview("invoice").unwrap();
        assert_eq!(a, b);
        assert_eq!(s.turns().len(), 2);
    }

    #[test]
    fn test_external_reply_keeps_state_consistent() {
        let mut s = session();
        s.accept("invoice").unwrap();
        s.record_reply("generated text");
        let ex = s.submit("invoice again").unwrap();
        assert_eq!(ex.decision.state.user_turn, 2);
        assert_eq!(ex.decision.state.deflection_count, 1);
    }
}
