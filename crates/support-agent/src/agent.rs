//! Support agent: the conversation loop with an optional hosted backend
//!
//! One agent owns one [`SupportSession`]. Each message is accepted, decided,
//! phrased (backend or template) and appended before the next is taken, so
//! the log always alternates user turn, agent turn.

use crate::backend::{GenerationBackend, GenerationRequest};
use crate::config::AgentConfig;
use crate::prompts::system_instruction;
use crate::resilience::{reply_with_fallback, DegradedReply};
use crate::transcript::save_transcript;
use anyhow::{Context, Result};
use disclosure::{
    ConversationLog, Decision, DisclosurePolicy, OrderContext, Renderer, SupportSession, Turn,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Validate the configured order and policy into a session.
///
/// With `log` the session resumes from it; otherwise it starts with the
/// greeting turns. Configuration errors are logged for the operator and
/// returned; they never reach the transcript.
pub fn build_session(config: &AgentConfig, log: Option<ConversationLog>) -> Result<SupportSession> {
    let order = OrderContext::from_draft(config.order.clone()).map_err(|e| {
        error!(error = %e, "Order configuration rejected");
        e
    })?;
    let policy = DisclosurePolicy::with_config(config.policy.clone()).map_err(|e| {
        error!(error = %e, "Policy configuration rejected");
        e
    })?;
    let renderer = Renderer::new(config.currency.clone());
    Ok(match log {
        Some(log) => SupportSession::resume(order, log, policy, renderer),
        None => SupportSession::start(order, policy, renderer),
    })
}

/// Outcome of one user message
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub decision: Decision,
    pub reply: DegradedReply,
}

pub struct SupportAgent {
    session: SupportSession,
    session_id: String,
    backend: Option<Box<dyn GenerationBackend>>,
    timeout: Duration,
    transcript_path: Option<PathBuf>,
}

impl SupportAgent {
    pub fn new(session: SupportSession, session_id: String) -> Self {
        Self {
            session,
            session_id,
            backend: None,
            timeout: Duration::from_secs(20),
            transcript_path: None,
        }
    }

    /// Phrase replies through a hosted backend, bounded by `timeout`
    pub fn with_backend(mut self, backend: Box<dyn GenerationBackend>, timeout: Duration) -> Self {
        self.backend = Some(backend);
        self.timeout = timeout;
        self
    }

    /// Save the transcript to `path` after every exchange
    pub fn with_transcript(mut self, path: PathBuf) -> Self {
        self.transcript_path = Some(path);
        self
    }

    pub fn session(&self) -> &SupportSession {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> &[Turn] {
        self.session.turns()
    }

    /// Process one user message to completion.
    ///
    /// Policy errors (empty input) are returned before the log changes.
    /// Backend failures never are: the templated reply is appended instead.
    pub async fn respond(&mut self, message: &str) -> Result<AgentReply> {
        let history_len = self.session.turns().len();
        let exchange = self.session.accept(message)?;

        let reply = match self.backend.as_deref() {
            Some(backend) => {
                let request = GenerationRequest {
                    system_instruction: system_instruction(
                        self.session.order(),
                        &exchange.decision,
                        &exchange.rendered,
                    ),
                    history: self.session.turns()[..history_len].to_vec(),
                    message: message.trim().to_string(),
                };
                reply_with_fallback(
                    Some(backend),
                    &request,
                    &exchange.decision.action,
                    self.session.order(),
                    &exchange.rendered,
                    self.timeout,
                )
                .await
            }
            None => DegradedReply::fallback(&exchange.rendered, None),
        };

        self.session.record_reply(reply.text.clone());
        info!(
            session = %self.session_id,
            action = %exchange.decision.action.kind(),
            served_by = %reply.served_by,
            degraded = reply.is_degraded(),
            "Reply appended"
        );

        if let Some(path) = &self.transcript_path {
            save_transcript(path, &self.session_id, self.session.log())
                .with_context(|| format!("Failed to save transcript {}", path.display()))?;
        }

        Ok(AgentReply {
            decision: exchange.decision,
            reply,
        })
    }
}
