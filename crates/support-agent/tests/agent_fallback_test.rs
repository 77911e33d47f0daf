//! Integration tests for the support agent loop
//!
//! Drives `SupportAgent::respond` with scripted backends to check that every
//! failure path still appends exactly one reply per message and that the
//! transcript survives a restart.

use async_trait::async_trait;
use disclosure::{ActionKind, Speaker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support_agent::transcript::load_transcript;
use support_agent::{
    build_session, AgentConfig, BackendError, DegradationLevel, GenerationBackend,
    GenerationRequest, SupportAgent,
};

/// Scripted backend behaviour
enum Script {
    Reply(&'static str),
    Fail,
    Hang,
}

struct MockBackend {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    fn boxed(script: Script) -> (Box<dyn GenerationBackend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Box::new(MockBackend {
            script,
            calls: calls.clone(),
        });
        (backend, calls)
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::Fail => Err(BackendError::Status {
                status: 503,
                body: "overloaded".into(),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".into())
            }
        }
    }
}

fn agent_with(script: Script) -> (SupportAgent, Arc<AtomicUsize>) {
    let session = build_session(&AgentConfig::default(), None).unwrap();
    let (backend, calls) = MockBackend::boxed(script);
    let agent =
        SupportAgent::new(session, "test".into()).with_backend(backend, Duration::from_secs(5));
    (agent, calls)
}

fn assert_ordinals(agent: &SupportAgent) {
    for (i, turn) in agent.turns().iter().enumerate() {
        assert_eq!(turn.ordinal, i as u64 + 1);
    }
}

/// Test: A well-behaved backend reply is used as-is
#[tokio::test]
async fn test_backend_reply_is_served() {
    let (mut agent, calls) = agent_with(Script::Reply(
        "Your invoice will be available once the shampoo is delivered.",
    ));
    let reply = agent.respond("Where is my invoice?").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reply.decision.action.kind(), ActionKind::DeflectInvoice);
    assert_eq!(reply.reply.level, DegradationLevel::Full);
    assert_eq!(reply.reply.served_by, "mock");
    let last = agent.turns().last().unwrap();
    assert_eq!(last.speaker, Speaker::Agent);
    assert_eq!(last.text, reply.reply.text);
}

/// Test: A backend error appends the templated reply instead
#[tokio::test]
async fn test_backend_failure_falls_back_to_template() {
    let (mut agent, _) = agent_with(Script::Fail);
    let before = agent.turns().len();
    let reply = agent.respond("Where is my invoice?").await.unwrap();

    assert!(reply.reply.is_degraded());
    assert_eq!(reply.reply.warnings.len(), 1);
    let template = agent.session().renderer().render(&reply.decision.action);
    assert_eq!(reply.reply.text, template);
    assert_eq!(agent.turns().len(), before + 2);
    assert_ordinals(&agent);
}

/// Test: A reply that leaks a document link is replaced by the template
#[tokio::test]
async fn test_guard_rejects_linked_invoice() {
    let (mut agent, _) = agent_with(Script::Reply(
        "Sure! Download it here: https://example.test/invoice.pdf",
    ));
    let reply = agent.respond("send me the invoice").await.unwrap();

    assert_eq!(reply.decision.action.kind(), ActionKind::DeflectInvoice);
    assert!(reply.reply.is_degraded());
    assert!(!agent.turns().last().unwrap().text.contains("https://"));
}

/// Test: Stored amounts in a deflection are never served
#[tokio::test]
async fn test_amounts_leaked_into_deflection_fall_back() {
    let (mut agent, _) = agent_with(Script::Reply(
        "Not final yet, but taxable value is 1385.60, SGST 124.70, CGST 124.70.",
    ));
    let reply = agent.respond("where is my invoice").await.unwrap();

    assert_eq!(reply.decision.action.kind(), ActionKind::DeflectInvoice);
    assert_eq!(reply.reply.level, DegradationLevel::Fallback);
    assert!(reply.reply.warnings[0].contains("1385.60"));
    let last = &agent.turns().last().unwrap().text;
    assert!(!last.contains("1385.60") && !last.contains("124.70"));
}

/// Test: A reminder offer outside an escalation is never served
#[tokio::test]
async fn test_reminder_on_first_turn_falls_back() {
    let (mut agent, _) = agent_with(Script::Reply("I can set up a WhatsApp reminder"));
    let reply = agent.respond("hello").await.unwrap();

    assert_eq!(reply.decision.state.user_turn, 1);
    assert_eq!(reply.decision.action.kind(), ActionKind::GenericAck);
    assert!(reply.reply.is_degraded());
    assert!(!agent
        .turns()
        .last()
        .unwrap()
        .text
        .to_lowercase()
        .contains("whatsapp"));
}

/// Test: A hanging backend is cut off by the timeout
#[tokio::test(start_paused = true)]
async fn test_backend_timeout_falls_back() {
    let (mut agent, calls) = agent_with(Script::Hang);
    let reply = agent.respond("I need the bill").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(reply.reply.is_degraded());
    assert!(reply.reply.warnings[0].contains("timed out"));
    assert_ordinals(&agent);
}

/// Test: Empty input is refused without touching the log
#[tokio::test]
async fn test_empty_message_leaves_log_unchanged() {
    let (mut agent, calls) = agent_with(Script::Fail);
    let before = agent.turns().to_vec();

    assert!(agent.respond("   ").await.is_err());
    assert_eq!(agent.turns(), before.as_slice());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test: Escalation state carries across a saved and resumed transcript
#[tokio::test]
async fn test_resumed_transcript_keeps_escalation_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.json");
    let config = AgentConfig::default();

    {
        let session = build_session(&config, None).unwrap();
        let mut agent = SupportAgent::new(session, "resume".into()).with_transcript(path.clone());
        agent.respond("Where is my invoice?").await.unwrap();
        agent.respond("Can I get the bill?").await.unwrap();
    }

    let (id, log) = load_transcript(&path).unwrap().unwrap();
    assert_eq!(id, "resume");
    let session = build_session(&config, Some(log)).unwrap();
    let mut agent = SupportAgent::new(session, id).with_transcript(path.clone());
    let reply = agent.respond("Please send the invoice").await.unwrap();

    assert_eq!(reply.decision.state.user_turn, 3);
    assert_eq!(
        reply.decision.action.kind(),
        ActionKind::OfferEscalationChannel
    );
    assert_ordinals(&agent);

    let (_, saved) = load_transcript(&path).unwrap().unwrap();
    assert_eq!(saved.len(), agent.turns().len());
}
