//! Transcript persistence for the CLI surface
//!
//! The core keeps the log in memory only. The chat front end saves it after
//! every exchange so a session can be resumed, and re-validates ordinals on
//! load so an edited file cannot break the append-only invariant.

use chrono::{DateTime, Utc};
use disclosure::{ConversationLog, LogIntegrityError, Turn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::prompts::PROMPT_VERSION;

/// Errors reading or writing a transcript file
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transcript is not a valid log: {0}")]
    Integrity(#[from] LogIntegrityError),
}

/// On-disk transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub prompt_version: String,
    pub turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(session_id: &str, log: &ConversationLog) -> Self {
        Self {
            session_id: session_id.to_string(),
            saved_at: Utc::now(),
            prompt_version: PROMPT_VERSION.to_string(),
            turns: log.turns().to_vec(),
        }
    }

    /// Validate the turns into a conversation log
    pub fn into_log(self) -> Result<(String, ConversationLog), TranscriptError> {
        let log = ConversationLog::from_turns(self.turns)?;
        Ok((self.session_id, log))
    }
}

/// Fresh session identifier
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Save the log to a JSON file
pub fn save_transcript(
    path: &Path,
    session_id: &str,
    log: &ConversationLog,
) -> Result<(), TranscriptError> {
    let json = serde_json::to_string_pretty(&Transcript::new(session_id, log))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a transcript, or `None` if the file does not exist yet
pub fn load_transcript(path: &Path) -> Result<Option<(String, ConversationLog)>, TranscriptError> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)?;
    let transcript: Transcript = serde_json::from_str(&json)?;
    Ok(Some(transcript.into_log()?))
}
