use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use disclosure::{ConversationLog, Speaker, Turn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use support_agent::config::api_key_from_env;
use support_agent::transcript::{load_transcript, new_session_id};
use support_agent::{build_session, AgentConfig, GeminiBackend, SupportAgent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (order, policy, backend)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat on stdin/stdout
    Chat {
        /// Phrase replies through the hosted model (needs GEMINI_API_KEY)
        #[arg(long, default_value_t = false)]
        backend: bool,

        /// Load this transcript if it exists and save to it after every reply
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Feed one user message per line from a script file and print the transcript
    Replay {
        script: PathBuf,

        #[arg(long, default_value_t = false)]
        backend: bool,

        /// Print the transcript as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the decision for one message as JSON without changing any transcript
    Decide {
        message: String,

        /// Decide against the history in this transcript
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

fn print_turn(turn: &Turn) {
    let who = match turn.speaker {
        Speaker::User => "You",
        Speaker::Agent => "Agent",
    };
    println!("{}: {}", who, turn.text);
}

fn resume_log(path: Option<&Path>) -> Result<(String, Option<ConversationLog>)> {
    match path {
        Some(path) => match load_transcript(path)
            .with_context(|| format!("Failed to load transcript {}", path.display()))?
        {
            Some((id, log)) => {
                info!(session = %id, turns = log.len(), "Resuming transcript");
                Ok((id, Some(log)))
            }
            None => Ok((new_session_id(), None)),
        },
        None => Ok((new_session_id(), None)),
    }
}

fn make_agent(
    config: &AgentConfig,
    use_backend: bool,
    transcript: Option<&Path>,
) -> Result<SupportAgent> {
    let (session_id, log) = resume_log(transcript)?;
    let session = build_session(config, log)?;
    let mut agent = SupportAgent::new(session, session_id);

    if use_backend {
        match api_key_from_env() {
            Some(key) => {
                let backend = GeminiBackend::new(&config.backend, key)?;
                info!(model = %config.backend.model, "Hosted backend enabled");
                agent = agent.with_backend(
                    Box::new(backend),
                    Duration::from_secs(config.backend.timeout_secs.max(1)),
                );
            }
            None => warn!(
                "--backend given but {} is not set; using templated replies",
                support_agent::config::API_KEY_ENV
            ),
        }
    }
    if let Some(path) = transcript {
        agent = agent.with_transcript(path.to_path_buf());
    }
    Ok(agent)
}

async fn chat(config: &AgentConfig, use_backend: bool, transcript: Option<&Path>) -> Result<()> {
    let mut agent = make_agent(config, use_backend, transcript)?;
    for turn in agent.turns() {
        print_turn(turn);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }
        let reply = agent.respond(line).await?;
        println!("Agent: {}", reply.reply.text);
    }
    info!(session = %agent.session_id(), turns = agent.turns().len(), "Chat ended");
    Ok(())
}

async fn replay(config: &AgentConfig, script: &Path, use_backend: bool, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let mut agent = make_agent(config, use_backend, None)?;

    for line in content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
    {
        agent.respond(line).await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(agent.session().log())?);
    } else {
        for turn in agent.turns() {
            print_turn(turn);
        }
    }
    Ok(())
}

fn decide(config: &AgentConfig, message: &str, transcript: Option<&Path>) -> Result<()> {
    if let Some(path) = transcript {
        if !path.exists() {
            bail!("Transcript {} does not exist", path.display());
        }
    }
    let (_, log) = resume_log(transcript)?;
    let session = build_session(config, log)?;
    let exchange = session.preview(message)?;
    let out = serde_json::json!({
        "decision": exchange.decision,
        "rendered": exchange.rendered,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::load(args.config.as_deref())?;
    info!(
        model = %config.backend.model,
        currency = %config.currency,
        "Support agent starting"
    );

    match args.command {
        Command::Chat {
            backend,
            transcript,
        } => chat(&config, backend, transcript.as_deref()).await,
        Command::Replay {
            script,
            backend,
            json,
        } => replay(&config, &script, backend, json).await,
        Command::Decide {
            message,
            transcript,
        } => decide(&config, &message, transcript.as_deref()),
    }
}
