//! Interactive chat and one-shot questions.

use std::io::{self, Write as _};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

use super::render::{StreamPrinter, write_message};
use crate::config::Config;
use crate::core::agentos::{RunRequest, RunTransport};
use crate::core::new_message_id;
use crate::core::session::{ChatSession, ExchangeOutcome};

const HELP: &str = "\
Commands:
  /agent [id]  show or switch the agent (starts a new conversation)
  /new         start a new conversation
  /help        show this help
  /quit        exit
Ctrl-C cancels the answer being streamed.";

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Message(String),
    Agent(Option<String>),
    New,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "agent" => Input::Agent(parts.next().map(ToString::to_string)),
        "new" => Input::New,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

fn chat_session(config: &Config, agent: Option<String>) -> anyhow::Result<ChatSession> {
    let client = config.agentos_client()?;
    let transport: Arc<dyn RunTransport> = Arc::new(client);
    Ok(ChatSession::new(
        transport,
        agent.unwrap_or_else(|| config.agentos.agent.clone()),
        config.reducer(),
        config.agentos.user_id.clone(),
    ))
}

/// Run one exchange, printing as it streams. Ctrl-C cancels it.
async fn exchange(session: &ChatSession, text: String) -> anyhow::Result<ExchangeOutcome> {
    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            let mut printer = StreamPrinter::new(io::stdout(), io::stderr());
            let outcome = session
                .submit(&text, |message| {
                    printer.update(message).ok();
                })
                .await;
            if let Ok(ExchangeOutcome::Completed(message)) = &outcome {
                printer.finish(message).ok();
            }
            outcome
        })
    };
    tokio::pin!(task);

    loop {
        tokio::select! {
            joined = &mut task => return Ok(joined??),
            signal = tokio::signal::ctrl_c() => {
                signal?;
                session.cancel();
            }
        }
    }
}

fn report(result: anyhow::Result<ExchangeOutcome>) {
    match result {
        Ok(ExchangeOutcome::Completed(_)) => {}
        Ok(ExchangeOutcome::Cancelled) => eprintln!("\n(cancelled)"),
        Ok(ExchangeOutcome::Superseded) => eprintln!("\n(conversation was reset)"),
        Err(e) => eprintln!("\nerror: {e}"),
    }
}

fn prompt(session: &ChatSession) -> io::Result<()> {
    print!("[{}] > ", session.agent_id());
    io::stdout().flush()
}

/// Interactive chat loop.
///
/// # Errors
///
/// Returns error if the backend client cannot be built or stdin fails.
pub async fn run(config: &Config, agent: Option<String>) -> anyhow::Result<()> {
    let session = chat_session(config, agent)?;
    eprintln!(
        "Chatting with {} at {} (/help for commands)",
        session.agent_id(),
        config.agentos.base_url
    );

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    prompt(&session)?;

    while let Some(line) = lines.next().await {
        match parse_input(&line?) {
            Input::Empty => {}
            Input::Message(text) => report(exchange(&session, text).await),
            Input::Agent(Some(agent)) => {
                session.switch_agent(agent);
                eprintln!("Switched to {} (new conversation)", session.agent_id());
            }
            Input::Agent(None) => eprintln!("Current agent: {}", session.agent_id()),
            Input::New => {
                session.new_conversation();
                eprintln!("Started a new conversation");
            }
            Input::Help => eprintln!("{HELP}"),
            Input::Quit => break,
            Input::Unknown(command) => eprintln!("Unknown command /{command} (try /help)"),
        }
        prompt(&session)?;
    }

    Ok(())
}

/// Ask one question.
///
/// # Errors
///
/// Returns error if the run fails or is cancelled.
pub async fn ask(
    config: &Config,
    prompt: &str,
    agent: Option<String>,
    no_stream: bool,
) -> anyhow::Result<()> {
    if no_stream || !config.agentos.stream {
        let client = config.agentos_client()?;
        let mut request = RunRequest::new(
            agent.unwrap_or_else(|| config.agentos.agent.clone()),
            prompt,
        );
        request.user_id.clone_from(&config.agentos.user_id);

        let output = client.run(&request).await?;
        let message = output.into_message(new_message_id());
        write_message(&mut io::stdout().lock(), &message)?;
        return Ok(());
    }

    let session = chat_session(config, agent)?;
    match exchange(&session, prompt.to_string()).await? {
        ExchangeOutcome::Completed(message) => match message.error {
            Some(error) => anyhow::bail!("run failed: {error}"),
            None => Ok(()),
        },
        ExchangeOutcome::Cancelled | ExchangeOutcome::Superseded => anyhow::bail!("cancelled"),
    }
}
