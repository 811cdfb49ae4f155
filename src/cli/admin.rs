//! Knowledge base, backend session and health commands.

use serde_json::Value;

use super::{KnowledgeCommands, SessionCommands};
use crate::config::Config;
use crate::core::agentos::{BackendSession, KnowledgeContent};

pub async fn handle_knowledge_command(config: &Config, command: KnowledgeCommands) -> anyhow::Result<()> {
    let client = config.agentos_client()?;

    match command {
        KnowledgeCommands::List { json } => {
            let contents = client.list_knowledge().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contents)?);
            } else {
                print!("{}", knowledge_table(&contents));
            }
        }

        KnowledgeCommands::Upload { path } => {
            let response = client.upload_knowledge(&path).await?;
            let id = response.get("id").and_then(Value::as_str).unwrap_or("-");
            println!("Uploaded {} (id {id})", path.display());
        }

        KnowledgeCommands::Delete { id } => {
            client.delete_knowledge(&id).await?;
            println!("Deleted knowledge content {id}");
        }
    }

    Ok(())
}

pub async fn handle_session_command(config: &Config, command: SessionCommands) -> anyhow::Result<()> {
    let client = config.agentos_client()?;

    match command {
        SessionCommands::List { user, limit } => {
            let user = user.or_else(|| config.agentos.user_id.clone());
            let sessions = client.list_sessions(user.as_deref()).await?;
            let sessions: Vec<_> = sessions.into_iter().take(limit).collect();
            print!("{}", session_table(&sessions));
        }

        SessionCommands::Show { session_id } => {
            let session = client.get_session(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }

        SessionCommands::Delete { session_id } => {
            client.delete_session(&session_id).await?;
            println!("Deleted session {session_id}");
        }
    }

    Ok(())
}

pub async fn health(config: &Config) -> anyhow::Result<()> {
    let client = config.agentos_client()?;
    let status = client.health().await?;
    let status = match &status {
        Value::String(s) => s.clone(),
        other => other
            .get("status")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), ToString::to_string),
    };
    println!("{} is up: {status}", client.base_url());
    Ok(())
}

fn knowledge_table(contents: &[KnowledgeContent]) -> String {
    let mut out = format!("{:<36} {:<30} {:<12} Updated\n", "ID", "Name", "Status");
    out.push_str(&"-".repeat(96));
    out.push('\n');
    for content in contents {
        let name: String = content.name.as_deref().unwrap_or("-").chars().take(28).collect();
        let updated = content.updated_at.as_ref().or(content.created_at.as_ref());
        out.push_str(&format!(
            "{:<36} {:<30} {:<12} {}\n",
            content.id,
            name,
            content.status.as_deref().unwrap_or("-"),
            format_time(updated)
        ));
    }
    out
}

fn session_table(sessions: &[BackendSession]) -> String {
    let mut out = format!("{:<36} {:<30} {:<20} Updated\n", "ID", "Name", "Agent");
    out.push_str(&"-".repeat(104));
    out.push('\n');
    for session in sessions {
        let name: String = session
            .session_name
            .as_deref()
            .unwrap_or("-")
            .chars()
            .take(28)
            .collect();
        let updated = session.updated_at.as_ref().or(session.created_at.as_ref());
        out.push_str(&format!(
            "{:<36} {:<30} {:<20} {}\n",
            session.session_id,
            name,
            session.agent_id.as_deref().unwrap_or("-"),
            format_time(updated)
        ));
    }
    out
}

/// Timestamps arrive as unix seconds or as RFC 3339 strings.
fn format_time(value: Option<&Value>) -> String {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|s| chrono::DateTime::from_timestamp(s, 0)),
        Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc)),
        _ => None,
    };

    match (parsed, value) {
        (Some(dt), _) => dt.format("%Y-%m-%d %H:%M").to_string(),
        (None, Some(Value::String(s))) => s.clone(),
        (None, _) => "Unknown".to_string(),
    }
}
