use super::{NoteArgs, NoteCommands};
use crate::config::Config;
use crate::core::notes::{Note, NoteDraft, NoteScope};

pub async fn handle_note_command(config: &Config, command: NoteCommands) -> anyhow::Result<()> {
    let client = config.notes_client()?;

    match command {
        NoteCommands::List { shared, json } => {
            let scope = if shared { NoteScope::Shared } else { NoteScope::Mine };
            let notes = client.list(scope).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("No notes yet");
            } else {
                for note in &notes {
                    println!("{}", render_note(note));
                }
            }
        }

        NoteCommands::Add(args) => {
            let note = client.create(&draft(args)).await?;
            println!("Created note {}", note.id);
        }

        NoteCommands::Edit { id, note } => {
            let note = client.update(&id, &draft(note)).await?;
            println!("Updated note {}", note.id);
        }

        NoteCommands::Delete { id } => {
            client.delete(&id).await?;
            println!("Deleted note {id}");
        }
    }

    Ok(())
}

fn draft(args: NoteArgs) -> NoteDraft {
    NoteDraft {
        title: args.title,
        description: args.description,
        is_public: args.public,
    }
}

fn render_note(note: &Note) -> String {
    let date = chrono::DateTime::parse_from_rfc3339(&note.created_at)
        .map_or_else(|_| note.created_at.clone(), |dt| dt.format("%Y-%m-%d").to_string());
    let visibility = if note.is_public { " [public]" } else { "" };

    let mut out = format!("{}  {}{visibility}  ({})\n", date, note.title, note.id);
    for line in note.description.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_note() {
        let note = Note {
            id: "n1".into(),
            title: "Trip".into(),
            description: "Flights booked\nHotel pending".into(),
            user_id: "u1".into(),
            is_public: true,
            created_at: "2026-03-04T10:00:00+00:00".into(),
            updated_at: None,
        };

        assert_eq!(
            render_note(&note),
            "2026-03-04  Trip [public]  (n1)\n    Flights booked\n    Hotel pending\n"
        );
    }

    #[test]
    fn test_render_note_keeps_unparseable_date() {
        let note = Note {
            id: "n2".into(),
            title: "Plain".into(),
            description: "x".into(),
            user_id: "u1".into(),
            is_public: false,
            created_at: "2026-03-04 10:00:00".into(),
            updated_at: None,
        };
        assert!(render_note(&note).starts_with("2026-03-04 10:00:00  Plain  (n2)"));
    }

    #[tokio::test]
    async fn test_notes_require_supabase_config() {
        let command = NoteCommands::Delete { id: "n1".into() };
        let err = handle_note_command(&Config::default(), command).await.unwrap_err();
        assert!(err.to_string().contains("Supabase"));
    }
}
