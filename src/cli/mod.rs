//! CLI command parsing and execution.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod notes;
pub mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Helpdesk CLI - chat with the AgentOS helpdesk and manage notes.
#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(about = "Chat with the AgentOS helpdesk and manage your notes")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default).
    #[command(visible_alias = "c")]
    Chat {
        /// Agent to talk to.
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Ask a single question and print the answer.
    Ask {
        /// The question.
        prompt: String,

        /// Agent to ask.
        #[arg(short, long)]
        agent: Option<String>,

        /// Wait for the whole answer instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },

    /// Sign in and out.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage the knowledge base.
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },

    /// Manage backend sessions.
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage notes.
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Check the backend is reachable.
    Health,

    /// Show version and build information.
    Version,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password.
    Login(LoginArgs),

    /// Sign out and forget the stored session.
    Logout,

    /// Show who is signed in.
    Status,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Account email (prompted if omitted).
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(Subcommand)]
pub enum KnowledgeCommands {
    /// List knowledge content.
    List {
        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// Upload a document.
    Upload {
        /// File to upload.
        path: PathBuf,
    },

    /// Delete a document.
    Delete {
        /// Content ID.
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions.
    List {
        /// Only sessions for this user.
        #[arg(short, long)]
        user: Option<String>,

        /// Limit number of sessions shown.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a session as JSON.
    Show {
        /// Session ID.
        session_id: String,
    },

    /// Delete a session.
    Delete {
        /// Session ID.
        session_id: String,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// List notes, newest first.
    List {
        /// Only public notes.
        #[arg(long)]
        shared: bool,

        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// Add a note.
    Add(NoteArgs),

    /// Replace a note.
    Edit {
        /// Note ID.
        id: String,

        #[command(flatten)]
        note: NoteArgs,
    },

    /// Delete a note.
    Delete {
        /// Note ID.
        id: String,
    },
}

#[derive(Args)]
pub struct NoteArgs {
    /// Title.
    #[arg(short, long)]
    pub title: String,

    /// Body text.
    #[arg(short, long)]
    pub description: String,

    /// Share with everyone.
    #[arg(long)]
    pub public: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration.
    Show,

    /// Show the configuration file path.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_no_args() {
        let cli = Cli::parse_from(["helpdesk"]);
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_verbose_flag() {
        let cli = Cli::parse_from(["helpdesk", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_verbose_is_global() {
        let cli = Cli::parse_from(["helpdesk", "health", "-v"]);
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn cli_parses_chat_alias_with_agent() {
        let cli = Cli::parse_from(["helpdesk", "c", "--agent", "billing"]);
        match cli.command {
            Some(Commands::Chat { agent }) => assert_eq!(agent.as_deref(), Some("billing")),
            _ => panic!("expected Chat command"),
        }
    }

    #[test]
    fn cli_parses_ask_no_stream() {
        let cli = Cli::parse_from(["helpdesk", "ask", "what are your hours?", "--no-stream"]);
        match cli.command {
            Some(Commands::Ask {
                prompt,
                agent,
                no_stream,
            }) => {
                assert_eq!(prompt, "what are your hours?");
                assert!(agent.is_none());
                assert!(no_stream);
            }
            _ => panic!("expected Ask command"),
        }
    }

    #[test]
    fn cli_parses_auth_login_email() {
        let cli = Cli::parse_from(["helpdesk", "auth", "login", "-e", "a@b.c"]);
        match cli.command {
            Some(Commands::Auth {
                command: AuthCommands::Login(args),
            }) => assert_eq!(args.email.as_deref(), Some("a@b.c")),
            _ => panic!("expected Auth login"),
        }
    }

    #[test]
    fn cli_parses_notes_edit() {
        let cli = Cli::parse_from([
            "helpdesk", "notes", "edit", "n1", "-t", "Title", "-d", "Body", "--public",
        ]);
        match cli.command {
            Some(Commands::Notes {
                command: NoteCommands::Edit { id, note },
            }) => {
                assert_eq!(id, "n1");
                assert_eq!(note.title, "Title");
                assert_eq!(note.description, "Body");
                assert!(note.public);
            }
            _ => panic!("expected Notes edit"),
        }
    }

    #[test]
    fn cli_parses_notes_list_shared() {
        let cli = Cli::parse_from(["helpdesk", "notes", "list", "--shared"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Notes {
                command: NoteCommands::List { shared: true, json: false }
            })
        ));
    }

    #[test]
    fn cli_parses_sessions_list_defaults() {
        let cli = Cli::parse_from(["helpdesk", "sessions", "list"]);
        match cli.command {
            Some(Commands::Sessions {
                command: SessionCommands::List { user, limit },
            }) => {
                assert!(user.is_none());
                assert_eq!(limit, 20);
            }
            _ => panic!("expected Sessions list"),
        }
    }

    #[test]
    fn cli_parses_knowledge_upload() {
        let cli = Cli::parse_from(["helpdesk", "knowledge", "upload", "faq.pdf"]);
        match cli.command {
            Some(Commands::Knowledge {
                command: KnowledgeCommands::Upload { path },
            }) => assert_eq!(path, PathBuf::from("faq.pdf")),
            _ => panic!("expected Knowledge upload"),
        }
    }

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
