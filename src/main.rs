use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use helpdesk_cli::{
    Config,
    build_info,
    cli::{self, AuthCommands, Cli, Commands, ConfigCommands},
    core::secret::mask_secrets,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout carries answers only
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    // No subcommand = interactive chat
    let command = cli.command.unwrap_or(Commands::Chat { agent: None });

    match command {
        Commands::Chat { agent } => cli::chat::run(&config, agent).await?,

        Commands::Ask {
            prompt,
            agent,
            no_stream,
        } => cli::chat::ask(&config, &prompt, agent, no_stream).await?,

        Commands::Auth { command } => match command {
            AuthCommands::Login(args) => cli::auth::auth_login(&config, args).await?,
            AuthCommands::Logout => cli::auth::auth_logout(&config).await?,
            AuthCommands::Status => cli::auth::auth_status(&config),
        },

        Commands::Knowledge { command } => {
            cli::admin::handle_knowledge_command(&config, command).await?;
        }

        Commands::Sessions { command } => {
            cli::admin::handle_session_command(&config, command).await?;
        }

        Commands::Notes { command } => cli::notes::handle_note_command(&config, command).await?,

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let rendered = toml::to_string_pretty(&config)?;
                println!("{}", mask_secrets(&rendered));
            }
            ConfigCommands::Path => {
                let path = Config::config_path()?;
                println!("{}", path.display());
            }
        },

        Commands::Health => cli::admin::health(&config).await?,

        Commands::Version => println!("helpdesk {}", build_info::version_string()),
    }

    Ok(())
}
