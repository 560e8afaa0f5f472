//! CLI entry point - the composition root.
//!
//! Parses arguments, installs logging, wires the adapters via bootstrap and
//! dispatches to a handler.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use parley_cli::handlers::{self, chat::ChatArgs};
use parley_cli::{AudioOutput, Cli, CliConfig, Commands, ConversationStore, bootstrap};

/// Logs go to stderr so the transcript on stdout stays readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its `env` fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match &cli.state_file {
        Some(path) => ConversationStore::new(path),
        None => ConversationStore::new(ConversationStore::default_path()?),
    };

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Chat {
            character,
            activity,
            new,
            audio_dir,
            mute,
            voice,
            speed,
        } => {
            let audio = match (audio_dir, mute) {
                (Some(dir), _) => AudioOutput::Directory(dir),
                (None, true) => AudioOutput::Muted,
                (None, false) => AudioOutput::Speaker,
            };
            let config = CliConfig {
                base_url: cli.base_url,
                token: cli.token,
                audio,
                voice,
                speed,
            };
            let ctx = bootstrap(&config)?;
            let args = ChatArgs {
                character,
                activity,
                new,
            };
            handlers::chat::execute(ctx, &store, args).await?;
        }
        Commands::Forget => handlers::forget::execute(&store)?,
    }

    Ok(())
}
