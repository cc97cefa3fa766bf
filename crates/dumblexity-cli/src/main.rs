mod config;
mod repl;

use clap::{Parser, Subcommand};
use config::DumblexityConfig;
use dumblexity_session::{FileTranscriptStore, TranscriptStore};
use repl::ChatArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dumblexity", about = "Dumblexity — grounded, cited answers in your terminal")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "dumblexity.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat(ChatArgs),
    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List saved sessions
    List,
    /// Print a saved session
    Show { name: String },
    /// Delete a saved session
    Delete { name: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = DumblexityConfig::load(&cli.config).await?;
    config.apply_env(|name| std::env::var(name).ok());

    let store = FileTranscriptStore::new(config.sessions_dir.clone()).await?;

    match cli.command {
        Commands::Chat(args) => repl::run(config, store, args).await,
        Commands::Sessions { action } => sessions(action, &store).await,
    }
}

async fn sessions(action: SessionAction, store: &FileTranscriptStore) -> anyhow::Result<()> {
    match action {
        SessionAction::List => {
            for name in store.list().await? {
                println!("{name}");
            }
        }
        SessionAction::Show { name } => {
            let transcript = store.load(&name).await?;
            for turn in transcript.turns() {
                println!("[{}]\n{}\n", turn.role.as_str(), turn.content);
            }
        }
        SessionAction::Delete { name } => {
            store.delete(&name).await?;
            println!("Deleted session '{name}'.");
        }
    }
    Ok(())
}
