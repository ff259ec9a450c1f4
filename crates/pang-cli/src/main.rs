use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;
mod file_store;
mod output;

use output::Output;

#[derive(Parser)]
#[command(name = "pang")]
#[command(version)]
#[command(about = "Send a celebration to everyone, and watch theirs burst on your screen")]
#[command(long_about = "A command-line sender and listener for Pang celebrations.

Every machine pointed at the same store directory sees every celebration.")]
struct Cli {
    /// Output in JSON format (for agents/scripts)
    #[arg(short, long, global = true)]
    json: bool,

    /// Data directory (default: platform data dir/pang)
    #[arg(long, global = true, env = "PANG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Shared event store directory (default: <data dir>/store)
    #[arg(long, global = true, env = "PANG_STORE_DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a celebration
    Send {
        /// Message text (up to 50 characters)
        text: String,
        /// Emoji to add to the combo, repeatable and in order (e.g. -e 🔥 -e 🔥 -e 🔥)
        #[arg(short, long = "emoji")]
        emojis: Vec<String>,
        /// Photo to attach (any common image format)
        #[arg(short, long)]
        photo: Option<PathBuf>,
        /// Send as the anonymous fairy
        #[arg(short, long)]
        anonymous: bool,
        /// Nickname to sign with (saved for next time)
        #[arg(short, long)]
        nickname: Option<String>,
    },

    /// Listen for celebrations and play them
    Listen {
        /// Start muted
        #[arg(long)]
        mute: bool,
    },

    /// Show the last seven days of celebrations
    History,

    /// Suggest emojis for today
    Suggest,

    /// Show how your celebrations are signed
    Whoami,

    /// Show or set your nickname
    Nickname {
        /// New nickname (omit to show the current one)
        name: Option<String>,
    },
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("PANG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    setup_tracing();

    let cli = Cli::parse();
    let output = Output::new(cli.json);

    let result = run(cli, &output).await;

    if let Err(e) = result {
        let retryable = e
            .downcast_ref::<pang::Error>()
            .map(|e| e.feedback() == pang::Feedback::Retry)
            .unwrap_or(false);
        output.error(&format!("{:#}", e), retryable);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("pang"),
    };

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    let config = config::Config::load(&data_dir)?;
    let store_dir = cli
        .store_dir
        .unwrap_or_else(|| config.resolved_store_dir(&data_dir));

    let open_store = || -> anyhow::Result<Arc<dyn pang::EventStore>> {
        Ok(Arc::new(file_store::FileEventStore::open(&store_dir)?))
    };

    match cli.command {
        Commands::Send {
            text,
            emojis,
            photo,
            anonymous,
            nickname,
        } => {
            let args = commands::send::SendArgs {
                text,
                emojis,
                photo,
                anonymous,
                nickname,
            };
            commands::send::send(args, config, open_store()?, output).await
        }
        Commands::Listen { mute } => commands::listen::listen(mute, open_store()?, output).await,
        Commands::History => {
            let store = open_store()?;
            commands::history::history(store.as_ref(), output).await
        }
        Commands::Suggest => commands::suggest::suggest(output).await,
        Commands::Whoami => commands::identity::whoami(&config, output).await,
        Commands::Nickname { name } => {
            commands::identity::nickname(name.as_deref(), &config, output).await
        }
    }
}
