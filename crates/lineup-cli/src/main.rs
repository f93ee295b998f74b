use anyhow::Result;
use clap::{Parser, Subcommand};

mod generate;
mod score;
mod watch;

/// Lineup CLI - drive programming runs and playlist scoring against a server
#[derive(Parser)]
#[command(name = "lineup")]
#[command(about = "Lineup CLI for programming generation and scoring", long_about = None)]
struct Cli {
    /// Server URL (default: http://127.0.0.1:3000)
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a programming run and watch it to completion
    Generate {
        /// Channel id on the downstream manager
        channel_id: String,
        /// Profile id previously uploaded to the server
        profile_id: String,
        /// Number of candidate iterations
        #[arg(long, default_value_t = 10)]
        iterations: u32,
        /// Randomness factor in [0, 1]
        #[arg(long, default_value_t = 0.3)]
        randomness: f64,
        /// Days of programming to generate (1-30)
        #[arg(long, default_value_t = 1)]
        days: u32,
        /// Local start datetime (ISO 8601, e.g. 2025-01-10T20:00:00)
        #[arg(long)]
        start: Option<String>,
        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// Replace rule-violating programs in the best schedule
        #[arg(long)]
        replace_forbidden: bool,
        /// Improve the best schedule with candidates from other iterations
        #[arg(long)]
        improve_best: bool,
    },
    /// Score a playlist file against a profile
    Score {
        /// Profile id previously uploaded to the server
        profile_id: String,
        /// Path to a JSON playlist file
        playlist: String,
        /// Write CSV instead of a JSON summary
        #[arg(long)]
        csv: bool,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Watch job progress over the server's WebSocket
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            channel_id,
            profile_id,
            iterations,
            randomness,
            days,
            start,
            seed,
            replace_forbidden,
            improve_best,
        } => {
            generate::run(
                &cli.server,
                generate::GenerateArgs {
                    channel_id,
                    profile_id,
                    iterations,
                    randomness,
                    days,
                    start,
                    seed,
                    replace_forbidden,
                    improve_best,
                },
            )
            .await?;
        }
        Commands::Score {
            profile_id,
            playlist,
            csv,
            output,
        } => {
            score::run(&cli.server, &profile_id, &playlist, csv, output.as_deref()).await?;
        }
        Commands::Watch => {
            watch::run(&cli.server).await?;
        }
    }

    Ok(())
}
