use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memoria::{Error, Result, cmd};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the memoria application
#[derive(Parser)]
#[command(name = "memoria")]
#[command(about = "Keep a photo frame stocked with on-this-day memories")]
#[command(version)]
struct Cli {
   #[arg(long, global = true, env = "MEMORIA_CONFIG", help = "Extra config file layered over the global one")]
   config: Option<PathBuf>,

   #[arg(short = 'v', long, global = true, help = "Log progress details")]
   verbose: bool,

   #[command(subcommand)]
   command: Cmd,
}

/// Available subcommands for memoria
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Reconcile the device with today's memories")]
   Sync {
      #[arg(long, env = "MEMORIA_DATE", help = "Use this day instead of today (MM-DD or YYYY-MM-DD); TEST_DATE is read as a fallback")]
      date: Option<String>,

      #[arg(short = 'n', long, help = "Show what would change without touching the device")]
      dry_run: bool,

      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Check that the device answers, with the configured retries")]
   Probe,

   #[command(about = "List files on the device and remaining capacity")]
   List {
      #[arg(long, help = "JSON output")]
      json: bool,
   },

   #[command(about = "Show the effective configuration")]
   Config,
}

#[tokio::main]
async fn main() {
   dotenv::dotenv().ok();
   let cli = Cli::parse();

   let level = if cli.verbose { Level::INFO } else { Level::WARN };
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
      .with_writer(std::io::stderr)
      .init();

   if let Err(err) = run(cli).await {
      if !matches!(err, Error::Reported { .. }) {
         eprintln!("{err}");
      }
      std::process::exit(err.exit_code());
   }
}

async fn run(cli: Cli) -> Result<()> {
   let cancel = CancellationToken::new();
   let on_interrupt = cancel.clone();
   tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
         tracing::warn!("interrupted; finishing the current step");
         on_interrupt.cancel();
      }
   });

   let config = cli.config.as_deref();
   match cli.command {
      Cmd::Sync { date, dry_run, json } => cmd::sync::execute(config, date, dry_run, json, cancel).await,
      Cmd::Probe => cmd::probe::execute(config, cancel).await,
      Cmd::List { json } => cmd::list::execute(config, json).await,
      Cmd::Config => cmd::config::execute(config),
   }
}
