//! coderelay bot binary.
//!
//! Start the bot with:
//! ```bash
//! coderelay --config workspaces.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use coderelay_core::config;
use coderelay_core::Config;
use coderelay_telegram::Manager;

/// Telegram bridge for CLI coding assistants
#[derive(Parser, Debug)]
#[command(name = "coderelay")]
#[command(about = "Drive claude and opencode sessions from Telegram, one workspace per bot")]
struct Args {
    /// Workspace registry path (default: ~/.coderelay/workspaces.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load .env before anything reads the environment.
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "coderelay_telegram=info,coderelay_core=info,teloxide=warn",
        1 => "coderelay_telegram=debug,coderelay_core=debug,teloxide=info",
        2 => "coderelay_telegram=trace,coderelay_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let workspaces = Config::load(&config_path)?.resolve()?;

    println!("\n[robot] coderelay");
    for workspace in &workspaces {
        println!(
            "   Workspace: {} -> {}",
            workspace.name,
            workspace.working_dir.display()
        );
    }
    println!("\n[phone] Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    Manager::new(workspaces).run().await;

    Ok(())
}
