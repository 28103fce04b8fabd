use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::bnk::BnkCommands;
use commands::wem::WemCommands;

#[derive(Parser)]
#[command(name = "wwise-toolkit")]
#[command(about = "CLI for Wwise SoundBank and WEM files", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// BNK Operations (Info/Extract/Replace)
    #[command(subcommand)]
    Bnk(BnkCommands),
    /// WEM Operations (Decode/Encode)
    #[command(subcommand)]
    Wem(WemCommands),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bnk(cmd) => commands::bnk::handle(cmd)?,
        Commands::Wem(cmd) => commands::wem::handle(cmd)?,
    }

    Ok(())
}
