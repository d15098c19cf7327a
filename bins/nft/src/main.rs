//! nft command - nftables tables, quotas and ruleset monitoring.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nftlink::netlink::Connection;

use crate::output::{OutputFormat, OutputOptions};

#[derive(Parser)]
#[command(name = "nft", version, about = "nftables management tool")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Operate in the network namespace at this path.
    #[arg(long, global = true, value_name = "PATH")]
    netns: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage tables.
    #[command(visible_alias = "t")]
    Table(commands::table::TableCmd),

    /// Manage quota objects.
    #[command(visible_alias = "q")]
    Quota(commands::quota::QuotaCmd),

    /// Watch ruleset changes.
    #[command(visible_alias = "m", visible_alias = "mon")]
    Monitor(commands::monitor::MonitorCmd),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let opts = OutputOptions {
        pretty: cli.pretty,
        timestamp: false,
    };

    let conn = match &cli.netns {
        Some(path) => Connection::new_in_namespace_path(path)?,
        None => Connection::new()?,
    };

    let result = match cli.command {
        Command::Table(cmd) => cmd.run(&conn, format, &opts).await,
        Command::Quota(cmd) => cmd.run(&conn, format, &opts).await,
        Command::Monitor(cmd) => cmd.run(&conn, format, &opts).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
