use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use bridge_core::{BridgeEvent, BridgeHandle, BridgeSnapshot};
use clap::{Parser, Subcommand};
use shared::domain::ConnectionState;
use story_core::{load_settings, StudioSession};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

mod render;
mod shell;

#[derive(Parser, Debug)]
#[command(name = "storyforge", about = "StoryForge workspace with a simulated tool bridge")]
struct Cli {
    /// Settings file; defaults to ./storyforge.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print bridge snapshots as JSON instead of text.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scripted handshake and print every transition.
    Demo {
        /// Fail the handshake once before connecting.
        #[arg(long)]
        fail_first: bool,
        /// Disconnect as soon as the bridge is up.
        #[arg(long)]
        disconnect: bool,
    },
    /// Read bridge and editor commands from stdin.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    let studio = Arc::new(StudioSession::new(&settings));

    match cli.command {
        Command::Demo {
            fail_first,
            disconnect,
        } => run_demo(&studio, fail_first, disconnect, cli.json).await?,
        Command::Shell => shell::run(Arc::clone(&studio), cli.json).await?,
    }

    Ok(())
}

async fn run_demo(
    studio: &StudioSession,
    fail_first: bool,
    disconnect: bool,
    json: bool,
) -> Result<()> {
    let bridge = studio.bridge();
    if fail_first {
        bridge.fail().await;
        print_snapshot(&bridge.snapshot().await, json)?;
    }

    let mut events = bridge.subscribe();
    bridge.connect().await;

    loop {
        let Some(snapshot) = next_snapshot(&mut events).await else {
            break;
        };
        print_snapshot(&snapshot, json)?;
        if snapshot.connection_state == ConnectionState::Connected {
            break;
        }
    }

    if disconnect {
        bridge.disconnect().await;
    }

    let snapshot = bridge.snapshot().await;
    if !json {
        for line in render::log_lines(&snapshot) {
            println!("{line}");
        }
    }
    print_snapshot(&snapshot, json)
}

pub(crate) async fn next_snapshot(
    events: &mut broadcast::Receiver<BridgeEvent>,
) -> Option<BridgeSnapshot> {
    loop {
        match events.recv().await {
            Ok(BridgeEvent::Changed(snapshot)) => return Some(snapshot),
            Ok(BridgeEvent::CommandIgnored { command, state }) => {
                tracing::debug!(command = command.as_str(), state = %state, "ignored");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "bridge event stream lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

pub(crate) fn print_snapshot(snapshot: &BridgeSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", render::status_line(snapshot));
    }
    Ok(())
}
