//! Line-oriented command loop over stdin.

use std::sync::Arc;

use anyhow::Result;
use bridge_core::{BridgeCommand, BridgeHandle};
use chrono::Utc;
use shared::error::ServiceError;
use story_core::{time_format::format_relative, StudioSession};
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::{next_snapshot, print_snapshot, render};

const HELP: &str = "\
commands:
  connect | disconnect | fail | clear   drive the tool bridge
  status | logs                         show bridge state
  edit <text>                           replace the document content
  save [label] | versions               version history
  chat <prompt>                         ask the text generator
  frames <url> | link <id> | unlink <id>
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Bridge(BridgeCommand),
    Status,
    Logs,
    Edit(String),
    Save(Option<String>),
    Versions,
    Chat(String),
    Frames(String),
    Link(String),
    Unlink(String),
    Help,
    Quit,
}

pub fn parse(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map(|(head, rest)| (head, rest.trim()))
        .unwrap_or((line, ""));

    let command = match head.to_ascii_lowercase().as_str() {
        "connect" => ShellCommand::Bridge(BridgeCommand::Connect),
        "disconnect" => ShellCommand::Bridge(BridgeCommand::Disconnect),
        "fail" => ShellCommand::Bridge(BridgeCommand::Fail),
        "clear" => ShellCommand::Bridge(BridgeCommand::ClearLogs),
        "status" => ShellCommand::Status,
        "logs" => ShellCommand::Logs,
        "edit" => ShellCommand::Edit(rest.to_string()),
        "save" => ShellCommand::Save((!rest.is_empty()).then(|| rest.to_string())),
        "versions" => ShellCommand::Versions,
        "chat" => ShellCommand::Chat(rest.to_string()),
        "frames" => ShellCommand::Frames(rest.to_string()),
        "link" if !rest.is_empty() => ShellCommand::Link(rest.to_string()),
        "unlink" if !rest.is_empty() => ShellCommand::Unlink(rest.to_string()),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => return None,
    };
    Some(command)
}

pub async fn run(studio: Arc<StudioSession>, json: bool) -> Result<()> {
    let mut events = studio.bridge().subscribe();
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = next_snapshot(&mut events).await {
            if let Err(err) = print_snapshot(&snapshot, json) {
                tracing::error!("failed to print snapshot: {err:#}");
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse(&line) else {
            println!("unknown command: {}", line.trim());
            continue;
        };
        if command == ShellCommand::Quit {
            break;
        }
        if let Err(err) = execute(&studio, command).await {
            println!("error: {err}");
        }
    }

    printer.abort();
    Ok(())
}

async fn execute(studio: &StudioSession, command: ShellCommand) -> Result<(), ServiceError> {
    match command {
        ShellCommand::Bridge(command) => studio.bridge().dispatch(command).await,
        ShellCommand::Status => {
            println!("{}", render::status_line(&studio.bridge().snapshot().await));
        }
        ShellCommand::Logs => {
            for line in render::log_lines(&studio.bridge().snapshot().await) {
                println!("{line}");
            }
        }
        ShellCommand::Edit(text) => studio.edit_document(text).await,
        ShellCommand::Save(label) => {
            let version = studio.save_version(label.as_deref()).await;
            println!("saved {}", version.id);
        }
        ShellCommand::Versions => {
            let now = Utc::now();
            for version in studio.document().await.versions() {
                println!(
                    "{} {:<12} {} {}",
                    version.id,
                    format_relative(version.timestamp, now),
                    version.author_name,
                    version.label.as_deref().unwrap_or("")
                );
            }
        }
        ShellCommand::Chat(prompt) => {
            let reply = studio.send_chat(&prompt).await?;
            println!("assistant: {}", reply.content);
        }
        ShellCommand::Frames(url) => {
            for frame in studio.fetch_frames(&url).await? {
                println!("{} {}", frame.id, frame.name);
            }
        }
        ShellCommand::Link(id) => {
            if !studio.link_frame(&id).await? {
                println!("{id} already linked");
            }
        }
        ShellCommand::Unlink(id) => {
            if !studio.unlink_frame(&id).await {
                println!("{id} was not linked");
            }
        }
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => {}
    }
    Ok(())
}
