//! User events and the sources that produce them

use crate::ui::ModelPhase;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something the user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Pick a local image file
    SelectImage(PathBuf),
    /// Press the predict trigger
    Predict,
    /// Show the status indicator again
    ShowStatus,
    /// Leave once running inferences have finished
    Quit,
}

impl FromStr for UiEvent {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "open" | "abrir" if !argument.is_empty() => Ok(UiEvent::SelectImage(PathBuf::from(argument))),
            "open" | "abrir" => Err("usage: open <image path>".to_string()),
            "predict" | "predecir" | "p" => Ok(UiEvent::Predict),
            "status" | "estado" => Ok(UiEvent::ShowStatus),
            "quit" | "exit" | "salir" | "q" => Ok(UiEvent::Quit),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

/// Parse one input line; blank lines produce no event
pub fn parse_line(line: &str) -> Option<Result<UiEvent, String>> {
    if line.trim().is_empty() {
        None
    } else {
        Some(line.parse())
    }
}

/// Forward commands typed on stdin until EOF or `quit`
pub fn spawn_stdin_reader(tx: mpsc::Sender<UiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            };

            match parse_line(&line) {
                None => continue,
                Some(Ok(event)) => {
                    let quit = event == UiEvent::Quit;
                    if tx.send(event).await.is_err() || quit {
                        break;
                    }
                }
                Some(Err(message)) => warn!(input = %line, "{}", message),
            }
        }
        debug!("stdin reader finished");
    })
}

/// Replay `events` once the model has finished loading (or failed to), then quit
pub fn spawn_script(
    events: Vec<UiEvent>,
    phase: watch::Receiver<ModelPhase>,
    tx: mpsc::Sender<UiEvent>,
) -> JoinHandle<()> {
    let mut events = events;
    events.push(UiEvent::Quit);
    spawn_preload(events, phase, tx)
}

/// Replay `events` once the model phase settles; stops early if the loop is gone
pub fn spawn_preload(
    events: Vec<UiEvent>,
    mut phase: watch::Receiver<ModelPhase>,
    tx: mpsc::Sender<UiEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if phase.wait_for(|p| p.is_settled()).await.is_err() {
            return;
        }
        info!(events = events.len(), "Replaying scripted events");
        for event in events {
            if tx.send(event).await.is_err() {
                debug!("Event channel closed, replay stopped");
                break;
            }
        }
    })
}
