//! Connection state machine for the tool bridge session.
//!
//! `BridgeSession` keeps the state, status message, progress and log store
//! together so one lock covers a whole transition. Every accepted command
//! advances the epoch; handshake steps scheduled under an older epoch are
//! discarded by [`BridgeSession::apply_step`].

use serde::{Deserialize, Serialize};
use shared::{
    domain::{ConnectionState, LogSeverity},
    protocol::LogEntry,
};
use thiserror::Error;

use crate::{
    handshake::{HandshakeScript, HandshakeStep, INITIAL_PROGRESS, READY_PROGRESS},
    log_store::LogStore,
};

pub const IDLE_MESSAGE: &str = "Local MCP server inactive";
pub const FAILURE_MESSAGE: &str = "Protocol timeout";
pub const TERMINATED_LOG: &str = "Session terminated by user";
pub const REFUSED_LOG: &str = "Connection refused: Port 8080 is blocked or server is offline";
pub const HANDSHAKE_FAILED_LOG: &str = "Handshake failed at stage: SOCKET_BIND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(pub u64);

impl Epoch {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("connect rejected while {0}")]
    ConnectRejected(ConnectionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Completed,
    /// The step belongs to a cancelled attempt and was ignored.
    Stale,
}

/// Read-only view handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    pub connection_state: ConnectionState,
    pub status_message: String,
    pub progress: u8,
    pub logs: Vec<LogEntry>,
}

impl BridgeSnapshot {
    pub fn latest_log(&self) -> Option<&LogEntry> {
        self.logs.first()
    }
}

#[derive(Debug, Clone)]
pub struct BridgeSession {
    state: ConnectionState,
    status_message: String,
    progress: u8,
    epoch: Epoch,
    logs: LogStore,
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self::new(LogStore::default())
    }
}

impl BridgeSession {
    pub fn new(logs: LogStore) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            status_message: IDLE_MESSAGE.to_string(),
            progress: 0,
            epoch: Epoch::default(),
            logs,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn logs(&self) -> &LogStore {
        &self.logs
    }

    /// Starts a new attempt and returns the epoch its steps must carry.
    pub fn connect(
        &mut self,
        script: &HandshakeScript,
        clear_logs: bool,
    ) -> Result<Epoch, TransitionError> {
        if !self.state.accepts_connect() {
            return Err(TransitionError::ConnectRejected(self.state));
        }
        if clear_logs {
            self.logs.clear();
        }

        self.epoch = self.epoch.next();
        self.state = ConnectionState::Connecting;
        self.progress = INITIAL_PROGRESS;
        self.status_message = script.initial_message().to_string();
        self.logs.append(script.initial_log(), LogSeverity::Info);
        Ok(self.epoch)
    }

    pub fn apply_step(&mut self, epoch: Epoch, step: &HandshakeStep) -> StepOutcome {
        if epoch != self.epoch || self.state != ConnectionState::Connecting {
            return StepOutcome::Stale;
        }

        self.progress = self.progress.max(step.progress.min(READY_PROGRESS));
        self.status_message = step.message.clone();
        for log in &step.logs {
            self.logs.append(log.message.clone(), log.severity);
        }

        if step.is_final() {
            self.state = ConnectionState::Connected;
            StepOutcome::Completed
        } else {
            StepOutcome::Applied
        }
    }

    /// Returns to idle. Returns `false` when already disconnected, in which
    /// case nothing is logged.
    pub fn disconnect(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }

        self.epoch = self.epoch.next();
        self.state = ConnectionState::Disconnected;
        self.progress = 0;
        self.status_message = IDLE_MESSAGE.to_string();
        self.logs.append(TERMINATED_LOG, LogSeverity::Warn);
        true
    }

    /// Simulates a refused handshake. Accepted from every state.
    pub fn fail(&mut self) {
        self.epoch = self.epoch.next();
        self.state = ConnectionState::Error;
        self.progress = 0;
        self.status_message = FAILURE_MESSAGE.to_string();
        self.logs.append(REFUSED_LOG, LogSeverity::Error);
        self.logs.append(HANDSHAKE_FAILED_LOG, LogSeverity::Error);
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            connection_state: self.state,
            status_message: self.status_message.clone(),
            progress: self.progress,
            logs: self.logs.to_vec(),
        }
    }
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
