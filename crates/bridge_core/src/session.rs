//! Session controller: the only place that schedules delayed transitions.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::ConnectionState;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    config::BridgeSettings,
    connection::{BridgeSession, BridgeSnapshot, Epoch, StepOutcome},
    handshake::HandshakeScript,
    log_store::LogStore,
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    Connect,
    Disconnect,
    Fail,
    ClearLogs,
}

impl BridgeCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Fail => "fail",
            Self::ClearLogs => "clear_logs",
        }
    }
}

#[derive(Debug, Clone)]
pub enum BridgeEvent {
    Changed(BridgeSnapshot),
    CommandIgnored {
        command: BridgeCommand,
        state: ConnectionState,
    },
}

#[async_trait]
pub trait BridgeHandle: Send + Sync {
    async fn connect(&self);
    async fn disconnect(&self);
    async fn fail(&self);
    async fn clear_logs(&self);
    async fn snapshot(&self) -> BridgeSnapshot;
    fn subscribe(&self) -> broadcast::Receiver<BridgeEvent>;

    async fn dispatch(&self, command: BridgeCommand) {
        match command {
            BridgeCommand::Connect => self.connect().await,
            BridgeCommand::Disconnect => self.disconnect().await,
            BridgeCommand::Fail => self.fail().await,
            BridgeCommand::ClearLogs => self.clear_logs().await,
        }
    }
}

pub struct BridgeController {
    session: Arc<Mutex<BridgeSession>>,
    script: Arc<HandshakeScript>,
    clear_logs_on_connect: bool,
    handshake_task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeController {
    pub fn new(settings: &BridgeSettings) -> Self {
        Self::with_script(
            settings.script(),
            LogStore::with_capacity(settings.log_capacity),
            settings.clear_logs_on_connect,
        )
    }

    pub fn with_script(
        script: HandshakeScript,
        logs: LogStore,
        clear_logs_on_connect: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(BridgeSession::new(logs))),
            script: Arc::new(script),
            clear_logs_on_connect,
            handshake_task: Mutex::new(None),
            events,
        }
    }

    pub fn script(&self) -> &HandshakeScript {
        &self.script
    }

    async fn cancel_handshake(&self) {
        if let Some(task) = self.handshake_task.lock().await.take() {
            task.abort();
        }
    }

    fn publish(&self, session: &BridgeSession) {
        let _ = self.events.send(BridgeEvent::Changed(session.snapshot()));
    }

    fn ignored(&self, command: BridgeCommand, state: ConnectionState) {
        debug!(command = command.as_str(), state = %state, "bridge: command ignored");
        let _ = self
            .events
            .send(BridgeEvent::CommandIgnored { command, state });
    }
}

impl Drop for BridgeController {
    fn drop(&mut self) {
        if let Some(task) = self.handshake_task.get_mut().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl BridgeHandle for BridgeController {
    async fn connect(&self) {
        // Held across the task swap so no step can run before the previous
        // task is cancelled and the initial snapshot is published.
        let mut session = self.session.lock().await;
        let epoch = match session.connect(&self.script, self.clear_logs_on_connect) {
            Ok(epoch) => epoch,
            Err(_) => {
                self.ignored(BridgeCommand::Connect, session.state());
                return;
            }
        };

        info!(
            epoch = epoch.0,
            steps = self.script.steps().len(),
            "bridge: handshake started"
        );
        self.publish(&session);

        let task = tokio::spawn(run_handshake(
            Arc::clone(&self.session),
            Arc::clone(&self.script),
            epoch,
            self.events.clone(),
            Instant::now(),
        ));
        if let Some(previous) = self.handshake_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        let was = session.state();
        let progress = session.progress();
        if !session.disconnect() {
            self.ignored(BridgeCommand::Disconnect, was);
            return;
        }

        if was == ConnectionState::Connecting {
            warn!(progress, "bridge: handshake cancelled by disconnect");
        } else {
            info!(from = %was, "bridge: session terminated");
        }
        self.publish(&session);
        self.cancel_handshake().await;
    }

    async fn fail(&self) {
        let mut session = self.session.lock().await;
        let was = session.state();
        session.fail();
        warn!(from = %was, "bridge: handshake failed at SOCKET_BIND");
        self.publish(&session);
        self.cancel_handshake().await;
    }

    async fn clear_logs(&self) {
        let mut session = self.session.lock().await;
        session.clear_logs();
        debug!("bridge: logs cleared");
        self.publish(&session);
    }

    async fn snapshot(&self) -> BridgeSnapshot {
        self.session.lock().await.snapshot()
    }

    fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }
}

async fn run_handshake(
    session: Arc<Mutex<BridgeSession>>,
    script: Arc<HandshakeScript>,
    epoch: Epoch,
    events: broadcast::Sender<BridgeEvent>,
    started: Instant,
) {
    for step in script.steps() {
        time::sleep_until(started + step.offset()).await;

        let mut guard = session.lock().await;
        match guard.apply_step(epoch, step) {
            StepOutcome::Stale => {
                debug!(epoch = epoch.0, "bridge: dropping stale handshake step");
                return;
            }
            StepOutcome::Applied => {
                debug!(epoch = epoch.0, progress = step.progress, "bridge: handshake step");
            }
            StepOutcome::Completed => {
                info!(
                    epoch = epoch.0,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "bridge: connected"
                );
            }
        }
        let _ = events.send(BridgeEvent::Changed(guard.snapshot()));
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
