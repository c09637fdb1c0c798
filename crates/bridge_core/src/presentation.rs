//! Maps bridge snapshots to the affordances a view renders.

use shared::domain::{ConnectionState, LogSeverity};

use crate::connection::BridgeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Pending,
    Success,
    Danger,
}

impl From<ConnectionState> for Tone {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Disconnected => Self::Neutral,
            ConnectionState::Connecting => Self::Pending,
            ConnectionState::Connected => Self::Success,
            ConnectionState::Error => Self::Danger,
        }
    }
}

impl From<LogSeverity> for Tone {
    fn from(severity: LogSeverity) -> Self {
        match severity {
            LogSeverity::Info => Self::Neutral,
            LogSeverity::Warn => Self::Pending,
            LogSeverity::Success => Self::Success,
            LogSeverity::Error => Self::Danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    EstablishProtocol,
    ReindexToolchain,
    /// Indicator only, not clickable.
    BridgeActive,
}

impl PrimaryAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::EstablishProtocol => "Establish Protocol",
            Self::ReindexToolchain => "Re-index Toolchain",
            Self::BridgeActive => "Bridge Active",
        }
    }

    pub fn is_interactive(self) -> bool {
        !matches!(self, Self::BridgeActive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    pub tone: Tone,
    pub primary_action: Option<PrimaryAction>,
    pub can_disconnect: bool,
    pub show_progress: bool,
    pub show_log_panel: bool,
    /// Fail-handshake and clear-logs controls.
    pub show_maintenance_actions: bool,
}

impl Affordances {
    pub fn from_snapshot(snapshot: &BridgeSnapshot) -> Self {
        let state = snapshot.connection_state;
        let primary_action = match state {
            ConnectionState::Disconnected => Some(PrimaryAction::EstablishProtocol),
            ConnectionState::Error => Some(PrimaryAction::ReindexToolchain),
            ConnectionState::Connected => Some(PrimaryAction::BridgeActive),
            ConnectionState::Connecting => None,
        };

        Self {
            tone: state.into(),
            primary_action,
            can_disconnect: state == ConnectionState::Connected,
            show_progress: state == ConnectionState::Connecting,
            show_log_panel: !snapshot.logs.is_empty() || state != ConnectionState::Disconnected,
            show_maintenance_actions: state == ConnectionState::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::BridgeSession;

    #[test]
    fn idle_session_offers_connect_and_maintenance() {
        let snapshot = BridgeSession::default().snapshot();
        let affordances = Affordances::from_snapshot(&snapshot);

        assert_eq!(affordances.tone, Tone::Neutral);
        assert_eq!(
            affordances.primary_action,
            Some(PrimaryAction::EstablishProtocol)
        );
        assert!(affordances.show_maintenance_actions);
        assert!(!affordances.show_log_panel);
        assert!(!affordances.show_progress);
        assert!(!affordances.can_disconnect);
    }

    #[test]
    fn error_state_offers_retry() {
        let mut session = BridgeSession::default();
        session.fail();
        let affordances = Affordances::from_snapshot(&session.snapshot());

        assert_eq!(affordances.tone, Tone::Danger);
        assert_eq!(
            affordances.primary_action.map(PrimaryAction::label),
            Some("Re-index Toolchain")
        );
        assert!(affordances.show_log_panel);
        assert!(!affordances.show_maintenance_actions);
    }

    #[test]
    fn connecting_shows_progress_without_actions() {
        let mut session = BridgeSession::default();
        session
            .connect(&crate::handshake::HandshakeScript::default(), false)
            .expect("connect");
        let affordances = Affordances::from_snapshot(&session.snapshot());

        assert_eq!(affordances.tone, Tone::Pending);
        assert!(affordances.show_progress);
        assert!(affordances.primary_action.is_none());
    }

    #[test]
    fn idle_with_history_keeps_log_panel() {
        let mut session = BridgeSession::default();
        session.fail();
        session.disconnect();
        let affordances = Affordances::from_snapshot(&session.snapshot());
        assert!(affordances.show_log_panel);
        assert!(affordances.show_maintenance_actions);
    }

    #[test]
    fn bridge_active_is_not_interactive() {
        assert!(!PrimaryAction::BridgeActive.is_interactive());
        assert!(PrimaryAction::EstablishProtocol.is_interactive());
        assert_eq!(Tone::from(LogSeverity::Success), Tone::Success);
    }
}
