//! Simulated tool-bridge session: connection lifecycle, scripted handshake
//! and the event log shown next to the editor.

pub mod config;
pub mod connection;
pub mod handshake;
pub mod log_store;
pub mod presentation;
pub mod session;

pub use config::{BridgeSettings, SettingsError};
pub use connection::{BridgeSession, BridgeSnapshot, Epoch, StepOutcome, TransitionError};
pub use handshake::{HandshakeScript, HandshakeStep, ScriptError, ScriptedLog};
pub use log_store::LogStore;
pub use presentation::{Affordances, PrimaryAction, Tone};
pub use session::{BridgeCommand, BridgeController, BridgeEvent, BridgeHandle};
