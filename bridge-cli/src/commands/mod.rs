//! CLI command implementations.

pub mod account;
pub mod logout;
pub mod mkdir;

use anyhow::{Context, Result};
use bridge_client::{
    AccountDetails, Credentials, MockRemote, NodeHandle, RequestSequencer, SequencerConfig,
    SessionOutcome,
};

use crate::config::ScenarioConfig;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Human-readable lines.
    Text,
    /// One JSON document.
    Json,
}

/// A session that reached its terminal `Done` state.
pub struct Session {
    /// The sequencer, ready for follow-up steps.
    pub sequencer: RequestSequencer<MockRemote>,
    /// The resolved root location.
    pub root: NodeHandle,
    /// Account figures, if the remote reported any.
    pub details: Option<AccountDetails>,
}

/// Start a remote scripted by `scenario` and run the session chain on it.
///
/// A failed chain becomes an error carrying the failure's message.
pub fn establish(credentials: Credentials, scenario: &ScenarioConfig) -> Result<Session> {
    let remote = MockRemote::new().context("Failed to start remote")?;
    scenario.apply(&remote);

    let mut config = SequencerConfig::new(credentials);
    if let Some(timeout) = scenario.session.step_timeout() {
        config = config.with_step_timeout(timeout);
    }

    let mut sequencer = RequestSequencer::new(remote, config);
    match sequencer.run() {
        SessionOutcome::Done { root, details } => Ok(Session {
            sequencer,
            root,
            details,
        }),
        SessionOutcome::Failed(failure) => Err(failure.into()),
    }
}
