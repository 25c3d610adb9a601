//! Session state machine for stepbridge.
//!
//! This module provides a pure, side-effect-free state machine for the
//! login → fetch state → navigate → account query chain. The state machine
//! takes events as input and produces a new state plus a list of actions to
//! execute.
//!
//! The actual I/O (issuing requests, waiting for completions) is performed by
//! bridge-client, not by this module.

use bridge_types::{AccountDetails, NodeHandle, Payload, RequestKind, ResultCode};
use thiserror::Error;

use crate::snapshot::OutcomeSnapshot;

/// Session state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing issued yet.
    Idle,
    /// Login issued, waiting for its completion.
    Authenticating,
    /// FetchState issued, waiting for its completion or for the root read.
    FetchingState,
    /// Root was not known locally; GetRoot issued.
    ResolvingRoot,
    /// Root location known.
    Navigating {
        /// The current location.
        root: NodeHandle,
    },
    /// AccountDetails issued, waiting for its completion.
    QueryingAccount {
        /// The current location.
        root: NodeHandle,
    },
    /// Chain completed.
    Done {
        /// The current location.
        root: NodeHandle,
        /// Account figures; `None` when the completion carried none.
        details: Option<AccountDetails>,
    },
    /// Chain stopped on a failure.
    Failed(Failure),
}

impl SessionState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (bridge-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Idle
            (Self::Idle, Event::Start) => {
                (Self::Authenticating, vec![Action::Issue(RequestKind::Login)])
            }

            // Completions of a kind other than the awaited one change nothing
            (state, Event::Completed(outcome))
                if state.expected_kind() != Some(outcome.kind()) =>
            {
                (state, vec![])
            }

            // Any remote failure is terminal and reported verbatim
            (_, Event::Completed(outcome)) if !outcome.is_success() => {
                fail(Failure::from_outcome(&outcome))
            }

            // From Authenticating
            (Self::Authenticating, Event::Completed(_)) => (
                Self::FetchingState,
                vec![Action::Issue(RequestKind::FetchState)],
            ),

            // From FetchingState
            (Self::FetchingState, Event::Completed(outcome)) => match outcome.payload().node() {
                Some(root) => (Self::Navigating { root }, vec![Action::Proceed]),
                None => (Self::FetchingState, vec![Action::ReadRoot]),
            },
            (Self::FetchingState, Event::RootResolved(Some(root))) => {
                (Self::Navigating { root }, vec![Action::Proceed])
            }
            (Self::FetchingState, Event::RootResolved(None)) => (
                Self::ResolvingRoot,
                vec![Action::Issue(RequestKind::GetRoot)],
            ),

            // From ResolvingRoot
            (Self::ResolvingRoot, Event::Completed(outcome)) => match outcome.payload().node() {
                Some(root) => (Self::Navigating { root }, vec![Action::Proceed]),
                None => fail(Failure::MissingRoot),
            },

            // From Navigating
            (Self::Navigating { root }, Event::Proceed) => (
                Self::QueryingAccount { root },
                vec![Action::Issue(RequestKind::AccountDetails)],
            ),

            // From QueryingAccount
            (Self::QueryingAccount { root }, Event::Completed(outcome)) => {
                let details = match outcome.payload() {
                    Payload::Account(details) => Some(*details),
                    _ => None,
                };
                (Self::Done { root, details }, vec![Action::Finish])
            }

            // Timeouts and refused requests stop any chain still in progress
            (state, Event::TimedOut { kind }) if !state.is_terminal() => {
                fail(Failure::TimedOut { kind })
            }
            (state, Event::IssueFailed { kind, reason }) if !state.is_terminal() => {
                fail(Failure::NotIssued { kind, reason })
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// The request kind whose completion this state is waiting for.
    pub fn expected_kind(&self) -> Option<RequestKind> {
        match self {
            Self::Authenticating => Some(RequestKind::Login),
            Self::FetchingState => Some(RequestKind::FetchState),
            Self::ResolvingRoot => Some(RequestKind::GetRoot),
            Self::QueryingAccount { .. } => Some(RequestKind::AccountDetails),
            Self::Idle | Self::Navigating { .. } | Self::Done { .. } | Self::Failed(_) => None,
        }
    }

    /// Check if the chain has finished, one way or the other.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed(_))
    }

    /// The current location, once known.
    pub fn location(&self) -> Option<NodeHandle> {
        match self {
            Self::Navigating { root }
            | Self::QueryingAccount { root }
            | Self::Done { root, .. } => Some(*root),
            _ => None,
        }
    }

    /// The failure, if the chain failed.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short state name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::FetchingState => "fetching_state",
            Self::ResolvingRoot => "resolving_root",
            Self::Navigating { .. } => "navigating",
            Self::QueryingAccount { .. } => "querying_account",
            Self::Done { .. } => "done",
            Self::Failed(_) => "failed",
        }
    }

    /// The terminal outcome, if the chain has finished.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            Self::Done { root, details } => Some(SessionOutcome::Done {
                root: *root,
                details: *details,
            }),
            Self::Failed(failure) => Some(SessionOutcome::Failed(failure.clone())),
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn fail(failure: Failure) -> (SessionState, Vec<Action>) {
    (
        SessionState::Failed(failure.clone()),
        vec![Action::Report(failure)],
    )
}

/// Events fed into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to run the chain.
    Start,
    /// A completion was captured.
    Completed(OutcomeSnapshot),
    /// The local root read finished.
    RootResolved(Option<NodeHandle>),
    /// Continue from a state that needs no completion.
    Proceed,
    /// The wait for a completion expired.
    TimedOut {
        /// Kind whose completion never arrived.
        kind: RequestKind,
    },
    /// The remote API refused to take a request.
    IssueFailed {
        /// Kind that was refused.
        kind: RequestKind,
        /// Why it was refused.
        reason: String,
    },
}

/// Actions to be executed by the request sequencer.
///
/// These are instructions, not side effects. The sequencer interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue a request and wait for its completion.
    Issue(RequestKind),
    /// Read the root location from the remote API's local state.
    ReadRoot,
    /// Feed [`Event::Proceed`] back into the machine.
    Proceed,
    /// Surface a failure to the caller.
    Report(Failure),
    /// The chain completed.
    Finish,
}

/// Why a chain stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The remote API completed a request with a non-success code.
    #[error("{kind} failed: {code}")]
    Remote {
        /// Kind of the failed request.
        kind: RequestKind,
        /// Result code, verbatim.
        code: ResultCode,
        /// Error text reported with the code.
        message: Option<String>,
    },

    /// State was fetched but no root location could be resolved.
    #[error("root location unavailable")]
    MissingRoot,

    /// No completion arrived in time.
    #[error("{kind} timed out")]
    TimedOut {
        /// Kind whose completion never arrived.
        kind: RequestKind,
    },

    /// The remote API refused to take a request.
    #[error("{kind} could not be issued: {reason}")]
    NotIssued {
        /// Kind that was refused.
        kind: RequestKind,
        /// Why it was refused.
        reason: String,
    },

    /// The driver ran out of events before reaching a terminal state.
    #[error("session stalled in state {state}")]
    Stalled {
        /// State the session was left in.
        state: &'static str,
    },
}

impl Failure {
    /// Build a remote failure from a failed snapshot.
    pub fn from_outcome(outcome: &OutcomeSnapshot) -> Self {
        Self::Remote {
            kind: outcome.kind(),
            code: outcome.result(),
            message: outcome.message().map(str::to_string),
        }
    }

    /// The remote result code, if this failure carries one.
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Terminal result of a session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The chain completed.
    Done {
        /// The current location.
        root: NodeHandle,
        /// Account figures; `None` when the completion carried none.
        details: Option<AccountDetails>,
    },
    /// The chain stopped on a failure.
    Failed(Failure),
}

impl SessionOutcome {
    /// Check if the chain completed.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}
