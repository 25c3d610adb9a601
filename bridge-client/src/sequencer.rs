//! RequestSequencer - the blocking driver for the session chain.
//!
//! This module provides [`RequestSequencer`], which turns the remote API's
//! callback completions into an ordinary sequential flow: issue a request,
//! block until its completion is captured, branch, issue the next.
//!
//! # Architecture
//!
//! The sequencer feeds events into the pure state machine from bridge-core
//! and interprets the returned actions by doing the actual I/O through the
//! [`RemoteApi`] trait.
//!
//! ```text
//! Caller → RequestSequencer → RemoteApi → (remote threads)
//!               ↓    ↑                          ↓
//!     bridge-core    WaitGate  ←  OutcomeListener
//! ```
//!
//! Only one request is outstanding at a time. Every step resets the gate
//! before issuing, then takes captured outcomes until one carries the issued
//! request's id and kind. Anything else that turns up in between is logged
//! and dropped.

use bridge_core::{Action, Event, Failure, OutcomeSnapshot, SessionOutcome, SessionState};
use bridge_types::{NodeHandle, RequestKind, ResultCode};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::gate::WaitGate;
use crate::listener::OutcomeListener;
use crate::remote::{ListenerId, RemoteApi, RemoteError, RequestParams};

/// Step errors.
#[derive(Debug, Error)]
pub enum StepError {
    /// The remote API refused the request.
    #[error("could not issue {kind}: {source}")]
    Issue {
        /// Kind that was refused.
        kind: RequestKind,
        /// Why.
        #[source]
        source: RemoteError,
    },

    /// No matching completion arrived before the step timeout.
    #[error("{kind} timed out after {after:?}")]
    TimedOut {
        /// Kind whose completion never arrived.
        kind: RequestKind,
        /// The configured step timeout.
        after: Duration,
    },

    /// The request completed with a non-success code.
    #[error("{kind} failed: {code}")]
    Remote {
        /// Kind of the failed request.
        kind: RequestKind,
        /// Result code, verbatim.
        code: ResultCode,
        /// Error text reported with the code.
        message: Option<String>,
    },

    /// The operation needs a location and the session has none yet.
    #[error("no current location; run the session first")]
    NoLocation,
}

/// Why a single request/completion exchange produced no snapshot.
enum Exchange {
    Refused(RemoteError),
    Expired,
}

/// Login credentials. The password is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Create credentials from an email and password.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: Zeroizing::new(password.to_string()),
        }
    }

    /// The account email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The account password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for RequestSequencer.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Credentials used by the Login step.
    pub credentials: Credentials,
    /// Upper bound on each wait for a completion. `None` waits forever.
    pub step_timeout: Option<Duration>,
}

impl SequencerConfig {
    /// Create a configuration that waits indefinitely on each step.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            step_timeout: None,
        }
    }

    /// Bound each wait for a completion.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

/// Blocking driver for one session against a remote API.
///
/// Registers an [`OutcomeListener`] on construction and removes it on drop.
pub struct RequestSequencer<R: RemoteApi> {
    remote: R,
    config: SequencerConfig,
    gate: Arc<WaitGate<OutcomeSnapshot>>,
    listener_id: ListenerId,
    state: SessionState,
    location: Option<NodeHandle>,
}

impl<R: RemoteApi> RequestSequencer<R> {
    /// Create a sequencer and register its listener with `remote`.
    pub fn new(remote: R, config: SequencerConfig) -> Self {
        let gate = Arc::new(WaitGate::new());
        let listener_id = remote.add_listener(Arc::new(OutcomeListener::new(Arc::clone(&gate))));
        Self {
            remote,
            config,
            gate,
            listener_id,
            state: SessionState::new(),
            location: None,
        }
    }

    /// Current state of the session chain.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current location, once the root has been resolved.
    pub fn location(&self) -> Option<NodeHandle> {
        self.location
    }

    /// The remote API this sequencer drives.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Issue one request and block until its own completion is captured.
    ///
    /// A completion with a non-success code is still `Ok`; the caller reads
    /// the result code from the snapshot.
    pub fn run_step(&mut self, params: RequestParams) -> Result<OutcomeSnapshot, StepError> {
        let kind = params.kind;
        self.exchange(params).map_err(|err| match err {
            Exchange::Refused(source) => StepError::Issue { kind, source },
            Exchange::Expired => StepError::TimedOut {
                kind,
                after: self.config.step_timeout.unwrap_or_default(),
            },
        })
    }

    fn exchange(&mut self, params: RequestParams) -> Result<OutcomeSnapshot, Exchange> {
        let kind = params.kind;

        // Reset before issuing: a completion racing ahead of our wait is
        // queued under the gate lock and still found.
        self.gate.reset();
        let id = self.remote.issue(params).map_err(Exchange::Refused)?;

        let deadline = self.config.step_timeout.map(|t| Instant::now() + t);
        loop {
            match self.gate.recv(deadline) {
                Some(outcome) if outcome.matches(id, kind) => {
                    self.gate.reset();
                    return Ok(outcome);
                }
                Some(stray) => {
                    tracing::debug!(
                        "ignoring completion {} {} while waiting for {} {}",
                        stray.kind(),
                        stray.request_id(),
                        kind,
                        id
                    );
                }
                None => {
                    self.gate.reset();
                    tracing::warn!("no completion for {} {} in time", kind, id);
                    return Err(Exchange::Expired);
                }
            }
        }
    }

    /// Run the login → fetch state → navigate → account query chain.
    ///
    /// Blocks until the chain reaches a terminal state. A sequencer whose
    /// previous run finished starts over from login.
    pub fn run(&mut self) -> SessionOutcome {
        if self.state.is_terminal() {
            self.state = SessionState::new();
        }
        // Only this run's transitions may set the location.
        self.location = None;

        let mut events = VecDeque::from([Event::Start]);
        while let Some(event) = events.pop_front() {
            let state = std::mem::take(&mut self.state);
            let from = state.name();
            let (next, actions) = state.on_event(event);
            if next.name() != from {
                tracing::debug!("session {} -> {}", from, next.name());
            }
            self.state = next;
            if let Some(root) = self.state.location() {
                self.location = Some(root);
            }

            for action in actions {
                match action {
                    Action::Issue(kind) => events.push_back(self.execute(kind)),
                    Action::ReadRoot => {
                        events.push_back(Event::RootResolved(self.remote.root_location()))
                    }
                    Action::Proceed => events.push_back(Event::Proceed),
                    Action::Report(failure) => tracing::warn!("session failed: {}", failure),
                    Action::Finish => tracing::info!("session complete"),
                }
            }
        }

        self.state.outcome().unwrap_or_else(|| {
            SessionOutcome::Failed(Failure::Stalled {
                state: self.state.name(),
            })
        })
    }

    /// Create a folder named `name` under the current location.
    pub fn create_folder(&mut self, name: &str) -> Result<OutcomeSnapshot, StepError> {
        let parent = self.location.ok_or(StepError::NoLocation)?;
        self.run_checked(RequestParams::create_folder(name, parent))
    }

    /// Remove `node`.
    pub fn remove(&mut self, node: NodeHandle) -> Result<OutcomeSnapshot, StepError> {
        self.run_checked(RequestParams::remove(node))
    }

    /// Close the session and forget the current location.
    pub fn logout(&mut self) -> Result<OutcomeSnapshot, StepError> {
        let outcome = self.run_checked(RequestParams::logout())?;
        self.location = None;
        self.state = SessionState::new();
        Ok(outcome)
    }

    fn execute(&mut self, kind: RequestKind) -> Event {
        let params = match kind {
            RequestKind::Login => RequestParams::login(
                self.config.credentials.email(),
                self.config.credentials.password(),
            ),
            other => RequestParams::of(other),
        };
        match self.exchange(params) {
            Ok(outcome) => Event::Completed(outcome),
            Err(Exchange::Refused(source)) => Event::IssueFailed {
                kind,
                reason: source.to_string(),
            },
            Err(Exchange::Expired) => Event::TimedOut { kind },
        }
    }

    fn run_checked(&mut self, params: RequestParams) -> Result<OutcomeSnapshot, StepError> {
        let outcome = self.run_step(params)?;
        if !outcome.is_success() {
            return Err(StepError::Remote {
                kind: outcome.kind(),
                code: outcome.result(),
                message: outcome.message().map(str::to_string),
            });
        }
        Ok(outcome)
    }
}

impl<R: RemoteApi> Drop for RequestSequencer<R> {
    fn drop(&mut self) {
        self.remote.remove_listener(self.listener_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemote, Reply};
    use bridge_types::{AccountDetails, Payload, RequestId};

    fn config() -> SequencerConfig {
        SequencerConfig::new(Credentials::new("me@example.com", "secret"))
            .with_step_timeout(Duration::from_secs(5))
    }

    fn sequencer() -> (MockRemote, RequestSequencer<MockRemote>) {
        let remote = MockRemote::new().unwrap();
        let seq = RequestSequencer::new(remote.clone(), config());
        (remote, seq)
    }

    // ===========================================
    // Session Chain Tests
    // ===========================================

    #[test]
    fn full_chain_reports_account_usage() {
        let (remote, mut seq) = sequencer();
        let root = NodeHandle::from_raw(42);
        remote.set_root(Some(root));
        remote.set_account(Some(AccountDetails::new(50, 100, 1)));

        let outcome = seq.run();

        match outcome {
            SessionOutcome::Done { root: got, details } => {
                assert_eq!(got, root);
                assert_eq!(details.unwrap().to_string(), "50/100 (50%)");
            }
            SessionOutcome::Failed(failure) => panic!("unexpected failure: {}", failure),
        }
        assert_eq!(
            remote.issued(),
            vec![
                RequestKind::Login,
                RequestKind::FetchState,
                RequestKind::AccountDetails
            ]
        );
        assert_eq!(seq.location(), Some(root));
        assert!(matches!(seq.state(), SessionState::Done { .. }));
    }

    #[test]
    fn login_failure_stops_chain() {
        let (remote, mut seq) = sequencer();
        remote.fail_next(RequestKind::Login, ResultCode::NotFound);

        let outcome = seq.run();

        let SessionOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.code(), Some(ResultCode::NotFound));
        assert_eq!(failure.to_string(), "login failed: API_ENOENT (-9)");
        assert_eq!(remote.issued(), vec![RequestKind::Login]);
        assert_eq!(seq.location(), None);
    }

    #[test]
    fn account_failure_keeps_location() {
        let (remote, mut seq) = sequencer();
        remote.fail_next(RequestKind::AccountDetails, ResultCode::Access);

        let outcome = seq.run();

        assert!(!outcome.is_done());
        assert_eq!(
            seq.state().failure().and_then(Failure::code),
            Some(ResultCode::Access)
        );
        assert!(seq.location().is_some());
    }

    #[test]
    fn missing_account_payload_still_completes() {
        let (remote, mut seq) = sequencer();
        remote.respond(RequestKind::AccountDetails, Reply::SuccessWithoutPayload);

        let outcome = seq.run();

        assert!(matches!(outcome, SessionOutcome::Done { details: None, .. }));
    }

    #[test]
    fn uncached_root_is_resolved_remotely() {
        let (remote, mut seq) = sequencer();
        remote.respond(RequestKind::FetchState, Reply::SuccessWithoutPayload);

        let outcome = seq.run();

        assert!(outcome.is_done());
        assert_eq!(
            remote.issued(),
            vec![
                RequestKind::Login,
                RequestKind::FetchState,
                RequestKind::GetRoot,
                RequestKind::AccountDetails
            ]
        );
    }

    #[test]
    fn no_root_anywhere_fails() {
        let (remote, mut seq) = sequencer();
        remote.set_root(None);

        let outcome = seq.run();

        assert_eq!(outcome, SessionOutcome::Failed(Failure::MissingRoot));
        assert!(!remote.issued().contains(&RequestKind::AccountDetails));
    }

    #[test]
    fn temporary_errors_do_not_end_a_step() {
        let (remote, mut seq) = sequencer();
        remote.respond(RequestKind::Login, Reply::Retried(ResultCode::Again));

        assert!(seq.run().is_done());
    }

    #[test]
    fn chain_survives_completion_latency() {
        let (remote, mut seq) = sequencer();
        remote.set_latency(Duration::from_millis(30));

        assert!(seq.run().is_done());
    }

    #[test]
    fn run_again_after_finish_starts_over() {
        let (remote, mut seq) = sequencer();
        assert!(seq.run().is_done());
        assert!(seq.run().is_done());
        assert_eq!(remote.issued().len(), 6);
    }

    // ===========================================
    // Correlation Tests
    // ===========================================

    #[test]
    fn stray_completion_is_ignored() {
        let (remote, mut seq) = sequencer();
        // An AccountDetails completion lands while FetchState is awaited.
        remote.stray_before(RequestKind::FetchState, RequestKind::AccountDetails);
        remote.set_account(Some(AccountDetails::new(1, 4, 0)));

        let outcome = seq.run();

        let SessionOutcome::Done { details, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(details, Some(AccountDetails::new(1, 4, 0)));
        assert_eq!(
            remote.issued(),
            vec![
                RequestKind::Login,
                RequestKind::FetchState,
                RequestKind::AccountDetails
            ]
        );
    }

    #[test]
    fn run_step_returns_only_its_own_completion() {
        let (remote, mut seq) = sequencer();
        remote.stray_before(RequestKind::Login, RequestKind::Login);

        let outcome = seq.run_step(RequestParams::login("a@b.c", "pw")).unwrap();

        // The stray is also a Login, but it was allocated the next id.
        assert_eq!(outcome.kind(), RequestKind::Login);
        assert_eq!(outcome.request_id(), RequestId::new(1));
        assert_eq!(remote.issued(), vec![RequestKind::Login]);
        assert!(!seq.gate.is_signaled());
        assert_eq!(seq.gate.pending(), 0);
    }

    #[test]
    fn completion_from_elsewhere_does_not_end_step() {
        let remote = MockRemote::new().unwrap();
        remote.hold(RequestKind::FetchState);
        let config = SequencerConfig::new(Credentials::new("me@example.com", "secret"))
            .with_step_timeout(Duration::from_millis(300));
        let mut seq = RequestSequencer::new(remote.clone(), config);

        // Same kind as the awaited step, but a request this sequencer never issued.
        let injector = remote.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            injector.inject_completion(RequestKind::FetchState, ResultCode::Ok)
        });

        let err = seq.run_step(RequestParams::fetch_state()).unwrap_err();
        let injected = handle.join().unwrap();

        assert!(matches!(
            err,
            StepError::TimedOut {
                kind: RequestKind::FetchState,
                ..
            }
        ));
        assert_ne!(injected, RequestId::new(1));
        assert!(!seq.gate.is_signaled());
        assert_eq!(seq.gate.pending(), 0);
    }

    #[test]
    fn snapshot_outlives_remote_objects() {
        let (remote, mut seq) = sequencer();
        remote.set_account(Some(AccountDetails::new(50, 100, 0)));

        let outcome = seq.run_step(RequestParams::account_details()).unwrap();

        // The mock has scrubbed its request by now.
        assert_eq!(outcome.kind(), RequestKind::AccountDetails);
        assert_eq!(
            outcome.payload(),
            &Payload::Account(AccountDetails::new(50, 100, 0))
        );
    }

    // ===========================================
    // Timeout and Rejection Tests
    // ===========================================

    #[test]
    fn held_completion_times_out() {
        let remote = MockRemote::new().unwrap();
        remote.hold(RequestKind::FetchState);
        let config = SequencerConfig::new(Credentials::new("me@example.com", "secret"))
            .with_step_timeout(Duration::from_millis(200));
        let mut seq = RequestSequencer::new(remote.clone(), config);

        let outcome = seq.run();

        assert_eq!(
            outcome,
            SessionOutcome::Failed(Failure::TimedOut {
                kind: RequestKind::FetchState
            })
        );
        assert!(!seq.gate.is_signaled());
    }

    #[test]
    fn run_step_timeout_is_an_error() {
        let remote = MockRemote::new().unwrap();
        remote.hold(RequestKind::Logout);
        let config = SequencerConfig::new(Credentials::new("me@example.com", "secret"))
            .with_step_timeout(Duration::from_millis(100));
        let mut seq = RequestSequencer::new(remote, config);

        let err = seq.run_step(RequestParams::logout()).unwrap_err();

        assert!(matches!(
            err,
            StepError::TimedOut {
                kind: RequestKind::Logout,
                ..
            }
        ));
    }

    #[test]
    fn rejected_issue_fails_chain() {
        let (remote, mut seq) = sequencer();
        remote.reject_next_issue("queue full");

        let outcome = seq.run();

        let SessionOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(
            failure.to_string(),
            "login could not be issued: request rejected: queue full"
        );
        assert!(remote.issued().is_empty());
    }

    #[test]
    fn run_step_surfaces_issue_error() {
        let (remote, mut seq) = sequencer();
        remote.shutdown();

        let err = seq.run_step(RequestParams::fetch_state()).unwrap_err();

        assert!(matches!(
            err,
            StepError::Issue {
                source: RemoteError::ShutDown,
                ..
            }
        ));
    }

    // ===========================================
    // Follow-up Operation Tests
    // ===========================================

    #[test]
    fn create_folder_needs_location() {
        let (remote, mut seq) = sequencer();
        assert!(matches!(
            seq.create_folder("sandbox"),
            Err(StepError::NoLocation)
        ));
        assert!(remote.issued().is_empty());
    }

    #[test]
    fn create_and_remove_folder() {
        let (remote, mut seq) = sequencer();
        assert!(seq.run().is_done());

        let created = seq.create_folder("sandbox").unwrap();
        let node = created.payload().node().unwrap();
        seq.remove(node).unwrap();

        assert_eq!(
            &remote.issued()[3..],
            &[RequestKind::CreateFolder, RequestKind::Remove]
        );
    }

    #[test]
    fn failed_follow_up_maps_to_remote_error() {
        let (remote, mut seq) = sequencer();
        assert!(seq.run().is_done());
        remote.fail_next(RequestKind::CreateFolder, ResultCode::Exists);

        let err = seq.create_folder("sandbox").unwrap_err();

        assert!(matches!(
            err,
            StepError::Remote {
                kind: RequestKind::CreateFolder,
                code: ResultCode::Exists,
                ..
            }
        ));
    }

    #[test]
    fn failed_rerun_forgets_previous_location() {
        let (remote, mut seq) = sequencer();
        assert!(seq.run().is_done());
        assert!(seq.location().is_some());

        remote.fail_next(RequestKind::Login, ResultCode::NotFound);
        let outcome = seq.run();

        assert!(!outcome.is_done());
        assert_eq!(seq.location(), None);
        let issued_before = remote.issued().len();
        assert!(matches!(
            seq.create_folder("sandbox"),
            Err(StepError::NoLocation)
        ));
        assert_eq!(remote.issued().len(), issued_before);
    }

    #[test]
    fn logout_clears_location() {
        let (remote, mut seq) = sequencer();
        assert!(seq.run().is_done());

        seq.logout().unwrap();

        assert_eq!(seq.location(), None);
        assert_eq!(seq.state(), &SessionState::Idle);
        assert_eq!(remote.root_location(), None);
    }

    // ===========================================
    // Listener Lifecycle Tests
    // ===========================================

    #[test]
    fn drop_unregisters_listener() {
        let remote = MockRemote::new().unwrap();
        let seq = RequestSequencer::new(remote.clone(), config());
        assert_eq!(remote.listener_count(), 1);

        drop(seq);

        assert_eq!(remote.listener_count(), 0);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let shown = format!("{:?}", Credentials::new("me@example.com", "hunter22"));
        assert!(shown.contains("[REDACTED]"));
        assert!(!shown.contains("hunter22"));
    }
}
