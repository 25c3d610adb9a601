//! # bridge-client
//!
//! Blocking request bridge over a callback-driven cloud storage API.
//!
//! The remote API completes every request by calling a listener on one of
//! its own threads. This crate lets caller code issue one request at a time
//! and block until that request's completion has been captured.
//!
//! ## Features
//!
//! - **Wait Gate**: mutex + condition variable, lost-signal free
//! - **Outcome Capture**: completions are deep-copied into owned snapshots
//!   before the callback returns
//! - **Request Sequencer**: drives the pure state machine from bridge-core
//! - **Remote Abstraction**: pluggable remote API (scripted mock included)
//!
//! ## Example
//!
//! ```ignore
//! use bridge_client::{Credentials, MockRemote, RequestSequencer, SequencerConfig};
//!
//! let remote = MockRemote::new()?;
//! let config = SequencerConfig::new(Credentials::new("me@example.com", "secret"));
//! let mut sequencer = RequestSequencer::new(remote, config);
//!
//! match sequencer.run() {
//!     SessionOutcome::Done { details, .. } => println!("{:?}", details),
//!     SessionOutcome::Failed(failure) => eprintln!("{}", failure),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gate;
pub mod listener;
pub mod remote;
pub mod sequencer;

pub use gate::WaitGate;
pub use listener::{capture, OutcomeListener};
pub use remote::{
    ApiError, ListenerId, MockRemote, RemoteApi, RemoteError, Reply, Request, RequestListener,
    RequestParams,
};
pub use sequencer::{Credentials, RequestSequencer, SequencerConfig, StepError};

pub use bridge_core::{Failure, OutcomeSnapshot, SessionOutcome, SessionState};
pub use bridge_types::{AccountDetails, NodeHandle, Payload, RequestId, RequestKind, ResultCode};
