//! # bridge-core
//!
//! Pure logic for stepbridge (no I/O, instant tests).
//!
//! This crate holds the two pieces of the request bridge that do not touch
//! threads or the remote API:
//! - [`OutcomeSnapshot`]: an owned, immutable copy of a completed request
//! - [`SessionState`]: the table-driven state machine that decides which
//!   request to issue next
//!
//! ## Design Philosophy
//!
//! The state machine takes events as input and produces a new state plus a
//! list of actions. It never issues requests or waits on anything. The
//! blocking and the actual issuing are performed by `bridge-client`, which
//! interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod state;

pub use snapshot::OutcomeSnapshot;
pub use state::{Action, Event, Failure, SessionOutcome, SessionState};
