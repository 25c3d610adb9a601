//! # bridge-types
//!
//! Shared types for the stepbridge request bridge.
//!
//! This crate provides the foundational types used across all stepbridge crates:
//! - [`RequestId`], [`NodeHandle`] - Identity types
//! - [`RequestKind`], [`ResultCode`] - What was asked and how it ended
//! - [`AccountDetails`], [`Payload`] - Data carried by a successful completion
//! - [`TypesError`] - Parse errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod payload;
mod request;

pub use error::TypesError;
pub use ids::{NodeHandle, RequestId};
pub use payload::{AccountDetails, Payload};
pub use request::{RequestKind, ResultCode};
