//! Identity types for stepbridge.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Identity of one issued request.
///
/// Handed out by the remote API when a request is issued; completions echo it
/// back so a waiter can tell its own completion apart from unrelated ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a RequestId from its raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub const fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

/// Number of bytes in a node handle.
const HANDLE_BYTES: usize = 6;

/// Mask keeping the low 48 bits.
const HANDLE_MASK: u64 = (1 << (HANDLE_BYTES * 8)) - 1;

/// Opaque reference to a remote node (a folder or file).
///
/// 48-bit value, displayed as URL-safe base64 of its six big-endian bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Create a handle from a raw value. Bits above 48 are discarded.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw & HANDLE_MASK)
    }

    /// Get the raw 48-bit value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    fn to_bytes(self) -> [u8; HANDLE_BYTES] {
        let full = self.0.to_be_bytes();
        let mut bytes = [0u8; HANDLE_BYTES];
        bytes.copy_from_slice(&full[8 - HANDLE_BYTES..]);
        bytes
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.to_bytes()))
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({})", self)
    }
}

impl FromStr for NodeHandle {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| TypesError::InvalidHandle(s.to_string()))?;
        if bytes.len() != HANDLE_BYTES {
            return Err(TypesError::InvalidHandle(s.to_string()));
        }
        let mut full = [0u8; 8];
        full[8 - HANDLE_BYTES..].copy_from_slice(&bytes);
        Ok(Self(u64::from_be_bytes(full)))
    }
}

impl From<NodeHandle> for String {
    fn from(handle: NodeHandle) -> Self {
        handle.to_string()
    }
}

impl TryFrom<String> for NodeHandle {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
