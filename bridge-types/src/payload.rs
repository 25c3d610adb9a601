//! Data carried by successful completions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::NodeHandle;

/// Account quota and plan figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    /// Bytes of storage in use.
    pub storage_used: u64,
    /// Storage quota in bytes.
    pub storage_max: u64,
    /// Subscription level (0 = free).
    pub pro_level: i32,
}

impl AccountDetails {
    /// Create account details.
    pub fn new(storage_used: u64, storage_max: u64, pro_level: i32) -> Self {
        Self {
            storage_used,
            storage_max,
            pro_level,
        }
    }

    /// Percentage of the quota in use, truncated. Zero when there is no quota.
    pub fn usage_percent(&self) -> u64 {
        if self.storage_max == 0 {
            return 0;
        }
        // u128 for the multiplication; saturate far over quota
        let percent = u128::from(self.storage_used) * 100 / u128::from(self.storage_max);
        u64::try_from(percent).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for AccountDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}%)",
            self.storage_used,
            self.storage_max,
            self.usage_percent()
        )
    }
}

/// Kind-specific data captured from a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// The kind carries no data, or the request failed.
    Empty,
    /// The request succeeded but the data it should carry was absent.
    Missing,
    /// A node reference (root location, created folder).
    Node(NodeHandle),
    /// Account quota figures.
    Account(AccountDetails),
}

impl Payload {
    /// The account details, if this payload carries them.
    pub fn account(&self) -> Option<&AccountDetails> {
        match self {
            Self::Account(details) => Some(details),
            _ => None,
        }
    }

    /// The node handle, if this payload carries one.
    pub fn node(&self) -> Option<NodeHandle> {
        match self {
            Self::Node(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Check if this is the "expected data was absent" marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}
