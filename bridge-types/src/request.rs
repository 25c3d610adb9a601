//! Request kinds and result codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// What a request asks the remote API to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Authenticate the session.
    Login,
    /// Fetch the account's remote state (node tree).
    FetchState,
    /// Resolve the root location.
    GetRoot,
    /// Query account quota and plan.
    AccountDetails,
    /// Create a folder under a parent location.
    CreateFolder,
    /// Remove a node.
    Remove,
    /// Close the session.
    Logout,
}

impl RequestKind {
    /// All request kinds, in declaration order.
    pub const ALL: [RequestKind; 7] = [
        Self::Login,
        Self::FetchState,
        Self::GetRoot,
        Self::AccountDetails,
        Self::CreateFolder,
        Self::Remove,
        Self::Logout,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::FetchState => "fetch_state",
            Self::GetRoot => "get_root",
            Self::AccountDetails => "account_details",
            Self::CreateFolder => "create_folder",
            Self::Remove => "remove",
            Self::Logout => "logout",
        }
    }

    /// Whether a successful completion of this kind carries data.
    pub fn carries_payload(&self) -> bool {
        matches!(
            self,
            Self::FetchState | Self::GetRoot | Self::AccountDetails | Self::CreateFolder
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypesError::UnknownKind(s.to_string()))
    }
}

/// Result classification of a completed request.
///
/// Mirrors the remote API's numeric code space. Values outside the known
/// table are kept verbatim in [`ResultCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum ResultCode {
    /// Everything OK.
    Ok,
    /// Internal error.
    Internal,
    /// Bad arguments.
    Args,
    /// Request failed, retry with exponential back-off.
    Again,
    /// Too many requests, slow down.
    RateLimit,
    /// Request failed permanently.
    Failed,
    /// Too many requests for this resource.
    TooMany,
    /// Resource access out of range.
    Range,
    /// Resource expired.
    Expired,
    /// Resource does not exist.
    NotFound,
    /// Circular linkage.
    Circular,
    /// Access denied.
    Access,
    /// Resource already exists.
    Exists,
    /// Request incomplete.
    Incomplete,
    /// Cryptographic error.
    Key,
    /// Bad session id.
    Sid,
    /// Resource administratively blocked.
    Blocked,
    /// Quota exceeded.
    OverQuota,
    /// Resource temporarily not available.
    TempUnavailable,
    /// Too many connections on this resource.
    TooManyConnections,
    /// File could not be written to.
    Write,
    /// File could not be read from.
    Read,
    /// Invalid or missing application key.
    AppKey,
    /// A code outside the known table.
    Other(i32),
}

impl ResultCode {
    /// Map a raw code to its classification. Total: unknown codes become `Other`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::Internal,
            -2 => Self::Args,
            -3 => Self::Again,
            -4 => Self::RateLimit,
            -5 => Self::Failed,
            -6 => Self::TooMany,
            -7 => Self::Range,
            -8 => Self::Expired,
            -9 => Self::NotFound,
            -10 => Self::Circular,
            -11 => Self::Access,
            -12 => Self::Exists,
            -13 => Self::Incomplete,
            -14 => Self::Key,
            -15 => Self::Sid,
            -16 => Self::Blocked,
            -17 => Self::OverQuota,
            -18 => Self::TempUnavailable,
            -19 => Self::TooManyConnections,
            -20 => Self::Write,
            -21 => Self::Read,
            -22 => Self::AppKey,
            other => Self::Other(other),
        }
    }

    /// The raw numeric code, exactly as the remote API reported it.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Internal => -1,
            Self::Args => -2,
            Self::Again => -3,
            Self::RateLimit => -4,
            Self::Failed => -5,
            Self::TooMany => -6,
            Self::Range => -7,
            Self::Expired => -8,
            Self::NotFound => -9,
            Self::Circular => -10,
            Self::Access => -11,
            Self::Exists => -12,
            Self::Incomplete => -13,
            Self::Key => -14,
            Self::Sid => -15,
            Self::Blocked => -16,
            Self::OverQuota => -17,
            Self::TempUnavailable => -18,
            Self::TooManyConnections => -19,
            Self::Write => -20,
            Self::Read => -21,
            Self::AppKey => -22,
            Self::Other(code) => *code,
        }
    }

    /// Check if this code means success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Symbolic name, e.g. `API_ENOENT`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Ok => "API_OK",
            Self::Internal => "API_EINTERNAL",
            Self::Args => "API_EARGS",
            Self::Again => "API_EAGAIN",
            Self::RateLimit => "API_ERATELIMIT",
            Self::Failed => "API_EFAILED",
            Self::TooMany => "API_ETOOMANY",
            Self::Range => "API_ERANGE",
            Self::Expired => "API_EEXPIRED",
            Self::NotFound => "API_ENOENT",
            Self::Circular => "API_ECIRCULAR",
            Self::Access => "API_EACCESS",
            Self::Exists => "API_EEXIST",
            Self::Incomplete => "API_EINCOMPLETE",
            Self::Key => "API_EKEY",
            Self::Sid => "API_ESID",
            Self::Blocked => "API_EBLOCKED",
            Self::OverQuota => "API_EOVERQUOTA",
            Self::TempUnavailable => "API_ETEMPUNAVAIL",
            Self::TooManyConnections => "API_ETOOMANYCONNECTIONS",
            Self::Write => "API_EWRITE",
            Self::Read => "API_EREAD",
            Self::AppKey => "API_EAPPKEY",
            Self::Other(_) => "API_EUNKNOWN",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol(), self.code())
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.code()
    }
}
