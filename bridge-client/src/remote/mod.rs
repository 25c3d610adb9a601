//! Remote API abstraction for stepbridge.
//!
//! The remote API is an external collaborator: it accepts requests, runs them
//! somewhere else, and reports progress and completion by calling registered
//! listeners on its own internal threads.
//!
//! # Contract
//!
//! - `issue()` returns immediately; exactly one finish notification follows
//!   for every request it accepted
//! - the [`Request`] and [`ApiError`] handed to a listener are only valid for
//!   the duration of the callback. They are lent as `&Request` / `&ApiError`,
//!   so a listener has to copy out whatever it wants to keep
//! - `root_location()` is a local read of state the remote API already holds,
//!   meaningful once a `FetchState` request has succeeded
//!
//! # Example
//!
//! ```ignore
//! let remote = MockRemote::new()?;
//! remote.add_listener(Arc::new(my_listener));
//! let id = remote.issue(RequestParams::login("me@example.com", "secret"))?;
//! ```

mod mock;

pub use mock::{MockRemote, Reply};

use bridge_types::{AccountDetails, NodeHandle, RequestId, RequestKind, ResultCode};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors raised synchronously by the remote API when a request cannot be issued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote API could not be started.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote API has been shut down.
    #[error("remote shut down")]
    ShutDown,

    /// The request was refused before it was queued.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Parameters of a request to issue.
#[derive(Clone)]
pub struct RequestParams {
    /// What to do.
    pub kind: RequestKind,
    /// Account email (Login).
    pub email: Option<String>,
    /// Account password (Login).
    pub password: Option<Zeroizing<String>>,
    /// Name of the node to create (CreateFolder).
    pub name: Option<String>,
    /// Parent location (CreateFolder).
    pub parent: Option<NodeHandle>,
    /// Target node (Remove).
    pub node: Option<NodeHandle>,
}

impl RequestParams {
    /// Parameters for a request that takes no arguments.
    pub fn of(kind: RequestKind) -> Self {
        Self {
            kind,
            email: None,
            password: None,
            name: None,
            parent: None,
            node: None,
        }
    }

    /// Authenticate with email and password.
    pub fn login(email: &str, password: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            password: Some(Zeroizing::new(password.to_string())),
            ..Self::of(RequestKind::Login)
        }
    }

    /// Fetch the account's remote state.
    pub fn fetch_state() -> Self {
        Self::of(RequestKind::FetchState)
    }

    /// Query account quota and plan.
    pub fn account_details() -> Self {
        Self::of(RequestKind::AccountDetails)
    }

    /// Create a folder named `name` under `parent`.
    pub fn create_folder(name: &str, parent: NodeHandle) -> Self {
        Self {
            name: Some(name.to_string()),
            parent: Some(parent),
            ..Self::of(RequestKind::CreateFolder)
        }
    }

    /// Remove `node`.
    pub fn remove(node: NodeHandle) -> Self {
        Self {
            node: Some(node),
            ..Self::of(RequestKind::Remove)
        }
    }

    /// Close the session.
    pub fn logout() -> Self {
        Self::of(RequestKind::Logout)
    }
}

impl fmt::Debug for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParams")
            .field("kind", &self.kind)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("node", &self.node)
            .finish()
    }
}

/// A request as the remote API reports it to listeners.
///
/// Owned by the remote API. Listeners only ever see it borrowed for the
/// duration of one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Identity assigned at issue time.
    pub id: RequestId,
    /// What was asked.
    pub kind: RequestKind,
    /// Echo of the email parameter.
    pub email: Option<String>,
    /// Echo of the name parameter.
    pub name: Option<String>,
    /// Echo of the parent parameter.
    pub parent: Option<NodeHandle>,
    /// Echo of the node parameter.
    pub node: Option<NodeHandle>,
    /// Node produced by the request (root, created folder).
    pub node_handle: Option<NodeHandle>,
    /// Account figures (AccountDetails).
    pub account: Option<AccountDetails>,
    /// Progress: bytes transferred so far.
    pub transferred_bytes: u64,
    /// Progress: total bytes expected.
    pub total_bytes: u64,
}

impl Request {
    /// Build the remote-side request object for issued parameters.
    pub fn from_params(id: RequestId, params: &RequestParams) -> Self {
        Self {
            id,
            kind: params.kind,
            email: params.email.clone(),
            name: params.name.clone(),
            parent: params.parent,
            node: params.node,
            node_handle: None,
            account: None,
            transferred_bytes: 0,
            total_bytes: 0,
        }
    }
}

/// Result of a request as the remote API reports it to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Result code.
    pub code: ResultCode,
    /// Human-readable error text.
    pub message: String,
}

impl ApiError {
    /// An `API_OK` result.
    pub fn ok() -> Self {
        Self::new(ResultCode::Ok)
    }

    /// A result with the default text for `code`.
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            message: code.symbol().to_string(),
        }
    }
}

/// Callback target registered with the remote API.
///
/// Called on the remote API's internal threads. Implementations must not
/// block and must not panic.
pub trait RequestListener: Send + Sync {
    /// A request was picked up.
    fn on_request_start(&self, _request: &Request) {}

    /// Progress on a long-running request.
    fn on_request_update(&self, _request: &Request) {}

    /// The request hit a transient error and is being retried internally.
    fn on_request_temporary_error(&self, _request: &Request, _error: &ApiError) {}

    /// The request finished. Both arguments die when this returns.
    fn on_request_finish(&self, request: &Request, error: &ApiError);
}

/// Handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Remote API trait for issuing requests and observing their completion.
///
/// Implementations handle the actual request execution (real SDK, mock, etc).
pub trait RemoteApi: Send + Sync {
    /// Register a listener for every request's notifications.
    fn add_listener(&self, listener: Arc<dyn RequestListener>) -> ListenerId;

    /// Unregister a listener. Returns false if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Issue a request. Returns as soon as it is queued.
    fn issue(&self, params: RequestParams) -> Result<RequestId, RemoteError>;

    /// The root location held locally, if state has been fetched.
    fn root_location(&self) -> Option<NodeHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_params_redact_password() {
        let params = RequestParams::login("me@example.com", "hunter22");
        let shown = format!("{:?}", params);
        assert!(shown.contains("me@example.com"));
        assert!(shown.contains("[REDACTED]"));
        assert!(!shown.contains("hunter22"));
    }

    #[test]
    fn request_echoes_params_without_password() {
        let params = RequestParams::create_folder("sandbox", NodeHandle::from_raw(1));
        let request = Request::from_params(RequestId::new(4), &params);
        assert_eq!(request.kind, RequestKind::CreateFolder);
        assert_eq!(request.name.as_deref(), Some("sandbox"));
        assert_eq!(request.parent, Some(NodeHandle::from_raw(1)));
        assert!(request.node_handle.is_none());
    }

    #[test]
    fn api_error_default_message_is_symbol() {
        let err = ApiError::new(ResultCode::NotFound);
        assert_eq!(err.message, "API_ENOENT");
        assert!(ApiError::ok().code.is_success());
    }

    #[test]
    fn remote_error_display() {
        assert_eq!(RemoteError::ShutDown.to_string(), "remote shut down");
        assert_eq!(
            RemoteError::Rejected("busy".to_string()).to_string(),
            "request rejected: busy"
        );
    }
}
