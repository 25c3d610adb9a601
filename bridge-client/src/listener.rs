//! Notification listener: turns completion callbacks into outcome snapshots.
//!
//! Runs on the remote API's threads. Its only job on a finish notification is
//! to copy what it needs out of the borrowed request and error, build an
//! [`OutcomeSnapshot`], and post it to the wait gate. All branching on the
//! outcome happens later, on the caller's thread.

use bridge_core::OutcomeSnapshot;
use bridge_types::{Payload, RequestKind};
use std::sync::Arc;

use crate::gate::WaitGate;
use crate::remote::{ApiError, Request, RequestListener};

/// Listener that captures every completion into a [`WaitGate`].
pub struct OutcomeListener {
    gate: Arc<WaitGate<OutcomeSnapshot>>,
}

impl OutcomeListener {
    /// Create a listener posting to `gate`.
    pub fn new(gate: Arc<WaitGate<OutcomeSnapshot>>) -> Self {
        Self { gate }
    }
}

impl RequestListener for OutcomeListener {
    fn on_request_start(&self, request: &Request) {
        tracing::debug!("request start: {} {}", request.kind, request.id);
    }

    fn on_request_update(&self, request: &Request) {
        if request.total_bytes > 0 {
            let percent = (request.transferred_bytes.saturating_mul(100) / request.total_bytes)
                .min(100);
            tracing::trace!("{} {} progress: {}%", request.kind, request.id, percent);
        }
    }

    fn on_request_temporary_error(&self, request: &Request, error: &ApiError) {
        tracing::warn!(
            "request temporary error: {} {}: {}",
            request.kind,
            request.id,
            error.code
        );
    }

    fn on_request_finish(&self, request: &Request, error: &ApiError) {
        let snapshot = capture(request, error);
        tracing::debug!(
            "request finish: {} {} -> {}",
            snapshot.kind(),
            snapshot.request_id(),
            snapshot.result()
        );
        self.gate.post(snapshot);
    }
}

/// Deep-copy a completion into an owned snapshot.
///
/// A successful completion whose kind should carry data but does not gets
/// [`Payload::Missing`] rather than an error.
pub fn capture(request: &Request, error: &ApiError) -> OutcomeSnapshot {
    if !error.code.is_success() {
        let message = (!error.message.is_empty()).then(|| error.message.clone());
        return OutcomeSnapshot::failure(request.id, request.kind, error.code, message);
    }

    let payload = match request.kind {
        RequestKind::AccountDetails => request.account.map_or(Payload::Missing, Payload::Account),
        kind if kind.carries_payload() => {
            request.node_handle.map_or(Payload::Missing, Payload::Node)
        }
        _ => Payload::Empty,
    };
    OutcomeSnapshot::success(request.id, request.kind, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RequestParams;
    use bridge_types::{AccountDetails, NodeHandle, RequestId, ResultCode};

    fn request(kind: RequestKind) -> Request {
        Request::from_params(RequestId::new(10), &RequestParams::of(kind))
    }

    #[test]
    fn captures_account_payload() {
        let mut req = request(RequestKind::AccountDetails);
        req.account = Some(AccountDetails::new(50, 100, 1));
        let snap = capture(&req, &ApiError::ok());
        assert_eq!(snap.payload(), &Payload::Account(AccountDetails::new(50, 100, 1)));
        assert_eq!(snap.request_id(), RequestId::new(10));
    }

    #[test]
    fn missing_account_field_is_marked_missing() {
        let snap = capture(&request(RequestKind::AccountDetails), &ApiError::ok());
        assert!(snap.is_success());
        assert!(snap.payload().is_missing());
    }

    #[test]
    fn captures_node_payload_for_node_kinds() {
        for kind in [RequestKind::GetRoot, RequestKind::CreateFolder, RequestKind::FetchState] {
            let mut req = request(kind);
            req.node_handle = Some(NodeHandle::from_raw(5));
            let snap = capture(&req, &ApiError::ok());
            assert_eq!(snap.payload().node(), Some(NodeHandle::from_raw(5)));
        }
    }

    #[test]
    fn kinds_without_data_get_empty_payload() {
        let snap = capture(&request(RequestKind::Login), &ApiError::ok());
        assert_eq!(snap.payload(), &Payload::Empty);
    }

    #[test]
    fn failure_copies_code_and_message() {
        let mut req = request(RequestKind::Login);
        req.account = Some(AccountDetails::new(1, 1, 1));
        let error = ApiError {
            code: ResultCode::NotFound,
            message: "Incorrect email or password".to_string(),
        };
        let snap = capture(&req, &error);
        assert_eq!(snap.result(), ResultCode::NotFound);
        assert_eq!(snap.message(), Some("Incorrect email or password"));
        assert_eq!(snap.payload(), &Payload::Empty);
    }

    #[test]
    fn snapshot_survives_mutation_of_originals() {
        let mut req = request(RequestKind::AccountDetails);
        req.account = Some(AccountDetails::new(50, 100, 0));
        let mut error = ApiError::ok();

        let snap = capture(&req, &error);

        // What the remote API does right after the callback returns.
        req.kind = RequestKind::Logout;
        req.id = RequestId::new(999);
        req.account = None;
        error.code = ResultCode::Internal;
        error.message.clear();
        drop(req);
        drop(error);

        assert_eq!(snap.kind(), RequestKind::AccountDetails);
        assert_eq!(snap.request_id(), RequestId::new(10));
        assert!(snap.is_success());
        assert_eq!(snap.payload().account().unwrap().to_string(), "50/100 (50%)");
    }

    #[test]
    fn finish_posts_exactly_one_snapshot() {
        let gate = Arc::new(WaitGate::new());
        let listener = OutcomeListener::new(Arc::clone(&gate));

        let req = request(RequestKind::Login);
        listener.on_request_start(&req);
        listener.on_request_update(&req);
        listener.on_request_temporary_error(&req, &ApiError::new(ResultCode::Again));
        assert_eq!(gate.pending(), 0);
        assert!(!gate.is_signaled());

        listener.on_request_finish(&req, &ApiError::ok());
        assert_eq!(gate.pending(), 1);
        assert!(gate.is_signaled());
    }
}
