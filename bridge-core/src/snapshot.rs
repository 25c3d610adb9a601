//! Outcome snapshots.
//!
//! A snapshot is the only thing that crosses from the callback thread to the
//! caller thread. It owns every byte it holds, so nothing the remote API does
//! to its own request or error objects after the callback returns can reach it.

use bridge_types::{Payload, RequestId, RequestKind, ResultCode};
use serde::Serialize;

/// Immutable copy of a completed request's identity, kind, result and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSnapshot {
    request_id: RequestId,
    kind: RequestKind,
    result: ResultCode,
    payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl OutcomeSnapshot {
    /// Build a snapshot from already-copied parts.
    ///
    /// A failed result always carries [`Payload::Empty`], whatever was passed.
    pub fn new(
        request_id: RequestId,
        kind: RequestKind,
        result: ResultCode,
        payload: Payload,
        message: Option<String>,
    ) -> Self {
        let payload = if result.is_success() {
            payload
        } else {
            Payload::Empty
        };
        Self {
            request_id,
            kind,
            result,
            payload,
            message,
        }
    }

    /// A successful completion.
    pub fn success(request_id: RequestId, kind: RequestKind, payload: Payload) -> Self {
        Self::new(request_id, kind, ResultCode::Ok, payload, None)
    }

    /// A failed completion.
    pub fn failure(
        request_id: RequestId,
        kind: RequestKind,
        result: ResultCode,
        message: Option<String>,
    ) -> Self {
        Self::new(request_id, kind, result, Payload::Empty, message)
    }

    /// Identity of the completed request.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Kind of the completed request.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Result code, verbatim.
    pub fn result(&self) -> ResultCode {
        self.result
    }

    /// Kind-specific data.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Error text reported with the result, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Check if the request succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Check if this snapshot is the completion of the given request.
    pub fn matches(&self, request_id: RequestId, kind: RequestKind) -> bool {
        self.request_id == request_id && self.kind == kind
    }
}
