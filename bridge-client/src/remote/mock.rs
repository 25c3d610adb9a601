//! Mock remote API for testing.
//!
//! Completes requests on the worker threads of its own tokio runtime, the way
//! a real SDK completes them on its internal threads. Replies can be scripted
//! per request kind, and every request/error object is scrubbed and dropped
//! right after the listeners have seen it.

use super::{
    ApiError, ListenerId, RemoteApi, RemoteError, Request, RequestListener, RequestParams,
};
use bridge_types::{AccountDetails, NodeHandle, RequestId, RequestKind, ResultCode};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Scripted reply for the next request of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Succeed, filling in the payload from the mock's state.
    Success,
    /// Succeed but leave the payload field unset.
    SuccessWithoutPayload,
    /// Report one temporary error, then succeed.
    Retried(ResultCode),
    /// Fail with the given code.
    Failure(ResultCode),
}

/// Mock remote API for testing.
///
/// Clones share state, so a test can keep one handle for scripting and
/// inspection while a sequencer owns another.
#[derive(Clone)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
    runtime: Arc<Runtime>,
}

struct MockRemoteInner {
    next_id: RequestId,
    next_listener: u64,
    listeners: Vec<(ListenerId, Arc<dyn RequestListener>)>,
    issued: Vec<RequestKind>,
    replies: HashMap<RequestKind, VecDeque<Reply>>,
    strays: HashMap<RequestKind, VecDeque<RequestKind>>,
    held: HashSet<RequestKind>,
    latency: Duration,
    state_root: Option<NodeHandle>,
    root: Option<NodeHandle>,
    account: Option<AccountDetails>,
    reject_next: Option<String>,
    shut_down: bool,
}

impl Default for MockRemoteInner {
    fn default() -> Self {
        Self {
            next_id: RequestId::new(1),
            next_listener: 1,
            listeners: Vec::new(),
            issued: Vec::new(),
            replies: HashMap::new(),
            strays: HashMap::new(),
            held: HashSet::new(),
            latency: Duration::ZERO,
            state_root: Some(NodeHandle::from_raw(DEFAULT_ROOT)),
            root: None,
            account: Some(AccountDetails::new(0, DEFAULT_QUOTA, 0)),
            reject_next: None,
            shut_down: false,
        }
    }
}

impl MockRemoteInner {
    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }
}

/// Root handle a fresh mock hands out after FetchState.
const DEFAULT_ROOT: u64 = 0x0000_00C0_FFEE;

/// Quota a fresh mock reports.
const DEFAULT_QUOTA: u64 = 20 * 1024 * 1024 * 1024;

/// Progress steps reported while fetching state.
const FETCH_PROGRESS_STEPS: u64 = 4;

/// A request scheduled for delivery.
struct Delivery {
    request: Request,
    reply: Reply,
}

impl MockRemote {
    /// Create a new mock remote with its own callback threads.
    pub fn new() -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("mock-remote")
            .enable_time()
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(MockRemoteInner::default())),
            runtime: Arc::new(runtime),
        })
    }

    /// Queue a reply for the next request of `kind`. Unscripted requests succeed.
    pub fn respond(&self, kind: RequestKind, reply: Reply) {
        let mut inner = self.inner.lock();
        inner.replies.entry(kind).or_default().push_back(reply);
    }

    /// Cause the next request of `kind` to fail with `code`.
    pub fn fail_next(&self, kind: RequestKind, code: ResultCode) {
        self.respond(kind, Reply::Failure(code));
    }

    /// Deliver an unrelated completion of `stray` just before the next `kind` completes.
    pub fn stray_before(&self, kind: RequestKind, stray: RequestKind) {
        let mut inner = self.inner.lock();
        inner.strays.entry(kind).or_default().push_back(stray);
    }

    /// Never complete requests of `kind`.
    pub fn hold(&self, kind: RequestKind) {
        self.inner.lock().held.insert(kind);
    }

    /// Cause the next `issue()` to be refused synchronously.
    pub fn reject_next_issue(&self, reason: &str) {
        self.inner.lock().reject_next = Some(reason.to_string());
    }

    /// Delay every completion by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = latency;
    }

    /// Root location that a successful FetchState makes available.
    pub fn set_root(&self, root: Option<NodeHandle>) {
        self.inner.lock().state_root = root;
    }

    /// Account figures reported by AccountDetails.
    pub fn set_account(&self, account: Option<AccountDetails>) {
        self.inner.lock().account = account;
    }

    /// Fire a completion for a request nobody issued through this handle.
    pub fn inject_completion(&self, kind: RequestKind, code: ResultCode) -> RequestId {
        let id = self.inner.lock().allocate_id();
        let reply = if code.is_success() {
            Reply::Success
        } else {
            Reply::Failure(code)
        };
        let delivery = Delivery {
            request: Request::from_params(id, &RequestParams::of(kind)),
            reply,
        };
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move {
            deliver(&inner, delivery);
        });
        id
    }

    /// Kinds of all requests accepted so far, in issue order.
    pub fn issued(&self) -> Vec<RequestKind> {
        self.inner.lock().issued.clone()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Refuse every further request.
    pub fn shutdown(&self) {
        self.inner.lock().shut_down = true;
    }
}

impl RemoteApi for MockRemote {
    fn add_listener(&self, listener: Arc<dyn RequestListener>) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    fn issue(&self, params: RequestParams) -> Result<RequestId, RemoteError> {
        let (id, latency, deliveries) = {
            let mut inner = self.inner.lock();

            if inner.shut_down {
                return Err(RemoteError::ShutDown);
            }
            // Check for forced rejection
            if let Some(reason) = inner.reject_next.take() {
                return Err(RemoteError::Rejected(reason));
            }

            let id = inner.allocate_id();
            inner.issued.push(params.kind);

            let mut deliveries = Vec::new();
            let stray = inner
                .strays
                .get_mut(&params.kind)
                .and_then(VecDeque::pop_front);
            if let Some(stray_kind) = stray {
                let stray_id = inner.allocate_id();
                deliveries.push(Delivery {
                    request: Request::from_params(stray_id, &RequestParams::of(stray_kind)),
                    reply: Reply::Success,
                });
            }

            if !inner.held.contains(&params.kind) {
                let reply = inner
                    .replies
                    .get_mut(&params.kind)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or(Reply::Success);
                deliveries.push(Delivery {
                    request: Request::from_params(id, &params),
                    reply,
                });
            }

            (id, inner.latency, deliveries)
        };

        tracing::debug!("mock remote accepted {} {}", params.kind, id);

        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            for delivery in deliveries {
                deliver(&inner, delivery);
            }
        });

        Ok(id)
    }

    fn root_location(&self) -> Option<NodeHandle> {
        self.inner.lock().root
    }
}

/// Run one request's notifications on the current (runtime worker) thread.
fn deliver(inner: &Arc<Mutex<MockRemoteInner>>, delivery: Delivery) {
    let Delivery { mut request, reply } = delivery;

    // Listeners are called without the lock held so they may call back in.
    let listeners: Vec<_> = inner
        .lock()
        .listeners
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect();

    for listener in &listeners {
        guard(request.kind, || listener.on_request_start(&request));
    }

    if request.kind == RequestKind::FetchState {
        request.total_bytes = FETCH_PROGRESS_STEPS * 1024;
        for step in 1..=FETCH_PROGRESS_STEPS {
            request.transferred_bytes = step * 1024;
            for listener in &listeners {
                guard(request.kind, || listener.on_request_update(&request));
            }
        }
    }

    let code = match reply {
        Reply::Retried(transient) => {
            let error = ApiError::new(transient);
            for listener in &listeners {
                guard(request.kind, || {
                    listener.on_request_temporary_error(&request, &error)
                });
            }
            ResultCode::Ok
        }
        Reply::Failure(code) => code,
        Reply::Success | Reply::SuccessWithoutPayload => ResultCode::Ok,
    };

    if code.is_success() {
        apply_success(inner, &mut request, reply != Reply::SuccessWithoutPayload);
    }

    let mut error = ApiError::new(code);
    for listener in &listeners {
        guard(request.kind, || listener.on_request_finish(&request, &error));
    }

    // The SDK reclaims its objects as soon as the callbacks return.
    scrub(&mut request, &mut error);
    drop(request);
    drop(error);
}

/// Update mock state for a successful request and fill in its payload.
fn apply_success(inner: &Arc<Mutex<MockRemoteInner>>, request: &mut Request, with_payload: bool) {
    let mut inner = inner.lock();
    match request.kind {
        // Without a payload the state is fetched but not cached locally.
        RequestKind::FetchState if with_payload => {
            inner.root = inner.state_root;
        }
        RequestKind::GetRoot if with_payload => {
            request.node_handle = inner.root.or(inner.state_root);
        }
        RequestKind::AccountDetails if with_payload => {
            request.account = inner.account;
        }
        RequestKind::CreateFolder if with_payload => {
            request.node_handle = Some(NodeHandle::from_raw(0x0001_0000_0000 | request.id.value()));
        }
        RequestKind::Logout => {
            inner.root = None;
        }
        _ => {}
    }
}

/// Overwrite everything a listener could have looked at.
fn scrub(request: &mut Request, error: &mut ApiError) {
    request.kind = RequestKind::Logout;
    request.email = None;
    request.name = None;
    request.parent = None;
    request.node = None;
    request.node_handle = Some(NodeHandle::from_raw(0));
    request.account = Some(AccountDetails::new(u64::MAX, 0, -1));
    request.transferred_bytes = 0;
    request.total_bytes = 0;
    error.code = ResultCode::Internal;
    error.message.clear();
}

/// Call into a listener, containing any panic on this thread.
fn guard(kind: RequestKind, call: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(call)).is_err() {
        tracing::error!("listener panicked while handling {} notification", kind);
    }
}
