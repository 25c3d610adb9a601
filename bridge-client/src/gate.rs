//! Wait gate: the rendezvous between a callback thread and a waiting caller.
//!
//! A mutex-guarded `signaled` flag plus a condition variable. The flag and
//! the inbox of captured outcomes sit behind the same lock, so a signal
//! raised before anyone waits is still seen: every wait re-checks the flag
//! under the lock before sleeping.
//!
//! # Ordering
//!
//! `signaled` is set only by the notifying side and cleared only by the
//! waiting side (`reset()`, or `recv()` draining the inbox). The gate does not
//! stop a caller from resetting while a request is still in flight; the
//! sequencer resets before it issues, never after.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Lost-signal-free wait/reset gate carrying posted items.
#[derive(Debug)]
pub struct WaitGate<T> {
    state: Mutex<GateState<T>>,
    cond: Condvar,
}

#[derive(Debug)]
struct GateState<T> {
    signaled: bool,
    inbox: VecDeque<T>,
}

impl<T> WaitGate<T> {
    /// Create an unsignaled gate.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                signaled: false,
                inbox: VecDeque::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Raise the signal without posting anything.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        state.signaled = true;
        self.cond.notify_all();
    }

    /// Post an item and raise the signal.
    pub fn post(&self, item: T) {
        let mut state = self.state.lock();
        state.inbox.push_back(item);
        state.signaled = true;
        self.cond.notify_all();
    }

    /// Block until the gate is signaled.
    ///
    /// Returns immediately if the signal was raised before the call.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while !state.signaled {
            self.cond.wait(&mut state);
        }
    }

    /// Block until the gate is signaled or `timeout` elapses.
    ///
    /// Returns false on expiry; the gate is then still unsignaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.signaled {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return state.signaled;
            }
        }
        true
    }

    /// Clear the signal and discard anything still queued.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.signaled = false;
        state.inbox.clear();
    }

    /// Take the oldest posted item, blocking until one arrives.
    ///
    /// With a deadline, returns `None` once it passes. Taking the last queued
    /// item clears the signal.
    pub fn recv(&self, deadline: Option<Instant>) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.inbox.pop_front() {
                if state.inbox.is_empty() {
                    state.signaled = false;
                }
                return Some(item);
            }
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out() {
                        // One last look: a post may have raced the timeout.
                        let item = state.inbox.pop_front();
                        if state.inbox.is_empty() {
                            state.signaled = false;
                        }
                        return item;
                    }
                }
                None => self.cond.wait(&mut state),
            }
        }
    }

    /// Check the signal without blocking.
    pub fn is_signaled(&self) -> bool {
        self.state.lock().signaled
    }

    /// Number of posted items not yet taken.
    pub fn pending(&self) -> usize {
        self.state.lock().inbox.len()
    }
}

impl<T> Default for WaitGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
