//! Cancellation token for cooperative cancellation.

use crate::signals::Signal;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Why a token was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCause {
    /// The token's deadline elapsed.
    DeadlineExceeded,
    /// A stop signal was received.
    Signal(Signal),
    /// Cancellation was requested programmatically.
    Requested(String),
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::Signal(signal) => write!(f, "received {signal}"),
            Self::Requested(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Default)]
struct State {
    cause: Option<CancelCause>,
    children: Vec<Weak<Inner>>,
}

struct Inner {
    state: Mutex<State>,
    cancelled: watch::Sender<bool>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            cancelled: watch::channel(false).0,
        }
    }
}

/// A token for cooperative cancellation.
///
/// Clones share state. Cancellation is idempotent - only the first cause is
/// kept. Child tokens are cancelled with their parent's cause, but cancelling
/// a child leaves the parent untouched.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a cause.
    ///
    /// Live child tokens are cancelled with the same cause.
    pub fn cancel(&self, cause: CancelCause) {
        let children = {
            let mut state = self.inner.state.lock();
            if state.cause.is_some() {
                return;
            }
            state.cause = Some(cause.clone());
            std::mem::take(&mut state.children)
        };

        self.inner.cancelled.send_replace(true);
        debug!(cause = %cause, "cancellation requested");

        for inner in children.iter().filter_map(Weak::upgrade) {
            Self { inner }.cancel(cause.clone());
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().cause.is_some()
    }

    /// Returns the cancellation cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<CancelCause> {
        self.inner.state.lock().cause.clone()
    }

    /// Waits until the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancelled.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Creates a child token that is cancelled whenever this token is.
    #[must_use]
    pub fn child_token(&self) -> Self {
        let child = Self::new();
        let mut state = self.inner.state.lock();
        if let Some(cause) = state.cause.clone() {
            drop(state);
            child.cancel(cause);
        } else {
            state.children.retain(|weak| weak.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Creates a child token that is also cancelled with
    /// [`CancelCause::DeadlineExceeded`] once `timeout` elapses.
    ///
    /// The deadline timer lives until the returned guard is dropped.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> (Self, DeadlineGuard) {
        let child = self.child_token();
        let timer = child.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer.cancel(CancelCause::DeadlineExceeded);
        });
        (child, DeadlineGuard { handle })
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("cause", &self.cause())
            .finish()
    }
}

/// Stops a deadline timer when dropped.
#[derive(Debug)]
pub struct DeadlineGuard {
    handle: JoinHandle<()>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cause().is_none());
    }

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        token.cancel(CancelCause::Signal(Signal::Interrupt));

        assert!(token.is_cancelled());
        assert_eq!(token.cause(), Some(CancelCause::Signal(Signal::Interrupt)));
    }

    #[test]
    fn test_token_cancel_idempotent() {
        let token = CancellationToken::new();
        token.cancel(CancelCause::DeadlineExceeded);
        token.cancel(CancelCause::Requested("second".into()));

        // First cause wins
        assert_eq!(token.cause(), Some(CancelCause::DeadlineExceeded));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel(CancelCause::Requested("stop".into()));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_inherits_parent_cause() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        parent.cancel(CancelCause::Signal(Signal::Terminate));

        assert_eq!(child.cause(), Some(CancelCause::Signal(Signal::Terminate)));
    }

    #[test]
    fn test_child_of_cancelled_parent_starts_cancelled() {
        let parent = CancellationToken::new();
        parent.cancel(CancelCause::Signal(Signal::Interrupt));

        let child = parent.child_token();
        assert_eq!(child.cause(), Some(CancelCause::Signal(Signal::Interrupt)));
    }

    #[test]
    fn test_grandchild_inherits_cause() {
        let root = CancellationToken::new();
        let grandchild = root.child_token().child_token();

        root.cancel(CancelCause::DeadlineExceeded);
        assert_eq!(grandchild.cause(), Some(CancelCause::DeadlineExceeded));
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel(CancelCause::DeadlineExceeded);

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel(CancelCause::Requested("done".into()));

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should resolve")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn test_with_timeout_cancels_child_only() {
        let parent = CancellationToken::new();
        let (child, _guard) = parent.with_timeout(Duration::from_millis(20));

        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("deadline should fire");

        assert_eq!(child.cause(), Some(CancelCause::DeadlineExceeded));
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropping_guard_stops_deadline() {
        let parent = CancellationToken::new();
        let (child, guard) = parent.with_timeout(Duration::from_millis(20));
        drop(guard);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!child.is_cancelled());
    }
}
