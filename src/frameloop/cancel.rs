//! Hierarchical cancellation that plugs into `crossbeam_channel::select!`.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// A cloneable cancellation handle.
///
/// Cancelling a token cancels every token derived from it, but never its parent. Cancelling is
/// idempotent and may be done from any thread. [`CancelToken::done`] returns a receiver that
/// never yields a message and disconnects once the token is cancelled, so it can sit in a
/// `select!` next to other channels.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    done_rx: Receiver<()>,
}

#[derive(Debug)]
struct State {
    // Dropped on cancel, which disconnects `done_rx`.
    done_tx: Option<Sender<()>>,
    children: Vec<Weak<Inner>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a root token.
    pub fn new() -> Self {
        let (done_tx, done_rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    done_tx: Some(done_tx),
                    children: Vec::new(),
                }),
                done_rx,
            }),
        }
    }

    /// Derive a token that is cancelled whenever `self` is.
    ///
    /// Deriving from an already cancelled token yields a cancelled token.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        let mut state = self.inner.lock();
        if state.done_tx.is_none() {
            drop(state);
            child.cancel();
            return child;
        }
        state.children.retain(|w| w.strong_count() > 0);
        state.children.push(Arc::downgrade(&child.inner));
        child
    }

    /// Derive a token that additionally cancels itself after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> CancelToken {
        let child = self.child();
        if child.is_cancelled() {
            return child;
        }
        let timer = child.clone();
        let spawned = thread::Builder::new()
            .name("videogen-cancel-timer".into())
            .spawn(move || {
                let deadline = crossbeam_channel::after(timeout);
                crossbeam_channel::select! {
                    recv(deadline) -> _ => {
                        tracing::debug!(?timeout, "cancel token deadline reached");
                        timer.cancel();
                    }
                    recv(timer.done()) -> _ => {}
                }
            });
        if let Err(err) = spawned {
            // No timer thread means no deadline.
            tracing::warn!(%err, "failed to spawn cancel timer, cancelling immediately");
            child.cancel();
        }
        child
    }

    /// Cancel this token and everything derived from it.
    pub fn cancel(&self) {
        let (done_tx, children) = {
            let mut state = self.inner.lock();
            (state.done_tx.take(), std::mem::take(&mut state.children))
        };
        if done_tx.is_none() {
            return;
        }
        drop(done_tx);
        for child in children.iter().filter_map(Weak::upgrade) {
            CancelToken { inner: child }.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().done_tx.is_none()
    }

    /// Receiver that disconnects when the token is cancelled.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done_rx
    }

    /// Block until the token is cancelled.
    pub fn wait(&self) {
        let _ = self.inner.done_rx.recv();
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frameloop/cancel.rs"]
mod tests;
