//! Fixed-rate frame pacing.
//!
//! A [`FrameLoop`] owns a byte sink and a dedicated worker thread. Frames arrive from a producer
//! over a capacity-1 channel; the worker writes the current frame to the sink once per tick,
//! repeating the last frame when the producer falls behind. After every successful write a
//! lossy [`Emitted`] pulse is offered on an optional notification channel so the producer can
//! render at the output cadence.

/// Cancellation tokens.
pub mod cancel;
mod emit;
mod error;
mod panic_error;

use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

pub use cancel::CancelToken;
pub use emit::write_frame;
pub use error::FrameLoopError;
pub use panic_error::{PanicError, PanicSource, is_panic};

use crate::render::frame::Frame;

const WORKER_LOCATION: &str = "frame loop";

/// Pulse sent after a frame was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Emitted {
    /// 1-based count of successful emissions so far.
    pub seq: u64,
    /// 1-based ordinal of the received frame that was written. Repeats of the same frame carry
    /// the same value.
    pub frame: u64,
}

/// Capacity-1 channel for handing frames to a [`FrameLoop`].
pub fn frame_channel() -> (Sender<Frame>, Receiver<Frame>) {
    crossbeam_channel::bounded(1)
}

/// Capacity-1 channel for [`Emitted`] pulses. Pulses are dropped while it is full.
pub fn notification_channel() -> (Sender<Emitted>, Receiver<Emitted>) {
    crossbeam_channel::bounded(1)
}

/// State shared between the handle and the worker.
#[derive(Debug)]
struct Shared {
    cancel: CancelToken,
    err: Mutex<Option<FrameLoopError>>,
}

impl Shared {
    /// Record `err` unless an error is already recorded, then cancel.
    fn stop(&self, err: Option<FrameLoopError>) {
        let mut slot = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = err;
        }
        self.cancel.cancel();
    }

    fn error(&self) -> Option<FrameLoopError> {
        self.err
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

enum Worker<W> {
    /// No thread was started; the sink is handed back as is.
    Idle(W),
    Running(JoinHandle<W>),
}

/// Writes frames to a sink at a fixed rate on a dedicated thread.
///
/// The loop starts writing when the first frame is received and ends when its token is
/// cancelled ([`FrameLoop::stop`], the parent token, dropping the handle), when a write fails,
/// or when the producer closes the channel before sending anything. Closing the channel after
/// the first frame does not end the loop: the last frame keeps being written.
///
/// Every received frame is written at least once before another frame is accepted, unless the
/// loop ends first.
pub struct FrameLoop<W> {
    shared: Arc<Shared>,
    done_rx: Receiver<()>,
    worker: Option<Worker<W>>,
}

impl<W: Write + Send + 'static> FrameLoop<W> {
    /// Start a frame loop writing to `sink`.
    ///
    /// A `frame_rate` below 1 does not fail here: the returned loop is already done and
    /// [`FrameLoop::error`] reports [`FrameLoopError::InvalidFrameRate`].
    pub fn new(
        parent: &CancelToken,
        sink: W,
        frame_rate: i64,
        frames: Receiver<Frame>,
        notify: Option<Sender<Emitted>>,
    ) -> Self {
        let shared = Arc::new(Shared {
            cancel: parent.child(),
            err: Mutex::new(None),
        });
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        if frame_rate < 1 {
            tracing::warn!(frame_rate, "refusing to start frame loop");
            shared.stop(Some(FrameLoopError::InvalidFrameRate(frame_rate)));
            drop(done_tx);
            return Self {
                shared,
                done_rx,
                worker: Some(Worker::Idle(sink)),
            };
        }

        let interval = Duration::from_nanos((1_000_000_000 / frame_rate as u64).max(1));
        tracing::debug!(frame_rate, ?interval, "starting frame loop");

        let pacer = Pacer {
            sink,
            notify,
            shared: Arc::clone(&shared),
            seq: 0,
            received: 0,
        };
        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            match catch_unwind(AssertUnwindSafe(move || pacer.run(frames, interval))) {
                Ok(sink) => {
                    drop(done_tx);
                    sink
                }
                Err(payload) => {
                    let err = PanicError::from_payload(WORKER_LOCATION, payload.as_ref());
                    tracing::error!(%err, "frame loop worker panicked");
                    worker_shared.stop(Some(FrameLoopError::Panic(err)));
                    drop(done_tx);
                    resume_unwind(payload)
                }
            }
        });

        Self {
            shared,
            done_rx,
            worker: Some(Worker::Running(handle)),
        }
    }
}

impl<W> FrameLoop<W> {
    /// Ask the loop to end. Safe to call repeatedly and from several threads.
    ///
    /// A frame that is being written is finished first, but a received frame whose write time
    /// has not come yet may never be written.
    pub fn stop(&self) {
        self.shared.stop(None);
    }

    /// Block until the next [`Emitted`] pulse, or return `None` once the loop has ended.
    pub fn wait_for_next_emission(&self, notifications: &Receiver<Emitted>) -> Option<Emitted> {
        crossbeam_channel::select! {
            recv(self.done_rx) -> _ => None,
            recv(notifications) -> msg => msg.ok(),
        }
    }

    /// Receiver that disconnects once the loop has ended and will not write again.
    pub fn done(&self) -> &Receiver<()> {
        &self.done_rx
    }

    pub fn is_done(&self) -> bool {
        matches!(self.done_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until the loop has ended.
    pub fn wait(&self) {
        let _ = self.done_rx.recv();
    }

    /// Block until the loop has ended or `timeout` elapsed; returns `true` if it ended.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.done_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// First error recorded by the loop.
    ///
    /// Final once [`FrameLoop::done`] has fired; earlier reads may still change from `None`.
    pub fn error(&self) -> Option<FrameLoopError> {
        self.shared.error()
    }

    /// Wait for the worker to finish and take the sink back so it can be closed.
    ///
    /// This does not stop the loop. If the worker panicked, the panic continues on the calling
    /// thread.
    pub fn join(mut self) -> W {
        let Some(worker) = self.worker.take() else {
            unreachable!("frame loop worker taken before join");
        };
        match worker {
            Worker::Idle(sink) => sink,
            Worker::Running(handle) => match handle.join() {
                Ok(sink) => sink,
                Err(payload) => resume_unwind(payload),
            },
        }
    }
}

impl<W> Drop for FrameLoop<W> {
    fn drop(&mut self) {
        self.shared.stop(None);
    }
}

/// Worker-side state: the sink and the notification sender.
struct Pacer<W> {
    sink: W,
    notify: Option<Sender<Emitted>>,
    shared: Arc<Shared>,
    seq: u64,
    received: u64,
}

impl<W: Write> Pacer<W> {
    fn run(mut self, frames: Receiver<Frame>, interval: Duration) -> W {
        let cancel = self.shared.cancel.clone();
        let done = cancel.done();

        let mut frame = crossbeam_channel::select! {
            recv(done) -> _ => {
                tracing::debug!("frame loop cancelled before first frame");
                return self.sink;
            }
            recv(frames) -> msg => match msg {
                Ok(frame) => {
                    self.received = 1;
                    frame
                }
                Err(_) => {
                    self.shared.stop(Some(FrameLoopError::ClosedBeforeFirstFrame));
                    return self.sink;
                }
            },
        };

        let ticker = crossbeam_channel::tick(interval);
        if !self.emit(&frame) {
            return self.sink;
        }

        let never = crossbeam_channel::never();
        let mut inbound = Some(frames);
        loop {
            let frames = inbound.as_ref().unwrap_or(&never);
            let mut closed = false;
            crossbeam_channel::select! {
                recv(done) -> _ => break,
                recv(ticker) -> _ => {
                    if !self.emit(&frame) {
                        break;
                    }
                }
                recv(frames) -> msg => match msg {
                    Ok(next) => {
                        frame = next;
                        self.received += 1;
                        // Write the new frame once before accepting another one.
                        crossbeam_channel::select! {
                            recv(done) -> _ => break,
                            recv(ticker) -> _ => {
                                if !self.emit(&frame) {
                                    break;
                                }
                            }
                        }
                    }
                    Err(_) => closed = true,
                },
            }
            if closed {
                tracing::debug!("frame channel closed, repeating last frame");
                inbound = None;
            }
        }

        tracing::debug!(emitted = self.seq, "frame loop finished");
        self.sink
    }

    /// Write one frame and send a pulse. Returns `false` when the loop must end.
    fn emit(&mut self, frame: &Frame) -> bool {
        if self.shared.cancel.is_cancelled() {
            return false;
        }
        if let Err(err) = write_frame(&mut self.sink, frame) {
            tracing::warn!(%err, seq = self.seq + 1, "frame write failed");
            self.shared.stop(Some(FrameLoopError::write(err)));
            return false;
        }
        self.seq += 1;
        tracing::trace!(seq = self.seq, frame = self.received, "frame written");

        if let Some(notify) = &self.notify {
            // A pulse the consumer has not picked up yet is enough; drop this one.
            let _ = notify.try_send(Emitted {
                seq: self.seq,
                frame: self.received,
            });
        }
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frameloop/pacer.rs"]
mod tests;
