//! Client-side write buffering and flush scheduling.
//!
//! Points accumulate under a mutex until either the size threshold is
//! exceeded or the oldest point has waited out the time threshold; the
//! batch is then snapshotted atomically and transmitted on a detached task.
//! The caller of [`WriteBuffer::write`] never blocks on the network and
//! never sees a transmission error — those go to the error hook.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::{Error, Result, time::TimeProvider};

/// Receives each flushed batch: one newline-joined line-protocol payload.
#[async_trait]
pub(crate) trait WriteSink: fmt::Debug + Send + Sync {
    async fn send_batch(&self, body: String) -> Result<()>;
}

/// Invoked with every error from a background flush transmission.
pub(crate) type ErrorHook = Arc<dyn Fn(Error) + Send + Sync>;

/// Accumulates timestamped points and flushes them as a single batch.
pub(crate) struct WriteBuffer {
    inner: Arc<Inner>,
}

struct Inner {
    max_size: usize,
    max_wait: Duration,
    sink: Arc<dyn WriteSink>,
    time: Arc<dyn TimeProvider>,
    hook: RwLock<ErrorHook>,
    state: Mutex<State>,
}

struct State {
    mode: Mode,
    /// Monotonic buffer-generation counter. A timer carries the epoch it
    /// was armed for so a stale timer racing a size-triggered flush cannot
    /// flush the successor buffer.
    epochs: u64,
}

/// At most one deferred flush exists: a timer is armed if and only if
/// points are buffered.
enum Mode {
    Idle,
    Buffering {
        epoch: u64,
        points: Vec<String>,
        deadline: JoinHandle<()>,
    },
}

impl WriteBuffer {
    pub(crate) fn new(
        max_size: usize,
        max_wait: Duration,
        sink: Arc<dyn WriteSink>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_size,
                max_wait,
                sink,
                time,
                hook: RwLock::new(Arc::new(|err: Error| {
                    error!(error = %err, "failed to flush buffered points");
                })),
                state: Mutex::new(State {
                    mode: Mode::Idle,
                    epochs: 0,
                }),
            }),
        }
    }

    /// Replace the hook invoked with background flush errors.
    pub(crate) fn set_error_hook(&self, hook: ErrorHook) {
        *self.inner.hook.write() = hook;
    }

    /// Append a point with the current timestamp. Never blocks and never
    /// fails; any flush this triggers runs detached.
    pub(crate) fn write(&self, point: &str) {
        let line = format!("{point} {}", self.inner.time.now_millis());
        let mut state = self.inner.state.lock();
        match std::mem::replace(&mut state.mode, Mode::Idle) {
            Mode::Idle => {
                let epoch = state.epochs;
                state.epochs += 1;
                let deadline = self.arm(epoch);
                state.mode = Mode::Buffering {
                    epoch,
                    points: vec![line],
                    deadline,
                };
            }
            Mode::Buffering {
                epoch,
                mut points,
                deadline,
            } => {
                points.push(line);
                // Strictly greater than: max_size points stay buffered, the
                // next write flushes them all.
                if points.len() > self.inner.max_size {
                    deadline.abort();
                    drop(state);
                    self.inner.dispatch(points);
                } else {
                    state.mode = Mode::Buffering {
                        epoch,
                        points,
                        deadline,
                    };
                }
            }
        }
    }

    /// Arm the single deferred flush for buffer generation `epoch`.
    fn arm(&self, epoch: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.max_wait).await;
            inner.flush_deadline(epoch);
        })
    }
}

impl Inner {
    /// Timer expiry: flush only if the buffer is still the generation the
    /// timer was armed for.
    fn flush_deadline(&self, epoch: u64) {
        let mut state = self.state.lock();
        match std::mem::replace(&mut state.mode, Mode::Idle) {
            Mode::Buffering {
                epoch: current,
                points,
                deadline,
            } if current == epoch => {
                deadline.abort();
                drop(state);
                self.dispatch(points);
            }
            other => state.mode = other,
        }
    }

    /// Join the snapshot into one payload and hand it to the sink on a
    /// detached task. A failed batch is dropped, not re-buffered; the error
    /// goes to the hook.
    fn dispatch(&self, points: Vec<String>) {
        debug!(points = points.len(), "flushing write buffer");
        let body = points.join("\n");
        let sink = Arc::clone(&self.sink);
        let hook = Arc::clone(&self.hook.read());
        tokio::spawn(async move {
            if let Err(error) = sink.send_batch(body).await {
                hook(error);
            }
        });
    }
}

impl fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBuffer")
            .field("max_size", &self.inner.max_size)
            .field("max_wait", &self.inner.max_wait)
            .finish_non_exhaustive()
    }
}
