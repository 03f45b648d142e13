//! Synchronous submit-and-await bridge over a dedicated background runtime.
//!
//! One OS thread owns a single-threaded tokio runtime for the lifetime of the
//! bridge. Callers on any thread hand it a unit of async work through
//! [`AsyncBridge::run_sync`] and block until the result arrives or the
//! timeout elapses.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio::runtime;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::core::{Result, ServiceError};

/// Default cap on how long a caller blocks in [`AsyncBridge::run_sync`].
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `stop` waits for in-flight work before abandoning it.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Handle to the background scheduler.
///
/// Created eagerly with [`AsyncBridge::start`] and torn down only by an
/// explicit [`AsyncBridge::stop`] (or drop). The scheduler is never
/// recreated; a stopped bridge rejects all further submissions.
pub struct AsyncBridge {
    handle: runtime::Handle,
    timeout: Duration,
    running: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    shutdown: Mutex<Option<Shutdown>>,
}

struct Shutdown {
    signal: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AsyncBridge {
    /// Spins up the scheduler thread and its current-thread runtime.
    pub fn start(timeout: Duration) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (handle_tx, handle_rx) = mpsc::channel();
        let (signal_tx, signal_rx) = oneshot::channel::<()>();
        let drain_counter = Arc::clone(&in_flight);

        let thread = thread::Builder::new()
            .name("db-bridge".to_string())
            .spawn(move || {
                let rt = match runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = handle_tx.send(Err(err.to_string()));
                        return;
                    }
                };
                let _ = handle_tx.send(Ok(rt.handle().clone()));

                rt.block_on(async move {
                    let _ = signal_rx.await;
                    let drain = async {
                        while drain_counter.load(Ordering::Acquire) > 0 {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    };
                    if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
                        warn!("scheduler stopping with unfinished background work");
                    }
                });
            })
            .map_err(|err| {
                error!(error = %err, "failed to spawn scheduler thread");
                ServiceError::SchedulerUnavailable
            })?;

        let handle = handle_rx
            .recv()
            .map_err(|_| ServiceError::SchedulerUnavailable)?
            .map_err(|err| {
                error!(error = %err, "failed to build scheduler runtime");
                ServiceError::SchedulerUnavailable
            })?;

        debug!("background scheduler started");
        Ok(Self {
            handle,
            timeout,
            running,
            in_flight,
            shutdown: Mutex::new(Some(Shutdown {
                signal: signal_tx,
                thread,
            })),
        })
    }

    /// Schedules `work` on the background runtime and blocks until it
    /// completes or the timeout elapses.
    ///
    /// Contract: a timeout abandons only the waiting caller. The scheduled
    /// work is NOT cancelled; it keeps running on the background thread and
    /// its side effects (e.g. a write) may still land. Callers must treat
    /// [`ServiceError::OperationTimeout`] as "outcome unknown", not "did not
    /// happen".
    ///
    /// Concurrent callers are independent tasks competing for one
    /// cooperative scheduler; the bridge never serializes them. Work that
    /// blocks the scheduler thread starves every other queued unit.
    pub fn run_sync<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if !self.running.load(Ordering::Acquire) {
            return Err(ServiceError::SchedulerUnavailable);
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.handle.spawn(async move {
            let _guard = guard;
            let result = work.await;
            // The receiver may already have given up after a timeout.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ServiceError::OperationTimeout(self.timeout)),
            // The sender is gone without a result: the task was dropped by a
            // shutting-down runtime, or panicked. Either way the scheduler
            // never produced an answer for this caller.
            Err(RecvTimeoutError::Disconnected) => Err(ServiceError::SchedulerUnavailable),
        }
    }

    /// Whether the scheduler still accepts work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Requests shutdown, waits for in-flight work to drain (bounded by a
    /// grace period) and joins the scheduler thread. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let shutdown = {
            let mut slot = match self.shutdown.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };

        if let Some(Shutdown { signal, thread }) = shutdown {
            let _ = signal.send(());
            if thread.join().is_err() {
                error!("scheduler thread panicked during shutdown");
            }
            info!("background scheduler stopped");
        }
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
