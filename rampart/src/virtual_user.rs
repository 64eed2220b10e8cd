//! Independently scheduled simulated clients.
use crate::collector::MetricsCollector;
use crate::executor::{RequestExecutor, Target};
use crate::payload::PayloadGenerator;
use rampart_core::RunConfig;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, debug_span, error, info, trace, warn, Instrument};

const RUNNING: u8 = 0;
const CANCELLING: u8 = 1;
const STOPPED: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VuState {
    Running,
    /// Retired, but an in-flight request may still complete and be recorded.
    Cancelling,
    Stopped,
}

/// Everything a virtual user needs, shared by reference between all of them.
pub struct VuContext<T> {
    pub executor: Arc<RequestExecutor<T>>,
    pub collector: Arc<MetricsCollector>,
    pub config: Arc<RunConfig>,
}

impl<T> Clone for VuContext<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            collector: self.collector.clone(),
            config: self.config.clone(),
        }
    }
}

/// Handle to one virtual user task.
///
/// Retiring is cooperative: the current request is never aborted, the task only refrains from
/// starting another iteration. A retirement arriving during the inter-iteration sleep ends the
/// sleep early.
pub struct VirtualUser {
    id: usize,
    cancel: watch::Sender<bool>,
    state: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

impl VirtualUser {
    pub fn spawn<T>(id: usize, ctx: VuContext<T>) -> Self
    where
        T: Target + Send + Sync + 'static,
    {
        let (cancel, cancelled) = watch::channel(false);
        let state = Arc::new(AtomicU8::new(RUNNING));
        let task = tokio::spawn(
            vu_loop(id, ctx, cancelled, state.clone()).instrument(debug_span!("vu", id)),
        );

        Self {
            id,
            cancel,
            state,
            task,
        }
    }

    pub fn retire(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, CANCELLING, Ordering::SeqCst, Ordering::SeqCst);
        self.cancel.send_replace(true);
    }

    pub fn state(&self) -> VuState {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => VuState::Running,
            CANCELLING => VuState::Cancelling,
            _ => VuState::Stopped,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to stop. Only returns promptly after [`retire`](Self::retire).
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            error!("Virtual user {} ended abnormally: {err}", self.id);
        }
    }
}

async fn vu_loop<T>(
    id: usize,
    ctx: VuContext<T>,
    mut cancelled: watch::Receiver<bool>,
    state: Arc<AtomicU8>,
) where
    T: Target + Send + Sync + 'static,
{
    let config = &ctx.config;
    let mut payloads = PayloadGenerator::new(&config.payload, config.seed.wrapping_add(id as u64));
    let mut iterations = 0u64;

    loop {
        let is_cancelled = *cancelled.borrow();
        if is_cancelled {
            break;
        }

        let payload = payloads.generate();
        let outcome = ctx
            .executor
            .send(payload.as_ref(), config.request_timeout)
            .await;
        ctx.collector.record(outcome);
        iterations += 1;

        tokio::select! {
            _ = tokio::time::sleep(config.iteration_sleep) => {}
            changed = cancelled.changed() => {
                // NOTE: The handle was dropped without retiring; nothing can cancel us anymore.
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    state.store(STOPPED, Ordering::SeqCst);
    debug!(iterations, "Virtual user stopped");
}
