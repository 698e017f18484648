//! In-flight async work and its completions.
//!
//! Decode and capture futures run as Tokio tasks. Their results come back to
//! the session over a channel as [`Completion`]s and are applied on the
//! control path. Each piece of work carries a [`Ticket`] and a
//! [`CancelToken`]; dropping the owning [`Pending`] cancels both, so a
//! completion that outlives its controller (or was superseded) is dropped
//! instead of applied.
//!
//! The work itself runs in its own task. If it panics, the request still
//! completes, with the failure variant of its [`Outcome`].

use collabmix_audio::{AudioHandle, CaptureStream};
use collabmix_core::{CaptureError, DecodeError, MixError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::warn;

use crate::track::TrackId;

/// Sender half of the session's completion channel.
pub(crate) type CompletionSender = UnboundedSender<Completion>;

/// Identifies one async request made by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of a finished async request.
#[derive(Debug)]
pub(crate) enum Outcome {
    Decoded(std::result::Result<AudioHandle, DecodeError>),
    StreamGranted(std::result::Result<CaptureStream, CaptureError>),
    TakeFinished(std::result::Result<Vec<u8>, CaptureError>),
}

impl Outcome {
    /// Decode work that died before producing a result.
    pub fn decode_lost(reason: String) -> Self {
        Self::Decoded(Err(DecodeError::Unsupported(reason)))
    }

    /// Stream request that died before producing a result.
    pub fn stream_lost(reason: String) -> Self {
        Self::StreamGranted(Err(CaptureError::Failed(reason)))
    }

    /// Take finalization that died before producing a result.
    pub fn take_lost(reason: String) -> Self {
        Self::TakeFinished(Err(CaptureError::Failed(reason)))
    }
}

/// Handle of the runtime async work is spawned on.
pub(crate) fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| MixError::Runtime(format!("no Tokio runtime to run on: {e}")))
}

/// A finished request on its way back to the control path.
#[derive(Debug)]
pub(crate) struct Completion {
    pub track: TrackId,
    pub ticket: Ticket,
    pub token: CancelToken,
    pub outcome: Outcome,
}

/// Owner of one in-flight request. Dropping it cancels the request.
#[derive(Debug)]
pub(crate) struct Pending {
    ticket: Ticket,
    token: CancelToken,
    work: AbortHandle,
    task: JoinHandle<()>,
}

impl Pending {
    /// Run `work` on the current Tokio runtime and report its result,
    /// mapped through `wrap`, on `completions`.
    ///
    /// If `work` panics the failure is reported through `lost` instead.
    pub fn spawn<F, T>(
        track: TrackId,
        ticket: Ticket,
        work: F,
        wrap: fn(T) -> Outcome,
        lost: fn(String) -> Outcome,
        completions: &CompletionSender,
    ) -> Result<Self>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = current_runtime()?;
        Ok(Self::spawn_on(
            &runtime,
            track,
            ticket,
            work,
            wrap,
            lost,
            completions,
        ))
    }

    /// Like [`Pending::spawn`], on an explicit runtime.
    pub fn spawn_on<F, T>(
        runtime: &Handle,
        track: TrackId,
        ticket: Ticket,
        work: F,
        wrap: fn(T) -> Outcome,
        lost: fn(String) -> Outcome,
        completions: &CompletionSender,
    ) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancelToken::new();
        let task_token = token.clone();
        let completions = completions.clone();
        let work = runtime.spawn(work);
        let work_abort = work.abort_handle();
        let task = runtime.spawn(async move {
            let outcome = match work.await {
                Ok(value) => wrap(value),
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    warn!(track = %track, ticket = ticket.raw(), error = %e, "Async work panicked");
                    lost(format!("async work panicked: {e}"))
                }
            };
            if task_token.is_cancelled() {
                return;
            }
            // The session may already be gone; nothing to report to then.
            let _ = completions.send(Completion {
                track,
                ticket,
                token: task_token,
                outcome,
            });
        });
        Self {
            ticket,
            token,
            work: work_abort,
            task,
        }
    }

    #[inline]
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Whether a completion carrying `ticket` and `token` answers this
    /// request and has not been cancelled.
    pub fn accepts(&self, ticket: Ticket, token: &CancelToken) -> bool {
        ticket == self.ticket && !token.is_cancelled()
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.token.cancel();
        self.work.abort();
        self.task.abort();
    }
}
