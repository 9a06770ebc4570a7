//! The ioctl adapter (spec.md §4.1): the single point through which every
//! vendor request is issued, with well-defined completion semantics
//! regardless of whether firmware answers synchronously, asynchronously, or
//! not at all.

use crate::ifc::{CancelToken, CompletionSink, FirmwareCompletion, MlanAdapter, ResponseData, SyncOutcome, VendorRequest};
use crate::worker::{TimeoutHandle, Worker};
use shared::{Error, FirmwareStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of `issue_async` (spec.md §4.1).
pub enum IssueResult {
    Pending(RequestHandle),
    Success(ResponseData),
    Failure(Error),
}

/// Result of `issue_sync`, and of a completion callback (spec.md §4.1).
#[derive(Debug, Clone)]
pub enum CompletionResult {
    Success(ResponseData),
    Failure(FirmwareStatus),
    Timeout,
    Canceled,
}

struct Inflight {
    fired: bool,
    timed_out: bool,
    timer: Option<TimeoutHandle>,
    on_complete: Option<Box<dyn FnOnce(CompletionResult) + Send>>,
}

/// A handle to a request that is still pending. Dropping it does not cancel
/// the request — per spec.md §3, the caller must keep the request alive
/// until its completion fires; `cancel()` is explicit.
pub struct RequestHandle {
    inflight: Arc<Mutex<Inflight>>,
    token: CancelToken,
    mlan: Arc<dyn MlanAdapter>,
}

pub struct IoctlAdapter {
    mlan: Arc<dyn MlanAdapter>,
    worker: Arc<Worker>,
}

impl IoctlAdapter {
    pub fn new(mlan: Arc<dyn MlanAdapter>) -> Self {
        IoctlAdapter {
            mlan,
            worker: Worker::spawn("ioctl-worker"),
        }
    }

    /// Issues `request` asynchronously. See spec.md §4.1 for the full
    /// contract; in short: on `Pending`, `on_complete` fires exactly once,
    /// later, with one of `{Success, Failure, Timeout, Canceled}`. On
    /// `Success`/`Failure` here, `on_complete` is never called.
    pub fn issue_async(
        &self,
        request: VendorRequest,
        on_complete: impl FnOnce(CompletionResult) + Send + 'static,
        timeout: Option<Duration>,
    ) -> IssueResult {
        let inflight = Arc::new(Mutex::new(Inflight {
            fired: false,
            timed_out: false,
            timer: None,
            on_complete: Some(Box::new(on_complete)),
        }));

        let sink_inflight = inflight.clone();
        let worker = self.worker.clone();
        let sink: CompletionSink = Arc::new(move |fw: FirmwareCompletion| {
            let inflight = sink_inflight.clone();
            worker.post(move || Self::run_completion(inflight, fw));
        });

        let (outcome, token) = self.mlan.ioctl(request, sink);
        match outcome {
            SyncOutcome::Success(data) => IssueResult::Success(data),
            SyncOutcome::Failure(status) => IssueResult::Failure(Error::Internal(status)),
            SyncOutcome::Pending => {
                if let Some(timeout) = timeout {
                    // Verify (via the inflight handle) the completion has
                    // not already fired before scheduling a timeout for it
                    // (spec.md §4.1 Timeout handling).
                    let already_fired = inflight.lock().unwrap().fired;
                    if !already_fired {
                        let weak = Arc::downgrade(&inflight);
                        let mlan = self.mlan.clone();
                        let posted = self.worker.post_after(timeout, move || {
                            if let Some(inflight) = weak.upgrade() {
                                Self::run_timeout(inflight, mlan, token);
                            }
                        });
                        match posted {
                            Some(handle) => inflight.lock().unwrap().timer = Some(handle),
                            None => {
                                // Scheduler failure: cancel and fail (spec.md §4.1).
                                if self.mlan.cancel(token) {
                                    return IssueResult::Failure(Error::Internal(FirmwareStatus(0)));
                                }
                                // Cancellation failed too: the request is
                                // considered pending; fall through.
                            }
                        }
                    }
                }
                IssueResult::Pending(RequestHandle {
                    inflight,
                    token,
                    mlan: self.mlan.clone(),
                })
            }
        }
    }

    /// Issues `request` and blocks up to `timeout` for its completion.
    /// Never returns `Pending`.
    pub fn issue_sync(&self, request: VendorRequest, timeout: Option<Duration>) -> CompletionResult {
        use crate::waitable::WaitableState;

        let waitable: Arc<WaitableState<Option<CompletionResult>>> =
            Arc::new(WaitableState::new(None));
        let signal = waitable.clone();

        match self.issue_async(request, move |result| signal.set(Some(result)), timeout) {
            IssueResult::Success(data) => CompletionResult::Success(data),
            IssueResult::Failure(Error::Internal(status)) => CompletionResult::Failure(status),
            IssueResult::Failure(_) => CompletionResult::Failure(FirmwareStatus(-1)),
            IssueResult::Pending(_handle) => waitable.wait_for(Option::is_some).unwrap(),
        }
    }

    /// Cancels a pending request. Returns true iff firmware confirms the
    /// cancellation; the request's completion callback still fires with
    /// `Canceled` (or whatever firmware reports) once firmware answers.
    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        handle.mlan.cancel(handle.token)
    }

    /// Broadcast cancel: every outstanding callback fires with `Canceled`.
    pub fn cancel_all(&self) {
        self.mlan.cancel_all();
    }

    fn run_completion(inflight: Arc<Mutex<Inflight>>, fw: FirmwareCompletion) {
        let (result, callback) = {
            let mut g = inflight.lock().unwrap();
            if g.fired {
                return;
            }
            g.fired = true;
            if let Some(timer) = g.timer.take() {
                timer.cancel();
            }
            let result = if g.timed_out {
                CompletionResult::Timeout
            } else {
                match fw {
                    FirmwareCompletion::Success(data) => CompletionResult::Success(data),
                    FirmwareCompletion::Failure(status) => CompletionResult::Failure(status),
                    FirmwareCompletion::Canceled => CompletionResult::Canceled,
                }
            };
            (result, g.on_complete.take())
        };
        if let Some(callback) = callback {
            callback(result);
        }
    }

    fn run_timeout(inflight: Arc<Mutex<Inflight>>, mlan: Arc<dyn MlanAdapter>, token: CancelToken) {
        {
            let mut g = inflight.lock().unwrap();
            if g.fired {
                return;
            }
            g.timed_out = true;
            g.timer = None;
        }
        let canceled = mlan.cancel(token);
        if !canceled {
            let mut g = inflight.lock().unwrap();
            if !g.fired {
                // Firmware already completed the real request; let that
                // completion proceed normally instead of reporting Timeout.
                g.timed_out = false;
            }
        }
    }
}
