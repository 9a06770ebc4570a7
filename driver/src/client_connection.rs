//! Single-shot association state machine (spec.md §4.5).

use crate::ifc::{ConnectParams, ConnectStatus, FullmacIfc, Payload, ResponseData, VendorRequest};
use crate::ioctl::{CompletionResult, IoctlAdapter, RequestHandle};
use crate::waitable::WaitableState;
use shared::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ConnectCallback = Box<dyn FnOnce(ConnectStatus) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Connecting,
    Connected,
}

struct Inner {
    state: State,
    pending_handle: Option<RequestHandle>,
    on_connect: Option<ConnectCallback>,
}

pub struct ClientConnection {
    bss_index: u8,
    ioctl: Arc<IoctlAdapter>,
    ifc: Arc<dyn FullmacIfc>,
    default_timeout: Duration,
    connect_in_progress: Arc<WaitableState<bool>>,
    inner: Mutex<Inner>,
}

impl ClientConnection {
    pub fn new(
        bss_index: u8,
        ioctl: Arc<IoctlAdapter>,
        ifc: Arc<dyn FullmacIfc>,
        default_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(ClientConnection {
            bss_index,
            ioctl,
            ifc,
            default_timeout,
            connect_in_progress: Arc::new(WaitableState::new(false)),
            inner: Mutex::new(Inner { state: State::Idle, pending_handle: None, on_connect: None }),
        })
    }

    pub fn connect(
        self: &Arc<Self>,
        params: ConnectParams,
        on_connect: impl FnOnce(ConnectStatus) + Send + 'static,
        timeout: Option<Duration>,
    ) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Idle {
                return Err(Error::AlreadyExists);
            }
            inner.state = State::Connecting;
            inner.on_connect = Some(Box::new(on_connect));
        }
        self.connect_in_progress.set(true);

        let timeout = Some(timeout.unwrap_or(self.default_timeout));
        let request = VendorRequest { bss_index: self.bss_index, payload: Payload::Connect(params) };
        let this = self.clone();
        match self.ioctl.issue_async(request, move |result| this.on_complete(result), timeout) {
            crate::ioctl::IssueResult::Success(data) => {
                self.on_complete(CompletionResult::Success(data));
                Ok(())
            }
            crate::ioctl::IssueResult::Failure(e) => {
                // A synchronous rejection never schedules a completion
                // (spec.md §4.1): reset state directly without firing the
                // caller's callback.
                let mut inner = self.inner.lock().unwrap();
                inner.state = State::Idle;
                inner.on_connect = None;
                drop(inner);
                self.connect_in_progress.set(false);
                Err(e)
            }
            crate::ioctl::IssueResult::Pending(handle) => {
                self.inner.lock().unwrap().pending_handle = Some(handle);
                Ok(())
            }
        }
    }

    /// Cancels an in-flight connection attempt. Completion still arrives
    /// through the `connect` callback, reporting `Canceled`.
    pub fn cancel_connect(&self) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Connecting {
            return Err(Error::NotFound);
        }
        match inner.pending_handle.as_ref() {
            Some(handle) => {
                self.ioctl.cancel(handle);
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    /// Always `NotSupported`; preserved verbatim pending clarification of
    /// the original intent (spec.md §9 open question).
    pub fn disconnect(&self) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn on_complete(&self, result: CompletionResult) {
        let (status, ies, callback) = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending_handle = None;
            let (status, ies) = match result {
                CompletionResult::Success(ResponseData::AssocStatus { status_code: 0, ies }) => {
                    inner.state = State::Connected;
                    (ConnectStatus::Success, ies)
                }
                CompletionResult::Success(ResponseData::AssocStatus { status_code, ies }) => {
                    inner.state = State::Idle;
                    (ConnectStatus::StatusCode(status_code), ies)
                }
                CompletionResult::Success(ResponseData::None) => {
                    inner.state = State::Connected;
                    (ConnectStatus::Success, Vec::new())
                }
                CompletionResult::Timeout => {
                    inner.state = State::Idle;
                    (ConnectStatus::RefusedReasonUnspecified, Vec::new())
                }
                CompletionResult::Canceled => {
                    inner.state = State::Idle;
                    (ConnectStatus::Canceled, Vec::new())
                }
                CompletionResult::Failure(_) => {
                    inner.state = State::Idle;
                    (ConnectStatus::JoinFailure, Vec::new())
                }
            };
            (status, ies, inner.on_connect.take())
        };
        self.connect_in_progress.set(false);
        self.ifc.connect_confirm(status, ies);
        if let Some(callback) = callback {
            callback(status);
        }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        let _ = self.cancel_connect();
        self.connect_in_progress.wait_until_false();
    }
}
