use thiserror::Error;

/// Raw status code returned by the firmware for a completed or rejected
/// ioctl. Opaque beyond `Display`; the core never interprets specific
/// values, only whether a request succeeded, was canceled, or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareStatus(pub i32);

impl std::fmt::Display for FirmwareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Error kinds surfaced by the core (spec.md §7).
#[derive(Debug, Error)]
pub enum Error {
    /// An operation of this kind is already in progress on this interface.
    #[error("operation already in progress")]
    AlreadyExists,

    /// No matching in-flight operation to cancel.
    #[error("no matching operation to cancel")]
    NotFound,

    /// A caller-supplied argument is malformed or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgs(String),

    /// Firmware returned a status the core did not expect.
    #[error("firmware returned an unexpected status: {0}")]
    Internal(FirmwareStatus),

    /// The request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The request was explicitly canceled.
    #[error("request was canceled")]
    Canceled,

    /// The feature is not implemented.
    #[error("not supported")]
    NotSupported,
}

pub type Result<T> = std::result::Result<T, Error>;
