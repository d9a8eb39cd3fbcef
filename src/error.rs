use crate::dap::protocol::ErrorMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- request errors --------------------------------------------
    /// Peer answered a request with `success: false`.
    #[error("{0}")]
    RequestFailed(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("request with sequence number {0} already pending")]
    DuplicateSequence(i64),

    // --------------------------------- transport errors ------------------------------------------
    #[error("transport closed")]
    TransportClosed,
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("DAP message of {0} bytes exceeds size limit")]
    FrameTooLarge(usize),
    #[error("invalid Content-Length header: {0}")]
    InvalidContentLength(#[from] std::num::ParseIntError),
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- parsing errors --------------------------------------------
    #[error("malformed DAP payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config file parsing error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Failure produced by an inbound request handler.
///
/// The variant decides how the failure is shown to the peer, see
/// [`HandlerError::to_error_message`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Error coming from outside the adapter (OS, debugee process, etc.),
    /// its text is already meaningful for the user.
    #[error("{0}")]
    External(String),
    /// Error with an explicit protocol payload, forwarded unchanged.
    #[error("{}", .0.format)]
    Protocol(ErrorMessage),
    /// Any other fault of the handler.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn external(err: impl ToString) -> Self {
        HandlerError::External(err.to_string())
    }

    /// Structured error payload sent in a failed response for `command`.
    pub fn to_error_message(&self, command: &str) -> ErrorMessage {
        match self {
            HandlerError::External(msg) => ErrorMessage::internal(msg.clone()),
            HandlerError::Protocol(payload) => payload.clone(),
            HandlerError::Internal(err) => {
                ErrorMessage::internal(format!("Error processing {command}: {err:#}"))
            }
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::External(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Internal(err.into())
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "dap", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "dap", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}

/// Non-fatal assertion: logs `msg` as an error when `cond` is false.
/// Return `cond`.
pub fn soft_assert(cond: bool, msg: impl FnOnce() -> String) -> bool {
    if !cond {
        log::error!(target: "dap", "assertion failed: {}", msg());
    }
    cond
}
