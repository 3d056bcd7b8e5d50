//! Driver status codes and error handling.
//!
//! Every register-level and TCAM operation reports one of the driver's
//! numeric status codes. [`MsdStatus`] keeps those values so they can be
//! surfaced unchanged to callers that speak the legacy API, while
//! [`MsdError`] carries the context a Rust caller needs.

use std::fmt;
use thiserror::Error;

/// Driver status codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsdStatus {
    Ok = 0,
    Fail = 1,
    BadParam = 4,
    Busy = 5,
    NoSuch = 0x0D,
    NotSupported = 0x10,
    AlreadyExist = 0x1B,
}

impl MsdStatus {
    /// Creates a status from a raw driver value. Unknown values map to `Fail`.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => MsdStatus::Ok,
            4 => MsdStatus::BadParam,
            5 => MsdStatus::Busy,
            0x0D => MsdStatus::NoSuch,
            0x10 => MsdStatus::NotSupported,
            0x1B => MsdStatus::AlreadyExist,
            _ => MsdStatus::Fail,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == MsdStatus::Ok
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> MsdResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(MsdError::from_status(self))
        }
    }
}

impl fmt::Display for MsdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MsdStatus::Ok => "MSD_OK",
            MsdStatus::Fail => "MSD_FAIL",
            MsdStatus::BadParam => "MSD_BAD_PARAM",
            MsdStatus::Busy => "MSD_BUSY",
            MsdStatus::NoSuch => "MSD_NO_SUCH",
            MsdStatus::NotSupported => "MSD_NOT_SUPPORTED",
            MsdStatus::AlreadyExist => "MSD_ALREADY_EXIST",
        };
        write!(f, "{}", s)
    }
}

/// Error type for register and TCAM operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsdError {
    /// A status code without further context.
    #[error("operation failed: {status}")]
    Status { status: MsdStatus },

    /// The register transport reported a failure.
    #[error("register access failed on dev 0x{dev_addr:02x} reg 0x{reg_addr:02x}: {message}")]
    Transport {
        dev_addr: u8,
        reg_addr: u8,
        message: String,
    },

    /// Out-of-range index or port, or an inconsistent argument.
    #[error("Invalid parameter: {message}")]
    BadParam { message: String },

    /// The addressed entry does not exist, or an iteration is exhausted.
    #[error("No such entry: {item}")]
    NoSuch { item: String },

    #[error("Feature not supported: {feature}")]
    NotSupported { feature: String },

    /// The busy bit did not clear within the configured poll budget.
    #[error("timed out waiting for {what} after {polls} polls")]
    Timeout { what: String, polls: u32 },
}

impl MsdError {
    /// Creates an error from a driver status code.
    pub fn from_status(status: MsdStatus) -> Self {
        match status {
            MsdStatus::BadParam => MsdError::bad_param(format!("driver returned {}", status)),
            MsdStatus::NoSuch => MsdError::no_such("unknown"),
            MsdStatus::NotSupported => MsdError::not_supported("unknown"),
            _ => MsdError::Status { status },
        }
    }

    pub fn bad_param(message: impl Into<String>) -> Self {
        MsdError::BadParam {
            message: message.into(),
        }
    }

    pub fn no_such(item: impl Into<String>) -> Self {
        MsdError::NoSuch { item: item.into() }
    }

    pub fn not_supported(feature: impl Into<String>) -> Self {
        MsdError::NotSupported {
            feature: feature.into(),
        }
    }

    pub fn transport(dev_addr: u8, reg_addr: u8, message: impl Into<String>) -> Self {
        MsdError::Transport {
            dev_addr,
            reg_addr,
            message: message.into(),
        }
    }

    pub fn timeout(what: impl Into<String>, polls: u32) -> Self {
        MsdError::Timeout {
            what: what.into(),
            polls,
        }
    }

    /// Projects the error onto the driver status taxonomy.
    ///
    /// Transport failures and busy timeouts both surface as `Fail`.
    pub fn status(&self) -> MsdStatus {
        match self {
            MsdError::Status { status } => *status,
            MsdError::Transport { .. } | MsdError::Timeout { .. } => MsdStatus::Fail,
            MsdError::BadParam { .. } => MsdStatus::BadParam,
            MsdError::NoSuch { .. } => MsdStatus::NoSuch,
            MsdError::NotSupported { .. } => MsdStatus::NotSupported,
        }
    }

    pub fn is_no_such(&self) -> bool {
        self.status() == MsdStatus::NoSuch
    }
}

/// Result type for driver operations.
pub type MsdResult<T> = Result<T, MsdError>;
