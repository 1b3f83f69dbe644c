use std::backtrace::Backtrace;

use thiserror::Error;

/// Represents errors that can occur in the host-level support layer. The variants form a closed set: a
/// configuration error for the absent collective-communication runtime, OS-level failures from mapping and
/// spawning, value errors for unrecognized reduction-operation names and element-type descriptors, and the
/// coordinated-failure sentinel.
///
/// Each variant includes a `backtrace` field that captures the call stack at the point where the error was created,
/// which is useful for debugging. Note that it is represented as a [`String`] and not as a [`Backtrace`] because using
/// the latter is only currently supported in unstable Rust.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// Error returned by every translation request made in an environment that lacks the collective-communication
    /// runtime dependency. Surfaced instead of (and with precedence over) any value error, so that a missing runtime
    /// is never mistaken for a lookup miss.
    #[error("the collective communication runtime is not available; {message}")]
    RuntimeUnavailable { message: String, backtrace: String },

    /// OS-level failure reported by a memory-mapping call, a log-file creation, or a process spawn. The `code` field
    /// preserves the OS error number for caller diagnostics.
    #[error("{message} (os error {code})")]
    Os { message: String, code: i32, backtrace: String },

    /// Error returned when a reduction-operation name or element-type descriptor does not belong to the recognized
    /// set. The `value` field names the offending input.
    #[error("{message}")]
    UnrecognizedValue { value: String, message: String, backtrace: String },

    /// Sentinel error meaning that one or more cooperating processes on this host have exited unexpectedly and the
    /// whole distributed session should be treated as failed. It carries no dynamic data beyond this fixed meaning;
    /// the per-process log files are the place to look for details. This error is raised by the higher-level polling
    /// logic that watches over launched processes, not by any operation in this crate.
    #[error("one or more cooperating processes on this host have exited; the distributed session has failed (check the process logs)")]
    CoordinatedFailure { backtrace: String },
}

impl Error {
    /// Creates a new [`Error::RuntimeUnavailable`].
    pub fn runtime_unavailable<M: Into<String>>(message: M) -> Self {
        Self::RuntimeUnavailable { message: message.into(), backtrace: Backtrace::capture().to_string() }
    }

    /// Creates a new [`Error::Os`].
    pub fn os<M: Into<String>>(message: M, code: i32) -> Self {
        Self::Os { message: message.into(), code, backtrace: Backtrace::capture().to_string() }
    }

    /// Creates a new [`Error::Os`] from the provided [`std::io::Error`], preserving its OS error number (or `0`
    /// when the error did not originate from the OS).
    pub fn from_io<M: Into<String>>(message: M, error: &std::io::Error) -> Self {
        Self::os(format!("{}; {error}", message.into()), error.raw_os_error().unwrap_or(0))
    }

    /// Creates a new [`Error::UnrecognizedValue`].
    pub fn unrecognized_value<V: Into<String>, M: Into<String>>(value: V, message: M) -> Self {
        Self::UnrecognizedValue {
            value: value.into(),
            message: message.into(),
            backtrace: Backtrace::capture().to_string(),
        }
    }

    /// Creates a new [`Error::CoordinatedFailure`].
    pub fn coordinated_failure() -> Self {
        Self::CoordinatedFailure { backtrace: Backtrace::capture().to_string() }
    }
}
