//! Error types for nftables netlink operations.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during netlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// A decoder was handed a message of the wrong kind.
    #[error("unexpected header type: got {got:#06x}, want {}", format_expected(.expected))]
    UnexpectedHeaderType {
        /// The header type that was received.
        got: u16,
        /// The header types the decoder accepts.
        expected: Vec<u16>,
    },

    /// The kernel returned a different number of objects than requested.
    #[error("expected {kind} count {expected}, got {actual}")]
    UnexpectedCount {
        /// Object kind ("table", "object", ...).
        kind: &'static str,
        /// Expected number of objects.
        expected: usize,
        /// Number of objects returned.
        actual: usize,
    },

    /// Two legacy xtables expressions in one rule require different protocols.
    #[error("{first} and {second} have conflicting compat policies {first_policy} vs {second_policy}")]
    CompatConflict {
        /// Description of the first constrained expression.
        first: String,
        /// Description of the conflicting expression.
        second: String,
        /// Policy implied by the first expression.
        first_policy: String,
        /// Policy implied by the conflicting expression.
        second_policy: String,
    },

    /// The netlink socket was closed locally.
    #[error("connection closed")]
    ConnectionClosed,

    /// A monitor was subscribed twice, or after it was closed.
    #[error("monitor is already subscribed or closed")]
    MonitorUnavailable,
}

fn format_expected(expected: &[u16]) -> String {
    expected
        .iter()
        .map(|t| format!("{:#06x}", t))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl Error {
    /// Create a kernel error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Add context to this error.
    ///
    /// Wraps kernel errors with operation context. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a "not found" error (ENOENT).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => *errno == 2,
            Self::UnexpectedCount { actual: 0, .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, 1 | 13) // EPERM=1, EACCES=13
            }
            _ => false,
        }
    }

    /// Check if this is a "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                *errno == 17 // EEXIST=17
            }
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
