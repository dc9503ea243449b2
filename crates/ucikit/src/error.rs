//! Error types for UCI reconciliation.
//!
//! Every failure is terminal for the invocation that raised it. Variants
//! carry the address or condition that triggered them so an operator can
//! tell what the store looked like when the decision was made.

use thiserror::Error;

/// Coarse grouping of errors for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself is ill-formed or incomplete
    Request,
    /// The store is not in a state the request can act on
    State,
    /// The `uci` tool is missing or reported a failure
    Tool,
    /// The decision logic reached a branch it should never reach
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Request => "Invalid request",
            Self::State => "Configuration state prevents the change",
            Self::Tool => "uci command failed",
            Self::Internal => "Internal error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Request => "Check the package/section/type/name/value arguments",
            Self::State => "Create the missing section or key, or allow creation",
            Self::Tool => "Check that uci is installed and the package exists",
            Self::Internal => "This is a bug, please report it",
        }
    }
}

/// Errors that can occur while reconciling a UCI entry.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither a section name nor a section type was given
    #[error("definition of the key is ambiguous: package '{package}' needs a section or a type")]
    AmbiguousKey {
        /// Package of the offending request
        package: String,
    },

    /// A section must be created but no type was given
    #[error("section {address} must be created but no type was specified")]
    TypeRequired {
        /// Section that would have been created
        address: String,
    },

    /// The section does not exist and creation is disabled
    #[error("section {address} doesn't exist")]
    SectionMissing {
        /// Missing section
        address: String,
    },

    /// The key does not exist and creation is disabled
    #[error("key {address} doesn't exist")]
    KeyMissing {
        /// Missing key
        address: String,
    },

    /// A write or list-member delete needs a value that wasn't given
    #[error("no value provided for {operation} on {address}")]
    MissingValue {
        /// Operation that needed the value
        operation: &'static str,
        /// Target of the operation
        address: String,
    },

    /// `item = list` was requested without an option name
    #[error("section {address} can't be a list: a list needs a name")]
    SectionAsList {
        /// Section the request pointed at
        address: String,
    },

    /// Request failed basic validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The uci binary could not be located
    #[error("uci binary not found (searched PATH and {searched})")]
    ToolBinaryNotFound {
        /// Extra directories that were searched
        searched: String,
    },

    /// `uci get` reported that the entry does not exist
    #[error("entry not found: {0}")]
    NotFound(String),

    /// Any other non-zero exit from uci
    #[error("command uci {command} failed with: {stderr}")]
    ToolError {
        /// Command line passed to uci
        command: String,
        /// Trimmed stderr of the failed command
        stderr: String,
    },

    /// `uci commit` failed
    #[error("commit of package {package} failed with: {stderr}")]
    CommitFailed {
        /// Package that was being committed
        package: String,
        /// Trimmed stderr of the failed command
        stderr: String,
    },

    /// The planner reached a combination it does not handle
    #[error("there is some bug in the reconciliation logic: {0}")]
    InternalInvariantViolation(String),

    /// IO error while spawning uci
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::AmbiguousKey { .. }
            | Error::TypeRequired { .. }
            | Error::MissingValue { .. }
            | Error::SectionAsList { .. }
            | Error::InvalidRequest(_) => ErrorCategory::Request,
            Error::SectionMissing { .. } | Error::KeyMissing { .. } | Error::NotFound(_) => {
                ErrorCategory::State
            }
            Error::ToolBinaryNotFound { .. }
            | Error::ToolError { .. }
            | Error::CommitFailed { .. }
            | Error::Io(_) => ErrorCategory::Tool,
            Error::InternalInvariantViolation(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this is the "entry not found" condition of `uci get`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Create an error from the stderr of a failed uci command.
    ///
    /// `uci get` on a missing entry prints `uci: Entry not found`; that
    /// case becomes [`Error::NotFound`] so callers can treat it as absence.
    pub fn from_uci_output(command: &str, target: &str, stderr: &str) -> Self {
        if stderr.contains("Entry not found") {
            return Error::NotFound(target.to_string());
        }

        Error::ToolError {
            command: command.to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for UCI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uci_output_not_found() {
        let err = Error::from_uci_output(
            "get dhcp.lan.start",
            "dhcp.lan.start",
            "uci: Entry not found\n",
        );
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::State);
    }

    #[test]
    fn test_from_uci_output_other() {
        let err = Error::from_uci_output(
            "set dhcp.lan.start=100",
            "dhcp.lan.start",
            "uci: Invalid argument\n",
        );
        assert!(!err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::Tool);
        assert_eq!(
            err.to_string(),
            "command uci set dhcp.lan.start=100 failed with: uci: Invalid argument"
        );
    }

    #[test]
    fn test_messages_name_the_condition() {
        let err = Error::SectionMissing {
            address: "dhcp.computer".to_string(),
        };
        assert!(err.to_string().contains("dhcp.computer"));

        let err = Error::MissingValue {
            operation: "del_list",
            address: "firewall.@zone[0].network".to_string(),
        };
        assert!(err.to_string().contains("del_list"));
        assert!(err.to_string().contains("firewall.@zone[0].network"));
    }

    #[test]
    fn test_internal_category() {
        let err = Error::InternalInvariantViolation("unreachable".to_string());
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert_eq!(err.category().advice(), "This is a bug, please report it");
    }
}
