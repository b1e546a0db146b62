// Error handling module
// Defines the error taxonomy and process exit-code mapping

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during an export run
///
/// Every variant is terminal: the run stops, the message is printed to
/// stderr, and the process exits with the mapped code.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Configuration could not be assembled from CLI/env/prompts
    #[error("configuration error: {0:#}")]
    Config(#[from] anyhow::Error),

    /// Request could not be sent or the response could not be received
    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The vendor answered with a non-success status
    #[error("vendor rejected report {report_id} with status {status}: {body}")]
    Api {
        status: u16,
        report_id: String,
        body: String,
    },

    /// Response body was not JSON, or its shape did not match the record path
    #[error("unexpected response for report {report_id}: {reason}")]
    Parse { report_id: String, reason: String },

    /// Output file could not be written
    #[error("cannot write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Process exit code for this error class
    ///
    /// 0 is success; 1 is left to panics/unknown failures; 2 matches the
    /// usage-error code clap itself uses.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::Config(_) => 2,
            ExportError::Network { .. } => 3,
            ExportError::Api { .. } => 4,
            ExportError::Parse { .. } => 5,
            ExportError::Filesystem { .. } => 6,
        }
    }

    /// True when the vendor rejected the session itself: the cookie is
    /// likely expired or was copied incompletely
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ExportError::Api {
                status: 401 | 403,
                ..
            }
        )
    }
}

/// Result type alias for export operations
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, ExportError>;
