//! Error types for persistence and sharing.

/// Failure reading or writing a blob in the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error on the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob is not valid JSON for the expected record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure handing a payload to a share target.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// No share command or clipboard program is available.
    #[error("no share command or clipboard program available")]
    Unavailable,

    /// The program could not be started or fed.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure.
    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: std::process::ExitStatus },
}
