//! # Script Errors

use std::io;
use std::path::PathBuf;

use skv_client::ClientError;
use thiserror::Error;

/// Result type for script loading and execution.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors surfaced by the script cache and runner.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script file missing, unreadable, or could not be stat'ed.
    #[error("load script {name} from {}: {source}", path.display())]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The store answered with an error reply other than a handled `NOSCRIPT`.
    #[error("store error: {message}")]
    Store { message: String },
    /// The session could not deliver the command (including exhausted redials).
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ScriptError {
    pub(crate) fn store(message: &[u8]) -> Self {
        ScriptError::Store {
            message: String::from_utf8_lossy(message).into_owned(),
        }
    }
}
