// Errors surfaced by user-intent workbench operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("unknown tab `{0}`")]
    UnknownTab(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
