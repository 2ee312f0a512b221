use thiserror::Error;

/// Errors raised before any plan is computed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure reported by an [`ImageEditor`](crate::export::ImageEditor) implementation.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("editor rejected request: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A piece failed; pieces before `index` are already on disk.
    #[error("piece {} ({name}) failed: {source}", .index + 1)]
    Collaborator {
        index: usize,
        name: String,
        #[source]
        source: EditorError,
    },
}
