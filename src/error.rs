use thiserror::Error;

/// Result type for stream counter operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors reported when a tracker is driven outside its contract
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// An item was marked complete while no item was in progress
    #[error("Item completed with no item in progress")]
    NothingInProgress,
}
