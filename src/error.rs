//! Error taxonomy for the Server, per spec.md section 7.
//!
//! `ServerError` is the single error type that flows out of the gateway
//! and filesystem-operations layers. The RPC front-end (`rpc.rs`) maps it
//! onto `tonic::Status`; nothing below that boundary knows about gRPC.

use thiserror::Error;

/// Errors returned by the Storage Gateway and Filesystem Operations layers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The target inode or name does not exist and the verb requires it.
    #[error("not found: {0}")]
    NotFound(String),

    /// A name was present when `create`/`mkdir`/`symlink`/`rename` required
    /// it to be absent.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// `StoreHasNewerValue`: another writer won the timestamp race.
    #[error("conflict: a newer value was already stored for {0}")]
    Conflict(String),

    /// A transport or timeout error from either store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The per-call deadline (spec.md section 5, default 10s) was hit.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Unmarshal failure or an invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Shorthand for a `NotFound` carrying a `(parent, name)` pair.
    pub fn not_found_name(parent: u64, name: &str) -> Self {
        ServerError::NotFound(format!("parent={parent} name={name:?}"))
    }

    /// Shorthand for a `NotFound` carrying an inode.
    pub fn not_found_inode(inode: u64) -> Self {
        ServerError::NotFound(format!("inode={inode}"))
    }
}

impl From<ServerError> for tonic::Status {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::NotFound(msg) => tonic::Status::not_found(msg),
            ServerError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ServerError::Conflict(msg) => tonic::Status::aborted(msg),
            ServerError::StoreUnavailable(msg) => tonic::Status::unavailable(msg),
            ServerError::Timeout(d) => {
                tonic::Status::deadline_exceeded(format!("timed out after {d:?}"))
            }
            ServerError::Internal(msg) => tonic::Status::internal(msg),
        }
    }
}

impl From<tonic::Status> for ServerError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;
        match status.code() {
            Code::NotFound => ServerError::NotFound(status.message().to_string()),
            Code::AlreadyExists => ServerError::AlreadyExists(status.message().to_string()),
            Code::Aborted => ServerError::Conflict(status.message().to_string()),
            Code::Unavailable | Code::Unknown => {
                ServerError::StoreUnavailable(status.message().to_string())
            }
            Code::DeadlineExceeded => ServerError::Timeout(std::time::Duration::from_secs(
                crate::config::STORE_CALL_TIMEOUT_SECS,
            )),
            _ => ServerError::Internal(status.message().to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ServerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ServerError::Timeout(std::time::Duration::from_secs(
            crate::config::STORE_CALL_TIMEOUT_SECS,
        ))
    }
}

/// Result alias used throughout the gateway and filesystem-operations layers.
pub type Result<T> = std::result::Result<T, ServerError>;
