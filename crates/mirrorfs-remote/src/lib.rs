//! mirrorfs Remote - Pooled remote store adapter
//!
//! Drives the remote hierarchical file store over pooled protocol
//! connections:
//! - Connection abstraction and connector factory
//! - Capacity-bounded connection pools with background replenishment
//! - The `IRemoteStore` port implementation over three pools
//!
//! ## Architecture
//!
//! This crate implements the `IRemoteStore` port from `mirrorfs-core`. It
//! is a driven (secondary) adapter in the hexagonal architecture: the
//! caching strategies only ever see the port trait, and tests substitute
//! scripted connections through [`IConnector`].
//!
//! ## Key Components
//!
//! - [`ConnectionPool`] - Bounded pool with destroy-on-release semantics
//! - [`PooledRemoteStore`] - Full `IRemoteStore` implementation
//! - [`DirectoryConnector`] - Directory-backed connector for local serving
//! - [`RemoteError`] - Error types for remote operations

pub mod connection;
pub mod local;
pub mod pool;
pub mod store;

pub use connection::{IConnector, IRemoteConnection, ListingRecord, TransferMode};
pub use local::DirectoryConnector;
pub use pool::ConnectionPool;
pub use store::PooledRemoteStore;

use mirrorfs_core::codes;

/// Errors that can occur during remote store operations
///
/// Each variant corresponds to one status code from `mirrorfs_core::codes`;
/// [`RemoteError::code`] performs the mapping at the port boundary so the
/// strategies never see transport detail.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The remote path does not exist
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// The remote store refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A directory operation hit a non-directory path
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Directory removal refused because it still has entries
    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    /// Failed to establish or prepare a connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote store sent something the protocol layer cannot parse
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Local I/O failed while staging a transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// The status code this failure maps to at the port boundary.
    pub fn code(&self) -> i32 {
        match self {
            RemoteError::NotFound(_) => codes::ENOENT,
            RemoteError::PermissionDenied(_) => codes::EACCES,
            RemoteError::NotADirectory(_) => codes::ENOTDIR,
            RemoteError::NotEmpty(_) => codes::ENOTEMPTY,
            RemoteError::ConnectionFailed(_)
            | RemoteError::Protocol(_)
            | RemoteError::Io(_) => codes::EREMOTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(RemoteError::NotFound("/a".into()).code(), codes::ENOENT);
        assert_eq!(
            RemoteError::PermissionDenied("/a".into()).code(),
            codes::EACCES
        );
        assert_eq!(
            RemoteError::NotADirectory("/a".into()).code(),
            codes::ENOTDIR
        );
        assert_eq!(RemoteError::NotEmpty("/a".into()).code(), codes::ENOTEMPTY);
        assert_eq!(
            RemoteError::Protocol("garbled".into()).code(),
            codes::EREMOTE
        );
    }
}
