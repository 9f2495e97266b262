//! Remote connection abstraction
//!
//! One [`IRemoteConnection`] wraps one authenticated protocol session with
//! the remote store. The [`IConnector`] factory opens new sessions; the
//! pool in [`crate::pool`] owns their lifecycle. Tests implement both
//! traits with scripted fakes, so nothing in this crate requires a live
//! remote endpoint.

use std::path::Path;

use crate::RemoteError;

/// Which kind of session a pool hands out.
///
/// Control sessions run namespace commands (list, mkdir, rename, delete)
/// and need a fresh passive data channel negotiated per acquisition. Data
/// sessions stream file content and are set up once at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Control,
    Data,
}

/// One raw record from a remote directory listing.
///
/// This is a port-level DTO: the store adapter maps it onto a domain
/// `Entry`. The `.` and `..` records of the protocol are passed through
/// under their literal names; the namespace tree gives them their special
/// meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub name: String,
    pub is_directory: bool,
    /// Octal permission string as reported by the remote store, e.g. `0644`.
    pub permissions: String,
    /// Size in bytes, string-encoded; listings may omit it for directories.
    pub size: String,
    /// Modification time in seconds since the epoch.
    pub mtime: i64,
    pub owner: String,
    pub group: String,
}

/// One live session with the remote store.
///
/// Methods take `&mut self`: a session runs exactly one command at a time,
/// and exclusivity is enforced by pool checkout rather than internal locks.
#[async_trait::async_trait]
pub trait IRemoteConnection: Send {
    /// Negotiates a fresh data channel for the next command. Called by the
    /// pool on every checkout of a [`TransferMode::Control`] session.
    async fn prepare_channel(&mut self) -> Result<(), RemoteError>;

    /// Downloads the remote file at `remote` into the local file `local`,
    /// replacing it if present.
    async fn get_file(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError>;

    /// Uploads the local file `local` to the remote path `remote`,
    /// replacing it if present.
    async fn put_file(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    /// Creates a remote directory.
    async fn make_dir(&mut self, remote: &str) -> Result<(), RemoteError>;

    /// Deletes a remote file.
    async fn delete_file(&mut self, remote: &str) -> Result<(), RemoteError>;

    /// Deletes an empty remote directory.
    async fn delete_dir(&mut self, remote: &str) -> Result<(), RemoteError>;

    /// Renames a remote file or directory.
    async fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError>;

    /// Sets the remote modification time (seconds since the epoch).
    async fn set_mod_time(&mut self, remote: &str, mtime: i64) -> Result<(), RemoteError>;

    /// Lists one remote directory. The result includes the protocol's `.`
    /// and `..` records when the store sends them.
    async fn list(&mut self, remote: &str) -> Result<Vec<ListingRecord>, RemoteError>;

    /// Sends a protocol-level no-op to keep the session alive.
    async fn keep_alive(&mut self) -> Result<(), RemoteError>;

    /// Closes the session. Errors during teardown are swallowed; a session
    /// is never reused after close.
    async fn close(&mut self);
}

/// Factory for new remote sessions.
#[async_trait::async_trait]
pub trait IConnector: Send + Sync {
    /// Opens and authenticates one new session in the given mode.
    async fn connect(&self, mode: TransferMode)
        -> Result<Box<dyn IRemoteConnection>, RemoteError>;
}
