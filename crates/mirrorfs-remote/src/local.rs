//! Directory-backed remote store
//!
//! A [`DirectoryConnector`] serves a plain local directory as the "remote"
//! store. It implements the full connection contract over `tokio::fs`, so
//! the daemon runs end to end without a protocol endpoint and the higher
//! layers can be exercised against a real filesystem. A wire-protocol
//! connector plugs into the same [`IConnector`] seam.

use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::connection::{IConnector, IRemoteConnection, ListingRecord, TransferMode};
use crate::RemoteError;

/// POSIX `ENOTEMPTY`; `io::ErrorKind` has no stable variant for it.
const OS_ENOTEMPTY: i32 = 39;

fn map_io(err: io::Error, path: &str) -> RemoteError {
    match err.kind() {
        io::ErrorKind::NotFound => RemoteError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => RemoteError::PermissionDenied(path.to_string()),
        _ if err.raw_os_error() == Some(OS_ENOTEMPTY) => RemoteError::NotEmpty(path.to_string()),
        _ => RemoteError::Io(err),
    }
}

fn epoch_secs(time: io::Result<SystemTime>) -> i64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn record_from_metadata(name: String, meta: &std::fs::Metadata) -> ListingRecord {
    ListingRecord {
        name,
        is_directory: meta.is_dir(),
        permissions: format!("{:04o}", meta.permissions().mode() & 0o7777),
        size: meta.len().to_string(),
        mtime: epoch_secs(meta.modified()),
        owner: meta.uid().to_string(),
        group: meta.gid().to_string(),
    }
}

/// Connector serving a local directory in place of a remote endpoint.
pub struct DirectoryConnector {
    root: PathBuf,
}

impl DirectoryConnector {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait::async_trait]
impl IConnector for DirectoryConnector {
    async fn connect(
        &self,
        _mode: TransferMode,
    ) -> Result<Box<dyn IRemoteConnection>, RemoteError> {
        if !self.root.is_dir() {
            return Err(RemoteError::ConnectionFailed(format!(
                "backing directory does not exist: {}",
                self.root.display()
            )));
        }
        Ok(Box::new(DirectoryConnection {
            root: self.root.clone(),
        }))
    }
}

struct DirectoryConnection {
    root: PathBuf,
}

impl DirectoryConnection {
    fn backing(&self, remote: &str) -> PathBuf {
        self.root.join(remote.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl IRemoteConnection for DirectoryConnection {
    async fn prepare_channel(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn get_file(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        tokio::fs::copy(self.backing(remote), local)
            .await
            .map_err(|e| map_io(e, remote))?;
        Ok(())
    }

    async fn put_file(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let target = self.backing(remote);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(e, remote))?;
        }
        tokio::fs::copy(local, target)
            .await
            .map_err(|e| map_io(e, remote))?;
        Ok(())
    }

    async fn make_dir(&mut self, remote: &str) -> Result<(), RemoteError> {
        tokio::fs::create_dir(self.backing(remote))
            .await
            .map_err(|e| map_io(e, remote))
    }

    async fn delete_file(&mut self, remote: &str) -> Result<(), RemoteError> {
        tokio::fs::remove_file(self.backing(remote))
            .await
            .map_err(|e| map_io(e, remote))
    }

    async fn delete_dir(&mut self, remote: &str) -> Result<(), RemoteError> {
        tokio::fs::remove_dir(self.backing(remote))
            .await
            .map_err(|e| map_io(e, remote))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        tokio::fs::rename(self.backing(from), self.backing(to))
            .await
            .map_err(|e| map_io(e, from))
    }

    async fn set_mod_time(&mut self, remote: &str, mtime: i64) -> Result<(), RemoteError> {
        let file = std::fs::File::options()
            .write(true)
            .open(self.backing(remote))
            .map_err(|e| map_io(e, remote))?;
        let stamp = UNIX_EPOCH + Duration::from_secs(mtime.max(0) as u64);
        file.set_modified(stamp).map_err(|e| map_io(e, remote))
    }

    async fn list(&mut self, remote: &str) -> Result<Vec<ListingRecord>, RemoteError> {
        let dir = self.backing(remote);
        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| map_io(e, remote))?;
        if !meta.is_dir() {
            return Err(RemoteError::NotADirectory(remote.to_string()));
        }

        let mut records = vec![record_from_metadata(".".to_string(), &meta)];
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| map_io(e, remote))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| map_io(e, remote))? {
            let meta = entry.metadata().await.map_err(|e| map_io(e, remote))?;
            records.push(record_from_metadata(
                entry.file_name().to_string_lossy().into_owned(),
                &meta,
            ));
        }
        Ok(records)
    }

    async fn keep_alive(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn close(&mut self) {}
}
