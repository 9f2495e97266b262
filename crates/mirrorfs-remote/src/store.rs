//! `IRemoteStore` implementation over pooled connections
//!
//! The [`PooledRemoteStore`] owns three [`ConnectionPool`]s: one of control
//! sessions for namespace commands, and two of data sessions so pulls and
//! pushes never starve each other. Every operation checks a session out,
//! runs one command, and releases it; a failed checkout surfaces as a plain
//! remote failure for that operation.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use mirrorfs_core::codes;
use mirrorfs_core::domain::entry::{Entry, EntryKind, SyncStatus};
use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::{IRemoteStore, TransferDirection};
use mirrorfs_core::tree::NamespaceTree;

use crate::connection::{IConnector, ListingRecord, TransferMode};
use crate::pool::ConnectionPool;
use crate::RemoteError;

/// Remote store adapter backed by pooled protocol sessions.
///
/// Listings feed the shared [`NamespaceTree`] directly: every record is
/// upserted with status [`SyncStatus::Behind`], and the tree's own rules
/// decide whether the record actually overwrites local state.
pub struct PooledRemoteStore {
    control: ConnectionPool,
    pull: ConnectionPool,
    push: ConnectionPool,
    tree: Arc<NamespaceTree>,
    store_root: String,
    local_root: PathBuf,
}

impl PooledRemoteStore {
    /// Connects the three pools. Fails when the first session of any pool
    /// cannot be opened; an unreachable remote at startup is fatal.
    pub async fn new(
        connector: Arc<dyn IConnector>,
        capacity: usize,
        store_root: impl Into<String>,
        local_root: PathBuf,
        tree: Arc<NamespaceTree>,
    ) -> Result<Self, RemoteError> {
        let control =
            ConnectionPool::new(Arc::clone(&connector), TransferMode::Control, capacity).await?;
        let pull =
            ConnectionPool::new(Arc::clone(&connector), TransferMode::Data, capacity).await?;
        let push = ConnectionPool::new(connector, TransferMode::Data, capacity).await?;
        Ok(Self {
            control,
            pull,
            push,
            tree,
            store_root: store_root.into(),
            local_root,
        })
    }

    pub fn pool_capacity(&self) -> usize {
        self.control.capacity()
    }

    /// Maps a namespace path onto the remote store, below the configured
    /// store root.
    fn remote_path(&self, path: &StorePath) -> String {
        let root = self.store_root.trim_end_matches('/');
        if root.is_empty() {
            path.to_string()
        } else if path.is_root() {
            root.to_string()
        } else {
            format!("{root}{path}")
        }
    }

    /// Maps a namespace path onto the local mirror directory.
    fn local_path(&self, path: &StorePath) -> PathBuf {
        let mut local = self.local_root.clone();
        for segment in path.segments() {
            local.push(segment);
        }
        local
    }

    /// Fetches one directory listing, feeds it into the tree, and returns
    /// the raw records so callers can walk what the remote actually has.
    async fn list_into_tree(&self, path: &StorePath) -> Result<Vec<ListingRecord>, i32> {
        let remote = self.remote_path(path);
        let Some(mut conn) = self.control.acquire().await else {
            return Err(codes::EREMOTE);
        };
        let result = conn.list(&remote).await;
        self.control.release(conn).await;

        match result {
            Ok(records) => {
                debug!(path = %path, records = records.len(), "Directory listed");
                for record in &records {
                    self.tree.upsert(path, Self::entry_from_record(record.clone()));
                }
                Ok(records)
            }
            Err(err) => {
                warn!(path = %path, error = %err, "Remote listing failed");
                Err(err.code())
            }
        }
    }

    fn entry_from_record(record: ListingRecord) -> Entry {
        let kind = if record.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Entry::new(
            record.name,
            kind,
            record.permissions,
            record.size,
            record.mtime,
            record.owner,
            record.group,
            SyncStatus::Behind,
        )
    }
}

#[async_trait::async_trait]
impl IRemoteStore for PooledRemoteStore {
    async fn transfer(&self, path: &StorePath, direction: TransferDirection) -> i32 {
        let remote = self.remote_path(path);
        let local = self.local_path(path);

        let pool = match direction {
            TransferDirection::Pull => &self.pull,
            TransferDirection::Push => &self.push,
        };

        if direction == TransferDirection::Pull {
            if let Some(parent) = local.parent() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    warn!(path = %path, error = %err, "Cannot create local parent directory");
                    return codes::EREMOTE;
                }
            }
        }

        let Some(mut conn) = pool.acquire().await else {
            return codes::EREMOTE;
        };
        let result = match direction {
            TransferDirection::Pull => conn.get_file(&remote, &local).await,
            TransferDirection::Push => conn.put_file(&local, &remote).await,
        };
        pool.release(conn).await;

        match result {
            Ok(()) => {
                debug!(path = %path, ?direction, "Transfer complete");
                codes::OK
            }
            Err(err) => {
                warn!(path = %path, ?direction, error = %err, "Transfer failed");
                err.code()
            }
        }
    }

    async fn transfer_many(&self, paths: &[StorePath], direction: TransferDirection) -> i32 {
        // Concurrency is bounded by the data pool: each transfer waits its
        // turn for a session. The batch reports the first failure in
        // request order.
        let outcomes = join_all(
            paths
                .iter()
                .map(|path| async move { self.transfer(path, direction).await }),
        )
        .await;
        outcomes
            .into_iter()
            .find(|&code| code != codes::OK)
            .unwrap_or(codes::OK)
    }

    async fn make_dir(&self, path: &StorePath) -> i32 {
        let remote = self.remote_path(path);
        let Some(mut conn) = self.control.acquire().await else {
            return codes::EREMOTE;
        };
        let result = conn.make_dir(&remote).await;
        self.control.release(conn).await;
        match result {
            Ok(()) => codes::OK,
            Err(err) => {
                warn!(path = %path, error = %err, "Remote mkdir failed");
                err.code()
            }
        }
    }

    async fn unlink(&self, path: &StorePath) -> i32 {
        let remote = self.remote_path(path);
        let Some(mut conn) = self.control.acquire().await else {
            return codes::EREMOTE;
        };
        let result = conn.delete_file(&remote).await;
        self.control.release(conn).await;
        match result {
            Ok(()) => codes::OK,
            Err(err) => {
                warn!(path = %path, error = %err, "Remote unlink failed");
                err.code()
            }
        }
    }

    async fn rmdir(&self, path: &StorePath) -> i32 {
        let remote = self.remote_path(path);
        let Some(mut conn) = self.control.acquire().await else {
            return codes::EREMOTE;
        };
        let result = conn.delete_dir(&remote).await;
        self.control.release(conn).await;
        match result {
            Ok(()) => codes::OK,
            Err(err) => {
                warn!(path = %path, error = %err, "Remote rmdir failed");
                err.code()
            }
        }
    }

    async fn rename(&self, from: &StorePath, to: &StorePath) -> i32 {
        let remote_from = self.remote_path(from);
        let remote_to = self.remote_path(to);
        let Some(mut conn) = self.control.acquire().await else {
            return codes::EREMOTE;
        };
        let result = conn.rename(&remote_from, &remote_to).await;
        self.control.release(conn).await;
        match result {
            Ok(()) => codes::OK,
            Err(err) => {
                warn!(from = %from, to = %to, error = %err, "Remote rename failed");
                err.code()
            }
        }
    }

    async fn set_mod_time(&self, path: &StorePath, mtime: i64) -> i32 {
        let remote = self.remote_path(path);
        let Some(mut conn) = self.control.acquire().await else {
            return codes::EREMOTE;
        };
        let result = conn.set_mod_time(&remote, mtime).await;
        self.control.release(conn).await;
        match result {
            Ok(()) => codes::OK,
            Err(err) => {
                warn!(path = %path, error = %err, "Remote utime failed");
                err.code()
            }
        }
    }

    async fn list(&self, path: &StorePath) -> i32 {
        match self.list_into_tree(path).await {
            Ok(_) => codes::OK,
            Err(code) => code,
        }
    }

    async fn list_recursive(&self, path: &StorePath) -> i32 {
        // Descend into the records just fetched, never into the mirrored
        // tree: a locally known directory that is gone remotely must not
        // fail the whole walk.
        let mut pending = vec![path.clone()];
        while let Some(dir) = pending.pop() {
            match self.list_into_tree(&dir).await {
                Ok(records) => {
                    for record in records {
                        if record.is_directory && record.name != "." && record.name != ".." {
                            pending.push(dir.join(record.name));
                        }
                    }
                }
                Err(code) => return code,
            }
        }
        codes::OK
    }

    async fn keep_alive(&self) {
        self.control.keep_alive_all().await;
        self.pull.keep_alive_all().await;
        self.push.keep_alive_all().await;
    }
}
