//! On-demand caching strategy
//!
//! The minimal strategy keeps no background machinery: every cache miss
//! costs one synchronous remote round trip, and local changes are pushed
//! when the shim releases the file. Suitable for low-traffic mounts and as
//! the fallback when the full mirror is not wanted.

use std::sync::Arc;

use tracing::{debug, warn};

use mirrorfs_core::codes;
use mirrorfs_core::config::Config;
use mirrorfs_core::domain::entry::{Entry, EntryKind, SyncStatus};
use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::{IRemoteStore, TransferDirection};
use mirrorfs_core::tree::NamespaceTree;

use crate::access;
use crate::shared::StrategyCore;
use crate::strategy::ICacheStrategy;

/// The on-demand strategy.
pub struct MinimalCache {
    core: StrategyCore,
}

impl MinimalCache {
    pub fn new(tree: Arc<NamespaceTree>, store: Arc<dyn IRemoteStore>, config: &Config) -> Self {
        Self {
            core: StrategyCore {
                tree,
                store,
                local_root: config.local.root_dir.clone(),
                user: config.local.user.clone(),
                group: config.local.group.clone(),
            },
        }
    }

    /// Lists `path` remotely. A not-a-directory refusal means `path` is a
    /// file, so the listing is retried once against its parent; the
    /// returned path is the directory that was actually listed.
    async fn list_with_retry(&self, path: &StorePath) -> (StorePath, i32) {
        let code = self.core.store.list(path).await;
        if code == codes::ENOTDIR {
            let parent = path.parent();
            debug!(path = %path, "Not a directory, listing parent instead");
            let code = self.core.store.list(&parent).await;
            (parent, code)
        } else {
            (path.clone(), code)
        }
    }
}

#[async_trait::async_trait]
impl ICacheStrategy for MinimalCache {
    async fn lookup_attributes(&self, path: &StorePath) -> Option<Entry> {
        if let Some(entry) = self.core.tree.get_entry(path) {
            return Some(entry);
        }
        let listing = self.list_directory(path).await;
        StrategyCore::find_in_listing(&listing, path)
    }

    async fn make_dir_local(&self, path: &StorePath) -> i32 {
        let code = self.core.make_dir_local(path).await;
        if code == codes::ENOENT {
            // The tree may simply not have seen this directory yet.
            self.list_directory(path).await;
            return self.core.make_dir_local(path).await;
        }
        code
    }

    async fn list_directory(&self, path: &StorePath) -> Vec<Entry> {
        let (listed, code) = self.list_with_retry(path).await;
        if code != codes::OK {
            warn!(path = %path, code, "Remote listing failed");
            let name = path.file_name().unwrap_or("/");
            return vec![Entry::error(name, code)];
        }
        self.core.tree.list_children(&listed)
    }

    async fn open_for_read(&self, path: &StorePath) -> i32 {
        self.core.open_for_read(path).await
    }

    async fn create_entry(&self, path: &StorePath) -> i32 {
        self.core.create_entry(path).await
    }

    async fn make_directory(&self, path: &StorePath) -> i32 {
        self.core.make_directory(path).await
    }

    async fn remove_file(&self, path: &StorePath) -> i32 {
        self.core.remove_file(path).await
    }

    async fn remove_directory(&self, path: &StorePath) -> i32 {
        self.core.remove_directory(path).await
    }

    async fn rename(&self, path: &StorePath, new_path: &StorePath) -> i32 {
        self.core.rename(path, new_path).await
    }

    async fn on_release(&self, path: &StorePath) -> i32 {
        match self.core.tree.get_entry(path) {
            // Unknown to the tree: a freshly written local file. Push it
            // without consulting the access check, since there is no entry
            // to check against.
            None => {
                let code = self
                    .core
                    .store
                    .transfer(path, TransferDirection::Push)
                    .await;
                if code == codes::OK {
                    if let (Some(name), Some((mtime, size))) =
                        (path.file_name(), self.core.local_metadata(path))
                    {
                        let entry = Entry::new(
                            name,
                            EntryKind::File,
                            "0644",
                            size.to_string(),
                            mtime,
                            self.core.user.clone(),
                            self.core.group.clone(),
                            SyncStatus::Synced,
                        );
                        self.core.tree.upsert(&path.parent(), entry);
                    }
                }
                code
            }
            Some(entry) => {
                let Some((local_mtime, size)) = self.core.local_metadata(path) else {
                    // Nothing on disk to publish.
                    return codes::OK;
                };
                if local_mtime > entry.mtime || entry.status == SyncStatus::Ahead {
                    match access::check(&entry, 2, &self.core.user, &self.core.group) {
                        Ok(true) => {}
                        Ok(false) => return codes::EACCES,
                        Err(err) => {
                            warn!(path = %path, error = %err, "Access evaluation failed");
                            return codes::EACCES;
                        }
                    }
                    let code = self
                        .core
                        .store
                        .transfer(path, TransferDirection::Push)
                        .await;
                    if code == codes::OK {
                        self.core.tree.with_entry_mut(path, |e| {
                            e.mtime = local_mtime;
                            e.size = size.to_string();
                            e.status = SyncStatus::Synced;
                        });
                    }
                    code
                } else {
                    codes::OK
                }
            }
        }
    }

    async fn on_write(&self, path: &StorePath) -> i32 {
        self.core.on_write(path).await
    }

    async fn check_access(&self, path: &StorePath, mask: i32) -> i32 {
        self.core.check_access(path, mask).await
    }

    async fn set_remote_mod_time(&self, path: &StorePath, mtime: i64) -> i32 {
        self.core.set_remote_mod_time(path, mtime).await
    }

    async fn shutdown(&self) {
        debug!("Minimal strategy has no background tasks to stop");
    }
}
