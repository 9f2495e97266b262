//! Behavior shared by both caching strategies
//!
//! [`StrategyCore`] carries the collaborators every strategy needs (tree,
//! store, local layout, requester identity) and implements the operations
//! whose semantics do not differ between the minimal and full variants.
//! The strategies wrap or delegate to these methods.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use mirrorfs_core::codes;
use mirrorfs_core::domain::entry::{Entry, EntryKind, SyncStatus};
use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::{IRemoteStore, TransferDirection};
use mirrorfs_core::tree::NamespaceTree;

use crate::access;

/// Seconds since the epoch, clamped to zero on clock weirdness.
pub(crate) fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Collaborators and shared operations common to both strategies.
pub(crate) struct StrategyCore {
    pub tree: Arc<NamespaceTree>,
    pub store: Arc<dyn IRemoteStore>,
    pub local_root: PathBuf,
    pub user: String,
    pub group: String,
}

impl StrategyCore {
    pub fn local_path(&self, path: &StorePath) -> PathBuf {
        let mut local = self.local_root.clone();
        for segment in path.segments() {
            local.push(segment);
        }
        local
    }

    /// Picks the entry for `path` out of a directory listing. A directory
    /// resolves to its own current-dir record; the root has no file name
    /// and only ever matches that record.
    pub fn find_in_listing(listing: &[Entry], path: &StorePath) -> Option<Entry> {
        match path.file_name() {
            Some(name) => listing
                .iter()
                .find(|e| e.kind != EntryKind::ParentDir && e.name == name)
                .cloned(),
            None => listing
                .iter()
                .find(|e| e.kind == EntryKind::CurrentDir)
                .cloned(),
        }
    }

    pub async fn make_dir_local(&self, path: &StorePath) -> i32 {
        match self.tree.get_entry(path) {
            Some(entry) if entry.is_directory() => {
                let local = self.local_path(path);
                if let Err(err) = tokio::fs::create_dir_all(&local).await {
                    warn!(path = %path, error = %err, "Cannot create local directory");
                    return codes::EREMOTE;
                }
                codes::OK
            }
            Some(_) => codes::ENOTDIR,
            None => codes::ENOENT,
        }
    }

    pub async fn open_for_read(&self, path: &StorePath) -> i32 {
        let local = self.local_path(path);
        if local.exists() {
            debug!(path = %path, "Local copy already cached");
            return codes::EEXIST;
        }
        self.store.transfer(path, TransferDirection::Pull).await
    }

    pub async fn create_entry(&self, path: &StorePath) -> i32 {
        let Some(name) = path.file_name() else {
            return codes::EREMOTE;
        };
        let entry = Entry::new(
            name,
            EntryKind::File,
            "0644",
            "0",
            now_epoch(),
            self.user.clone(),
            self.group.clone(),
            SyncStatus::Ahead,
        );
        self.tree.upsert(&path.parent(), entry);
        codes::OK
    }

    pub async fn make_directory(&self, path: &StorePath) -> i32 {
        let code = self.store.make_dir(path).await;
        if code != codes::OK {
            return code;
        }
        if let Some(name) = path.file_name() {
            let entry = Entry::new(
                name,
                EntryKind::Directory,
                "0755",
                "0",
                now_epoch(),
                self.user.clone(),
                self.group.clone(),
                SyncStatus::Synced,
            );
            self.tree.upsert(&path.parent(), entry);
        }
        codes::OK
    }

    /// Remote unlink, then unconditional local forget: whatever the remote
    /// said, the entry is gone from the shim's point of view.
    pub async fn remove_file(&self, path: &StorePath) -> i32 {
        let code = self.store.unlink(path).await;
        self.tree.delete(path);
        code
    }

    pub async fn remove_directory(&self, path: &StorePath) -> i32 {
        let code = self.store.rmdir(path).await;
        if code == codes::OK {
            self.tree.delete(path);
        }
        code
    }

    pub async fn rename(&self, path: &StorePath, new_path: &StorePath) -> i32 {
        let code = self.store.rename(path, new_path).await;
        if code != codes::OK {
            return code;
        }

        let moved = self.tree.get_entry(path);
        self.tree.delete(path);
        match (moved, new_path.file_name()) {
            (Some(mut entry), Some(name)) => {
                entry.name = name.to_string();
                self.tree.upsert(&new_path.parent(), entry);
            }
            _ => {
                // No metadata to carry over; walking the new path leaves a
                // placeholder to be resolved by the next listing.
                let _ = self.tree.get_entry(new_path);
            }
        }

        let local = self.local_path(new_path);
        if let Some(parent) = local.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %new_path, error = %err, "Cannot create local parent directory");
            }
        }
        codes::OK
    }

    pub async fn on_write(&self, path: &StorePath) -> i32 {
        let Some(entry) = self.tree.get_entry(path) else {
            return codes::EACCES;
        };
        match access::check(&entry, 2, &self.user, &self.group) {
            Ok(true) => {
                self.tree
                    .with_entry_mut(path, |e| e.status = SyncStatus::Ahead);
                codes::OK
            }
            Ok(false) => codes::EACCES,
            Err(err) => {
                warn!(path = %path, error = %err, "Access evaluation failed");
                codes::EACCES
            }
        }
    }

    /// Existence unknown (placeholder) is denied for every mask, including
    /// the pure existence test.
    pub async fn check_access(&self, path: &StorePath, mask: i32) -> i32 {
        let Some(entry) = self.tree.get_entry(path) else {
            return codes::EACCES;
        };
        match access::check(&entry, mask, &self.user, &self.group) {
            Ok(true) => codes::OK,
            Ok(false) => codes::EACCES,
            Err(err) => {
                warn!(path = %path, error = %err, "Access evaluation failed");
                codes::EACCES
            }
        }
    }

    pub async fn set_remote_mod_time(&self, path: &StorePath, mtime: i64) -> i32 {
        self.store.set_mod_time(path, mtime).await
    }

    /// Local file's (mtime, size), when it exists.
    pub fn local_metadata(&self, path: &StorePath) -> Option<(i64, u64)> {
        let meta = std::fs::metadata(self.local_path(path)).ok()?;
        let mtime = meta
            .modified()
            .ok()?
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_secs() as i64;
        Some((mtime, meta.len()))
    }
}
