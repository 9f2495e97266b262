//! Entry metadata records
//!
//! An [`Entry`] is the metadata for one namespace node: name, kind,
//! permission string, ownership, size, modification time, hard-link count,
//! and the synchronization status that drives the caching strategies.

use serde::{Deserialize, Serialize};

/// Synchronization state of one entry relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// The remote copy is newer; the local copy must be (re)fetched.
    Behind,
    /// Local and remote agree; no action needed.
    Synced,
    /// The local copy is newer; it must be pushed to the remote store.
    Ahead,
}

/// What kind of namespace node an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    /// Synthetic "." entry produced when listing a directory.
    CurrentDir,
    /// Synthetic ".." entry produced when listing a non-root directory.
    ParentDir,
}

impl EntryKind {
    /// True for every directory-like kind, including the synthetic aliases.
    pub fn is_directory_like(self) -> bool {
        !matches!(self, EntryKind::File)
    }
}

/// Metadata record for one file or directory.
///
/// `size` is kept string-encoded because listings may report it only
/// partially; `mtime` is seconds since the epoch. `nlink` starts at 1 for
/// files and 2 for directories and is maintained by the namespace tree as
/// directory children come and go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub size: String,
    pub mtime: i64,
    pub nlink: u64,
    pub status: SyncStatus,
    /// Non-zero only on entries synthesized purely to report a failure.
    pub error_code: i32,
}

impl Entry {
    /// Builds a full listing record, the shape a remote listing produces.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        permissions: impl Into<String>,
        size: impl Into<String>,
        mtime: i64,
        owner: impl Into<String>,
        group: impl Into<String>,
        status: SyncStatus,
    ) -> Self {
        let nlink = if kind == EntryKind::File { 1 } else { 2 };
        Self {
            name: name.into(),
            kind,
            permissions: permissions.into(),
            owner: owner.into(),
            group: group.into(),
            size: size.into(),
            mtime,
            nlink,
            status,
            error_code: 0,
        }
    }

    /// Builds an entry that only carries a failure code back to the shim.
    pub fn error(name: impl Into<String>, error_code: i32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            permissions: String::new(),
            owner: String::new(),
            group: String::new(),
            size: String::new(),
            mtime: 0,
            nlink: 1,
            status: SyncStatus::Behind,
            error_code,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory_like()
    }

    pub fn increment_nlink(&mut self) {
        self.nlink += 1;
    }

    /// Decrements the hard-link count, clamping at zero.
    pub fn decrement_nlink(&mut self) {
        self.nlink = self.nlink.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_entry_starts_with_one_link() {
        let e = Entry::new(
            "a.txt",
            EntryKind::File,
            "0644",
            "0",
            100,
            "user",
            "users",
            SyncStatus::Behind,
        );
        assert_eq!(e.nlink, 1);
        assert!(!e.is_directory());
    }

    #[test]
    fn directory_entry_starts_with_two_links() {
        let e = Entry::new(
            "docs",
            EntryKind::Directory,
            "0755",
            "0",
            100,
            "user",
            "users",
            SyncStatus::Synced,
        );
        assert_eq!(e.nlink, 2);
        assert!(e.is_directory());
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let mut e = Entry::new(
            "a",
            EntryKind::File,
            "0644",
            "0",
            0,
            "u",
            "g",
            SyncStatus::Synced,
        );
        e.decrement_nlink();
        e.decrement_nlink();
        assert_eq!(e.nlink, 0);
    }

    #[test]
    fn synthetic_kinds_are_directory_like() {
        assert!(EntryKind::CurrentDir.is_directory_like());
        assert!(EntryKind::ParentDir.is_directory_like());
        assert!(EntryKind::Directory.is_directory_like());
        assert!(!EntryKind::File.is_directory_like());
    }

    #[test]
    fn error_entry_carries_code() {
        let e = Entry::error("missing", -2);
        assert_eq!(e.error_code, -2);
        assert_eq!(e.name, "missing");
    }
}
