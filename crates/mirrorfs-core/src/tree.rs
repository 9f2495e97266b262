//! The namespace tree
//!
//! The [`NamespaceTree`] is the authoritative in-memory mirror of the
//! remote+local namespace. Each node holds either a full [`Entry`] or a
//! bare placeholder name; the name-only state marks a path segment that
//! was walked before its metadata was resolved against the remote store.
//! Callers pattern-match on [`NodeContent`] (surfaced as an `Option` at the
//! API edge): a placeholder never means "does not exist".
//!
//! The tree exclusively owns all nodes; strategies hold only a shared
//! reference to the tree. An internal mutex makes every structural
//! mutation, including the status-based overwrite decision in
//! [`upsert`](NamespaceTree::upsert), atomic per call, so the mtime
//! tie-break holds under concurrent updates from the filesystem path, the
//! lister task, and batch-completion callbacks.

use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::domain::entry::{Entry, EntryKind, SyncStatus};
use crate::domain::path::StorePath;

/// What a tree node holds: a resolved entry, or just a name seen while
/// walking a path that has not been listed yet.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Placeholder(String),
    Populated(Entry),
}

impl NodeContent {
    fn name(&self) -> &str {
        match self {
            NodeContent::Placeholder(name) => name,
            NodeContent::Populated(entry) => &entry.name,
        }
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    content: NodeContent,
}

#[derive(Debug)]
struct TreeInner {
    nodes: Vec<Node>,
    free: Vec<usize>,
}

const ROOT: usize = 0;

impl TreeInner {
    fn alloc(&mut self, node: Node) -> usize {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Walks `path` from the root, creating placeholder chains for any
    /// missing segments. Always returns a node id.
    fn resolve(&mut self, path: &StorePath) -> usize {
        let mut current = ROOT;
        for segment in path.segments() {
            match self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].content.name() == segment)
            {
                Some(child) => current = child,
                None => {
                    let child = self.alloc(Node {
                        parent: Some(current),
                        children: Vec::new(),
                        content: NodeContent::Placeholder(segment.clone()),
                    });
                    self.nodes[current].children.push(child);
                    current = child;
                }
            }
        }
        current
    }

    fn find_child(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].content.name() == name)
    }

    fn bump_parent_nlink(&mut self, parent: usize) {
        if let NodeContent::Populated(entry) = &mut self.nodes[parent].content {
            entry.increment_nlink();
        }
    }

    /// Replaces a node's content in place, carrying the previous link count
    /// over when the node was already populated. Used for `.`/`..` records,
    /// which refresh a single node without enumerating a listing.
    fn refresh_in_place(&mut self, id: usize, mut entry: Entry) {
        entry.name = self.nodes[id].content.name().to_string();
        if let NodeContent::Populated(previous) = &self.nodes[id].content {
            entry.nlink = previous.nlink;
        }
        self.nodes[id].content = NodeContent::Populated(entry);
    }

    /// Frees a detached subtree so the arena slots can be reused.
    fn free_subtree(&mut self, id: usize) {
        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children {
            self.free_subtree(child);
        }
        self.nodes[id].content = NodeContent::Placeholder(String::new());
        self.nodes[id].parent = None;
        self.free.push(id);
    }

    fn collect(
        &self,
        id: usize,
        prefix: &StorePath,
        depth: i64,
        direction: SyncStatus,
        found: &mut Vec<StorePath>,
    ) {
        for &child in &self.nodes[id].children {
            let NodeContent::Populated(entry) = &self.nodes[child].content else {
                // Placeholders have no status to compare yet.
                continue;
            };
            let child_path = prefix.join(entry.name.clone());
            if entry.is_directory() {
                if depth != 0 {
                    self.collect(child, &child_path, depth - 1, direction, found);
                }
            } else if entry.status == direction {
                found.push(child_path);
            }
        }
    }

    fn render(&self, id: usize, indent: usize, out: &mut String) {
        let _ = writeln!(
            out,
            "{}{}",
            "\t".repeat(indent),
            self.nodes[id].content.name()
        );
        for &child in &self.nodes[id].children {
            self.render(child, indent + 1, out);
        }
    }
}

/// The in-memory metadata tree mirroring the mirrored namespace.
pub struct NamespaceTree {
    inner: Mutex<TreeInner>,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    /// Creates a tree holding only the root node `/` (a placeholder until
    /// a listing populates it).
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TreeInner {
                nodes: vec![Node {
                    parent: None,
                    children: Vec::new(),
                    content: NodeContent::Placeholder("/".to_string()),
                }],
                free: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TreeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry at `path`, or `None` when the node is only a
    /// placeholder. `None` is *not* "does not exist": callers must consult
    /// the remote store before concluding the file is truly absent.
    pub fn get_entry(&self, path: &StorePath) -> Option<Entry> {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        match &inner.nodes[id].content {
            NodeContent::Populated(entry) => Some(entry.clone()),
            NodeContent::Placeholder(_) => None,
        }
    }

    /// Runs `f` against the populated entry at `path`, under the tree lock.
    /// Returns `None` when the node is a placeholder. This is the only way
    /// to change an entry's status, mtime, or size in place without going
    /// through the upsert rules.
    pub fn with_entry_mut<R>(&self, path: &StorePath, f: impl FnOnce(&mut Entry) -> R) -> Option<R> {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        match &mut inner.nodes[id].content {
            NodeContent::Populated(entry) => Some(f(entry)),
            NodeContent::Placeholder(_) => None,
        }
    }

    /// Inserts or updates the entry named `entry.name` under `parent_path`.
    ///
    /// The special names `.` and `..` refresh the resolved node itself or
    /// its parent in place rather than inserting a child. For ordinary
    /// names the status rules apply: a strictly newer incoming `mtime`
    /// forces the existing entry [`SyncStatus::Behind`], and the incoming
    /// entry is applied only when the existing status is `Behind`, so a
    /// listing never silently overwrites an `Ahead` or `Synced` entry.
    pub fn upsert(&self, parent_path: &StorePath, entry: Entry) {
        let mut inner = self.lock();
        let parent = inner.resolve(parent_path);

        if entry.name == "." {
            inner.refresh_in_place(parent, entry);
            return;
        }
        if entry.name == ".." {
            if let Some(grandparent) = inner.nodes[parent].parent {
                inner.refresh_in_place(grandparent, entry);
            }
            return;
        }

        match inner.find_child(parent, &entry.name) {
            Some(child) => match &mut inner.nodes[child].content {
                NodeContent::Populated(existing) => {
                    if entry.mtime > existing.mtime {
                        existing.status = SyncStatus::Behind;
                    }
                    if existing.status == SyncStatus::Behind {
                        let mut entry = entry;
                        entry.nlink = existing.nlink;
                        inner.nodes[child].content = NodeContent::Populated(entry);
                    }
                }
                NodeContent::Placeholder(_) => {
                    let is_dir = entry.is_directory();
                    inner.nodes[child].content = NodeContent::Populated(entry);
                    if is_dir {
                        inner.bump_parent_nlink(parent);
                    }
                }
            },
            None => {
                let is_dir = entry.is_directory();
                let child = inner.alloc(Node {
                    parent: Some(parent),
                    children: Vec::new(),
                    content: NodeContent::Populated(entry),
                });
                inner.nodes[parent].children.push(child);
                if is_dir {
                    inner.bump_parent_nlink(parent);
                }
            }
        }
    }

    /// Detaches the node at `path` (and its whole subtree). A non-file
    /// entry decrements the parent directory's link count; a placeholder
    /// parent is silently left alone. Deleting the root is ignored.
    pub fn delete(&self, path: &StorePath) {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        let Some(parent) = inner.nodes[id].parent else {
            return;
        };
        inner.nodes[parent].children.retain(|&child| child != id);

        let was_non_file = match &inner.nodes[id].content {
            NodeContent::Populated(entry) => entry.is_directory(),
            NodeContent::Placeholder(_) => false,
        };
        if was_non_file {
            if let NodeContent::Populated(parent_entry) = &mut inner.nodes[parent].content {
                parent_entry.decrement_nlink();
            }
        }
        inner.free_subtree(id);
    }

    /// Lists the directory at `path` from the cache.
    ///
    /// Prepends a synthetic current-directory entry (and a parent-directory
    /// entry for non-root paths, when the parent is populated), then every
    /// populated child. Placeholder children are skipped entirely.
    pub fn list_children(&self, path: &StorePath) -> Vec<Entry> {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        let mut listing = Vec::new();

        match &inner.nodes[id].content {
            NodeContent::Populated(entry) => {
                let mut current = entry.clone();
                current.kind = EntryKind::CurrentDir;
                listing.push(current);
            }
            NodeContent::Placeholder(name) => {
                trace!(node = %name, "Directory node not yet populated, no current-dir entry");
            }
        }
        if let Some(parent) = inner.nodes[id].parent {
            if let NodeContent::Populated(entry) = &inner.nodes[parent].content {
                let mut parent_entry = entry.clone();
                parent_entry.kind = EntryKind::ParentDir;
                listing.push(parent_entry);
            }
        }

        let children = inner.nodes[id].children.clone();
        for child in children {
            if let NodeContent::Populated(entry) = &inner.nodes[child].content {
                listing.push(entry.clone());
            }
        }
        listing
    }

    /// Walks the subtree under `path`, `depth` levels deep (`-1` for
    /// unbounded), collecting the absolute path of every *file* whose
    /// status equals `direction`. Directories are recursed into, never
    /// collected themselves.
    pub fn collect_out_of_sync(
        &self,
        path: &StorePath,
        depth: i64,
        direction: SyncStatus,
    ) -> Vec<StorePath> {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        let mut found = Vec::new();
        inner.collect(id, path, depth, direction, &mut found);
        found
    }

    /// Renders the subtree under `path` for trace logging.
    pub fn render(&self, path: &StorePath) -> String {
        let mut inner = self.lock();
        let id = inner.resolve(path);
        let mut out = String::new();
        inner.render(id, 0, &mut out);
        out
    }
}
