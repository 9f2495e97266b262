//! Scripted remote store used by the strategy tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mirrorfs_core::codes;
use mirrorfs_core::domain::entry::{Entry, EntryKind};
use mirrorfs_core::domain::path::StorePath;
use mirrorfs_core::ports::{IRemoteStore, TransferDirection};
use mirrorfs_core::tree::NamespaceTree;

/// In-memory `IRemoteStore` with per-operation scripting and an op log.
///
/// Listings are scripted per path and upserted into the shared tree just
/// like the real adapter does.
pub struct MockRemoteStore {
    tree: Arc<NamespaceTree>,
    pub listings: Mutex<HashMap<String, Vec<Entry>>>,
    pub list_codes: Mutex<HashMap<String, i32>>,
    pub transfer_code: Mutex<i32>,
    pub batch_code: Mutex<i32>,
    pub op_code: Mutex<i32>,
    pub ops: Mutex<Vec<String>>,
}

impl MockRemoteStore {
    pub fn new(tree: Arc<NamespaceTree>) -> Self {
        Self {
            tree,
            listings: Mutex::new(HashMap::new()),
            list_codes: Mutex::new(HashMap::new()),
            transfer_code: Mutex::new(codes::OK),
            batch_code: Mutex::new(codes::OK),
            op_code: Mutex::new(codes::OK),
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn script_listing(&self, path: &str, entries: Vec<Entry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    pub fn script_list_code(&self, path: &str, code: i32) {
        self.list_codes
            .lock()
            .unwrap()
            .insert(path.to_string(), code);
    }

    pub fn logged(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn log(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }

    fn direction_label(direction: TransferDirection) -> &'static str {
        match direction {
            TransferDirection::Pull => "pull",
            TransferDirection::Push => "push",
        }
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MockRemoteStore {
    async fn transfer(&self, path: &StorePath, direction: TransferDirection) -> i32 {
        self.log(format!(
            "transfer {} {path}",
            Self::direction_label(direction)
        ));
        *self.transfer_code.lock().unwrap()
    }

    async fn transfer_many(&self, paths: &[StorePath], direction: TransferDirection) -> i32 {
        let joined = paths
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.log(format!(
            "batch {} {joined}",
            Self::direction_label(direction)
        ));
        *self.batch_code.lock().unwrap()
    }

    async fn make_dir(&self, path: &StorePath) -> i32 {
        self.log(format!("mkdir {path}"));
        *self.op_code.lock().unwrap()
    }

    async fn unlink(&self, path: &StorePath) -> i32 {
        self.log(format!("unlink {path}"));
        *self.op_code.lock().unwrap()
    }

    async fn rmdir(&self, path: &StorePath) -> i32 {
        self.log(format!("rmdir {path}"));
        *self.op_code.lock().unwrap()
    }

    async fn rename(&self, from: &StorePath, to: &StorePath) -> i32 {
        self.log(format!("rename {from} {to}"));
        *self.op_code.lock().unwrap()
    }

    async fn set_mod_time(&self, path: &StorePath, mtime: i64) -> i32 {
        self.log(format!("mdtm {path} {mtime}"));
        *self.op_code.lock().unwrap()
    }

    async fn list(&self, path: &StorePath) -> i32 {
        self.log(format!("list {path}"));
        let key = path.to_string();
        let scripted = self.listings.lock().unwrap().get(&key).cloned();
        match scripted {
            Some(entries) => {
                for entry in entries {
                    self.tree.upsert(path, entry);
                }
                codes::OK
            }
            None => self
                .list_codes
                .lock()
                .unwrap()
                .get(&key)
                .copied()
                .unwrap_or(codes::ENOENT),
        }
    }

    async fn list_recursive(&self, path: &StorePath) -> i32 {
        // Walks the scripted listings, like the real adapter walks the
        // records it fetched; stale tree nodes are not visited.
        let mut pending = vec![path.clone()];
        while let Some(dir) = pending.pop() {
            let code = self.list(&dir).await;
            if code != codes::OK {
                return code;
            }
            let scripted = self
                .listings
                .lock()
                .unwrap()
                .get(&dir.to_string())
                .cloned()
                .unwrap_or_default();
            for entry in scripted {
                if entry.kind == EntryKind::Directory && entry.name != "." && entry.name != ".." {
                    pending.push(dir.join(entry.name));
                }
            }
        }
        codes::OK
    }

    async fn keep_alive(&self) {
        self.log("keepalive".to_string());
    }
}
