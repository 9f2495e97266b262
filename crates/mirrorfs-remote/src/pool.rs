//! Remote connection pool management
//!
//! Provides a capacity-bounded pool of remote sessions with:
//! - A fatal synchronous first connection (no remote, no daemon)
//! - Background filling of the remaining slots at startup
//! - Destroy-on-release: sessions are single-use and replaced, never reused
//! - Per-checkout data channel setup for control sessions
//!
//! A session that has run one command sequence is not trusted to be in a
//! clean protocol state, so [`release`](ConnectionPool::release) closes it
//! and spawns a replacement instead of returning it to the pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::connection::{IConnector, IRemoteConnection, TransferMode};
use crate::RemoteError;

/// How long [`ConnectionPool::acquire`] waits for a free session.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(120);

/// A bounded pool of remote sessions in one [`TransferMode`].
///
/// The pool hands out owned boxed sessions; exclusivity comes from
/// ownership, not locks. Checkout can fail (timeout, failed channel
/// setup), and callers treat `None` as a remote failure for the current
/// operation only; the pool replenishes itself in the background.
pub struct ConnectionPool {
    connector: Arc<dyn IConnector>,
    mode: TransferMode,
    capacity: usize,
    acquire_timeout: Duration,
    sender: mpsc::Sender<Box<dyn IRemoteConnection>>,
    receiver: Mutex<mpsc::Receiver<Box<dyn IRemoteConnection>>>,
}

impl ConnectionPool {
    /// Creates a pool of `capacity` sessions.
    ///
    /// The first session is opened before this returns and its failure is
    /// propagated: an unreachable remote at startup is fatal. The remaining
    /// `capacity - 1` slots are filled by a background task; their failures
    /// are logged and leave the pool running under capacity.
    pub async fn new(
        connector: Arc<dyn IConnector>,
        mode: TransferMode,
        capacity: usize,
    ) -> Result<Self, RemoteError> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let first = connector.connect(mode).await?;
        // Channel was just created with room for `capacity` items.
        let _ = sender.try_send(first);

        let filler_connector = Arc::clone(&connector);
        let filler_sender = sender.clone();
        tokio::spawn(async move {
            for slot in 1..capacity {
                match filler_connector.connect(mode).await {
                    Ok(conn) => {
                        if filler_sender.send(conn).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(?mode, slot, error = %err, "Failed to fill connection pool slot");
                    }
                }
            }
            debug!(?mode, capacity, "Connection pool filled");
        });

        Ok(Self {
            connector,
            mode,
            capacity,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            sender,
            receiver: Mutex::new(receiver),
        })
    }

    /// Overrides the checkout timeout. Intended for tests.
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks out one session, waiting up to the acquire timeout.
    ///
    /// For control sessions a fresh data channel is negotiated here; if
    /// that fails the session is destroyed, a replacement is spawned, and
    /// `None` is returned.
    pub async fn acquire(&self) -> Option<Box<dyn IRemoteConnection>> {
        let mut conn = {
            let mut receiver = self.receiver.lock().await;
            match timeout(self.acquire_timeout, receiver.recv()).await {
                Ok(Some(conn)) => conn,
                Ok(None) => return None,
                Err(_) => {
                    warn!(mode = ?self.mode, "Timed out waiting for a pooled connection");
                    return None;
                }
            }
        };

        if self.mode == TransferMode::Control {
            if let Err(err) = conn.prepare_channel().await {
                warn!(error = %err, "Data channel setup failed on checkout");
                conn.close().await;
                self.spawn_replacement();
                return None;
            }
        }
        Some(conn)
    }

    /// Returns a checked-out session. The session is closed unconditionally
    /// and a fresh replacement is opened in the background.
    pub async fn release(&self, mut conn: Box<dyn IRemoteConnection>) {
        conn.close().await;
        self.spawn_replacement();
    }

    /// Sends a keepalive on every currently idle session. Best-effort: a
    /// session that fails its keepalive is destroyed and replaced.
    pub async fn keep_alive_all(&self) {
        let mut idle = Vec::new();
        {
            let mut receiver = self.receiver.lock().await;
            while let Ok(conn) = receiver.try_recv() {
                idle.push(conn);
            }
        }
        for mut conn in idle {
            match conn.keep_alive().await {
                Ok(()) => {
                    let _ = self.sender.send(conn).await;
                }
                Err(err) => {
                    warn!(mode = ?self.mode, error = %err, "Keepalive failed, replacing connection");
                    conn.close().await;
                    self.spawn_replacement();
                }
            }
        }
    }

    fn spawn_replacement(&self) {
        let connector = Arc::clone(&self.connector);
        let mode = self.mode;
        let sender = self.sender.clone();
        tokio::spawn(async move {
            match connector.connect(mode).await {
                Ok(conn) => {
                    let _ = sender.send(conn).await;
                }
                Err(err) => {
                    warn!(?mode, error = %err, "Failed to replenish connection pool");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::connection::ListingRecord;

    struct MockConnection {
        fail_prepare: bool,
        keepalives: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl IRemoteConnection for MockConnection {
        async fn prepare_channel(&mut self) -> Result<(), RemoteError> {
            if self.fail_prepare {
                Err(RemoteError::ConnectionFailed("no data channel".into()))
            } else {
                Ok(())
            }
        }

        async fn get_file(&mut self, _remote: &str, _local: &Path) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn put_file(&mut self, _local: &Path, _remote: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn make_dir(&mut self, _remote: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete_file(&mut self, _remote: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete_dir(&mut self, _remote: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn rename(&mut self, _from: &str, _to: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn set_mod_time(&mut self, _remote: &str, _mtime: i64) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn list(&mut self, _remote: &str) -> Result<Vec<ListingRecord>, RemoteError> {
            Ok(Vec::new())
        }

        async fn keep_alive(&mut self) -> Result<(), RemoteError> {
            self.keepalives.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    struct MockConnector {
        connects: AtomicUsize,
        fail_connect: bool,
        fail_prepare: bool,
        keepalives: Arc<AtomicUsize>,
    }

    impl MockConnector {
        fn new() -> Self {
            Self {
                connects: AtomicUsize::new(0),
                fail_connect: false,
                fail_prepare: false,
                keepalives: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl IConnector for MockConnector {
        async fn connect(
            &self,
            _mode: TransferMode,
        ) -> Result<Box<dyn IRemoteConnection>, RemoteError> {
            if self.fail_connect {
                return Err(RemoteError::ConnectionFailed("refused".into()));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockConnection {
                fail_prepare: self.fail_prepare,
                keepalives: Arc::clone(&self.keepalives),
            }))
        }
    }

    #[tokio::test]
    async fn first_connection_failure_is_fatal() {
        let mut connector = MockConnector::new();
        connector.fail_connect = true;
        let result = ConnectionPool::new(Arc::new(connector), TransferMode::Data, 3).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn acquire_hands_out_a_connection() {
        let pool = ConnectionPool::new(Arc::new(MockConnector::new()), TransferMode::Data, 2)
            .await
            .unwrap();
        assert!(pool.acquire().await.is_some());
    }

    #[tokio::test]
    async fn acquire_times_out_when_pool_is_exhausted() {
        let pool = ConnectionPool::new(Arc::new(MockConnector::new()), TransferMode::Data, 1)
            .await
            .unwrap()
            .with_acquire_timeout(Duration::from_millis(50));
        let held = pool.acquire().await.unwrap();
        assert!(pool.acquire().await.is_none());
        drop(held);
    }

    #[tokio::test]
    async fn release_replenishes_the_pool() {
        let pool = ConnectionPool::new(Arc::new(MockConnector::new()), TransferMode::Data, 1)
            .await
            .unwrap()
            .with_acquire_timeout(Duration::from_secs(5));
        let conn = pool.acquire().await.unwrap();
        pool.release(conn).await;
        // The replacement is opened in the background; acquire waits for it.
        assert!(pool.acquire().await.is_some());
    }

    #[tokio::test]
    async fn control_checkout_fails_when_channel_setup_fails() {
        let mut connector = MockConnector::new();
        connector.fail_prepare = true;
        let pool = ConnectionPool::new(Arc::new(connector), TransferMode::Control, 1)
            .await
            .unwrap()
            .with_acquire_timeout(Duration::from_millis(50));
        assert!(pool.acquire().await.is_none());
    }

    #[tokio::test]
    async fn data_checkout_skips_channel_setup() {
        let mut connector = MockConnector::new();
        connector.fail_prepare = true;
        let pool = ConnectionPool::new(Arc::new(connector), TransferMode::Data, 1)
            .await
            .unwrap();
        // Data sessions never call prepare_channel, so the broken
        // prepare must not matter.
        assert!(pool.acquire().await.is_some());
    }

    #[tokio::test]
    async fn keep_alive_all_touches_idle_connections() {
        let connector = MockConnector::new();
        let keepalives = Arc::clone(&connector.keepalives);
        let pool = ConnectionPool::new(Arc::new(connector), TransferMode::Data, 1)
            .await
            .unwrap();
        // Let the single session settle in the channel, then ping it twice.
        pool.keep_alive_all().await;
        pool.keep_alive_all().await;
        assert_eq!(keepalives.load(Ordering::SeqCst), 2);
        // The session went back into the pool each time.
        assert!(pool.acquire().await.is_some());
    }
}
