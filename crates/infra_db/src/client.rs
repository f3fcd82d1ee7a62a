//! Repository access helper
//!
//! [`ClientManager::with_handle`] is the single entry point repositories use
//! to reach the database. Inside a unit of work it hands out the ambient
//! handle; outside one it borrows a connection for the duration of the call
//! and gives it back afterwards, whatever the outcome.

use std::future::Future;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::ambient;
use crate::connection::{ConnectionHandle, ConnectionPool};
use crate::error::{DatabaseError, DbResult};
use crate::postgres::PgConnectionPool;

/// A connection checked out of the pool
///
/// Returning it goes through [`Lease::release`]. If the lease is dropped
/// without being released (the owning future was cancelled, or a panic
/// unwound through it) the connection is reclaimed from `Drop`: any open
/// transaction is rolled back on a spawned task and the connection is
/// returned, or closed when no runtime is available to roll it back.
pub(crate) struct Lease {
    pool: Arc<dyn ConnectionPool>,
    handle: ConnectionHandle,
    open_transaction: bool,
    poisoned: bool,
    returned: bool,
}

impl Lease {
    fn new(pool: Arc<dyn ConnectionPool>, handle: ConnectionHandle) -> Self {
        Self {
            pool,
            handle,
            open_transaction: false,
            poisoned: false,
            returned: false,
        }
    }

    pub(crate) fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub(crate) fn set_open_transaction(&mut self, open: bool) {
        self.open_transaction = open;
    }

    /// Marks the session state as unknown; the connection is closed instead of reused
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    pub(crate) async fn release(mut self) {
        // Only counts as returned once the connection is out of the handle;
        // cancelled while waiting for the lock, `Drop` still reclaims it
        let connection = self.handle.take().await;
        self.returned = true;
        match connection {
            Some(connection) if self.poisoned || self.open_transaction => {
                warn!(handle = %self.handle.id(), "discarding connection with unknown session state");
                self.pool.discard(connection);
            }
            Some(connection) => {
                self.pool.release(connection);
                debug!(handle = %self.handle.id(), "connection released");
            }
            None => warn!(handle = %self.handle.id(), "connection was already returned"),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.returned {
            return;
        }

        warn!(
            handle = %self.handle.id(),
            open_transaction = self.open_transaction,
            "connection lease dropped before release; reclaiming"
        );
        let reclaim = Reclaim {
            pool: self.pool.clone(),
            handle: self.handle.clone(),
            open_transaction: self.open_transaction,
            poisoned: self.poisoned,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(reclaim.run());
            }
            Err(_) => reclaim.without_runtime(),
        }
    }
}

/// Returns the connection of an abandoned lease to the pool
///
/// If the reclaim task is dropped before it finishes (the runtime is
/// shutting down), `Drop` closes whatever connection is still in the handle.
struct Reclaim {
    pool: Arc<dyn ConnectionPool>,
    handle: ConnectionHandle,
    open_transaction: bool,
    poisoned: bool,
}

impl Reclaim {
    async fn run(self) {
        let Some(mut connection) = self.handle.take().await else {
            return;
        };

        if self.poisoned {
            self.pool.discard(connection);
            return;
        }

        if self.open_transaction {
            if let Err(err) = connection.execute("ROLLBACK", &[]).await {
                warn!(handle = %self.handle.id(), error = %err, "rollback of abandoned unit of work failed");
                self.pool.discard(connection);
                return;
            }
            debug!(handle = %self.handle.id(), "abandoned unit of work rolled back");
        }

        self.pool.release(connection);
    }

    /// No runtime to roll back on: clean connections go back, the rest are closed
    fn without_runtime(self) {
        if self.open_transaction || self.poisoned {
            // Closed by `Drop`
            return;
        }
        if let Some(connection) = self.handle.try_take() {
            self.pool.release(connection);
        }
    }
}

impl Drop for Reclaim {
    fn drop(&mut self) {
        if let Some(connection) = self.handle.try_take() {
            warn!(
                handle = %self.handle.id(),
                "connection reclaimed without rollback; closing it"
            );
            self.pool.discard(connection);
        }
    }
}

/// Entry point for repositories to reach a connection
///
/// # Example
///
/// ```rust,ignore
/// let clients = ClientManager::postgres(pool);
/// let rows = clients
///     .with_handle(|handle| async move {
///         handle.execute(r#"SELECT * FROM "Review" WHERE "bookId" = $1"#, &[isbn.into()]).await
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct ClientManager {
    pool: Arc<dyn ConnectionPool>,
}

impl ClientManager {
    pub fn new(pool: impl ConnectionPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub fn from_arc(pool: Arc<dyn ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Builds a manager over a sqlx PostgreSQL pool
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(PgConnectionPool::new(pool))
    }

    /// The handle bound by an enclosing unit of work, if any
    pub fn current(&self) -> Option<ConnectionHandle> {
        ambient::lookup()
    }

    /// Checks a fresh connection out of the pool
    pub(crate) async fn lease(&self) -> DbResult<Lease> {
        let connection = self.pool.acquire().await?;
        let handle = ConnectionHandle::new(connection);
        debug!(handle = %handle.id(), "connection acquired");
        Ok(Lease::new(self.pool.clone(), handle))
    }

    /// Runs `operation` with a connection handle
    ///
    /// Uses the ambient handle when called inside a unit of work, leaving its
    /// lifecycle to the unit of work. Otherwise borrows a connection for this
    /// call only and returns it once `operation` finishes.
    ///
    /// # Errors
    ///
    /// Pool failures surface as `DatabaseError::PoolExhausted` or
    /// `DatabaseError::PoolUnavailable` (converted into `E`) and `operation`
    /// is not invoked. Errors from `operation` are returned unchanged.
    pub async fn with_handle<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(ConnectionHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<DatabaseError>,
    {
        if let Some(handle) = ambient::lookup() {
            return operation(handle).await;
        }

        let lease = self.lease().await?;
        let result = operation(lease.handle().clone()).await;
        lease.release().await;
        result
    }
}

impl std::fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientManager").finish_non_exhaustive()
    }
}
