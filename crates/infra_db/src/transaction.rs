//! Unit-of-work coordinator
//!
//! [`SqlTransactionManager::begin`] wraps caller-supplied work in a single
//! database transaction. The connection it opens the transaction on is bound
//! as the ambient handle for the work's whole extent, so every repository
//! call made inside joins the transaction through
//! [`ClientManager::with_handle`](crate::ClientManager::with_handle).
//!
//! ```text
//! Idle ─► ConnectionAcquired ─► TransactionStarted ─┬─► Committed  ─┬─► ConnectionReleased
//!                                                   └─► RolledBack ─┘
//! ```
//!
//! A `begin` issued while a unit of work is already bound does not open a
//! second one. It runs its work directly inside the outer transaction, and
//! only the outermost `begin` commits or rolls back.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use catalog_kernel::{PortError, TransactionManager};
use tracing::{debug, instrument, warn};

use crate::ambient;
use crate::client::{ClientManager, Lease};
use crate::connection::{ConnectionHandle, HandleId};
use crate::error::DatabaseError;
use crate::pool::DatabaseConfig;

/// Lifecycle of a single unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Idle,
    ConnectionAcquired,
    TransactionStarted,
    Committed,
    RolledBack,
    ConnectionReleased,
}

impl UnitOfWorkState {
    fn can_advance_to(self, next: UnitOfWorkState) -> bool {
        use UnitOfWorkState::*;
        matches!(
            (self, next),
            (Idle, ConnectionAcquired)
                | (ConnectionAcquired, TransactionStarted)
                // BEGIN itself failed
                | (ConnectionAcquired, RolledBack)
                | (TransactionStarted, Committed)
                | (TransactionStarted, RolledBack)
                | (Committed, ConnectionReleased)
                | (RolledBack, ConnectionReleased)
        )
    }
}

impl fmt::Display for UnitOfWorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitOfWorkState::Idle => "idle",
            UnitOfWorkState::ConnectionAcquired => "connection-acquired",
            UnitOfWorkState::TransactionStarted => "transaction-started",
            UnitOfWorkState::Committed => "committed",
            UnitOfWorkState::RolledBack => "rolled-back",
            UnitOfWorkState::ConnectionReleased => "connection-released",
        };
        f.write_str(name)
    }
}

/// Why a unit of work failed: the caller's work, or the database around it
enum Failure<E> {
    Work(E),
    Database(DatabaseError),
}

/// One outermost `begin` call: owns the lease for its whole duration
struct UnitOfWork {
    lease: Lease,
    state: UnitOfWorkState,
}

impl UnitOfWork {
    fn new(lease: Lease) -> Self {
        let mut unit = Self { lease, state: UnitOfWorkState::Idle };
        unit.advance(UnitOfWorkState::ConnectionAcquired);
        unit
    }

    fn handle(&self) -> ConnectionHandle {
        self.lease.handle().clone()
    }

    fn id(&self) -> HandleId {
        self.lease.handle().id()
    }

    fn advance(&mut self, next: UnitOfWorkState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal unit of work transition {} -> {}",
            self.state,
            next
        );
        debug!(handle = %self.id(), from = %self.state, to = %next, "unit of work transition");
        self.state = next;
    }

    async fn start(&mut self) -> Result<(), DatabaseError> {
        // Mark open before sending so a cancellation mid-BEGIN still rolls back
        self.lease.set_open_transaction(true);
        self.handle().execute("BEGIN", &[]).await?;
        self.advance(UnitOfWorkState::TransactionStarted);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.handle().execute("COMMIT", &[]).await?;
        self.lease.set_open_transaction(false);
        self.advance(UnitOfWorkState::Committed);
        Ok(())
    }

    /// Best-effort rollback; failures are logged, never returned
    async fn rollback(&mut self) {
        match self.handle().execute("ROLLBACK", &[]).await {
            Ok(_) => {
                self.lease.set_open_transaction(false);
                debug!(handle = %self.id(), "transaction rolled back");
            }
            Err(err) => {
                warn!(
                    handle = %self.id(),
                    error = %err,
                    "rollback failed; surfacing the original failure"
                );
                self.lease.poison();
            }
        }
        self.advance(UnitOfWorkState::RolledBack);
    }

    async fn release(mut self) {
        self.advance(UnitOfWorkState::ConnectionReleased);
        self.lease.release().await;
    }
}

/// Coordinates atomic units of work over a [`ClientManager`]
///
/// # Example
///
/// ```rust,ignore
/// let clients = ClientManager::postgres(pool);
/// let transactions = SqlTransactionManager::new(clients.clone());
/// let reviews = SqlReviewRepository::new(clients.clone());
/// let books = SqlBookRepository::new(clients);
///
/// transactions
///     .begin(|| async {
///         reviews.save(&review).await?;
///         books.update(&book).await?;
///         Ok::<_, PortError>(())
///     })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqlTransactionManager {
    clients: ClientManager,
    timeout: Option<Duration>,
}

impl SqlTransactionManager {
    pub fn new(clients: ClientManager) -> Self {
        Self { clients, timeout: None }
    }

    /// Builds a manager that applies `config.transaction_timeout`, if set
    pub fn from_config(clients: ClientManager, config: &DatabaseConfig) -> Self {
        Self {
            clients,
            timeout: config.transaction_timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Bounds the duration of each outermost unit of work
    ///
    /// Work that is still running when the limit passes is abandoned, the
    /// transaction is rolled back, and `begin` fails with
    /// `DatabaseError::TransactionTimedOut`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs `work` atomically
    ///
    /// - Inside an active unit of work: runs `work` as part of it.
    /// - Otherwise: acquires a connection, binds it, issues `BEGIN`, runs
    ///   `work`, then `COMMIT` on `Ok` or `ROLLBACK` on `Err`, and returns
    ///   the connection to the pool in every case.
    ///
    /// # Errors
    ///
    /// - the error returned by `work`, unchanged (a failing rollback does not replace it)
    /// - pool failures, with `work` never invoked
    /// - a failing `BEGIN` or `COMMIT`
    pub async fn begin<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<DatabaseError>,
    {
        self.run(work).await.map_err(|failure| match failure {
            Failure::Work(err) => err,
            Failure::Database(err) => E::from(err),
        })
    }

    #[instrument(name = "unit_of_work", skip_all)]
    async fn run<T, E, F, Fut>(&self, work: F) -> Result<T, Failure<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(handle) = ambient::lookup() {
            debug!(handle = %handle.id(), "joining active unit of work");
            return work().await.map_err(Failure::Work);
        }

        let lease = self.clients.lease().await.map_err(Failure::Database)?;
        let mut unit = UnitOfWork::new(lease);

        let outcome = ambient::run_bound(unit.handle(), self.transact(&mut unit, work)).await;

        unit.release().await;
        outcome
    }

    async fn transact<T, E, F, Fut>(&self, unit: &mut UnitOfWork, work: F) -> Result<T, Failure<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(err) = unit.start().await {
            unit.rollback().await;
            return Err(Failure::Database(err));
        }

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work()).await {
                Ok(result) => result.map_err(Failure::Work),
                Err(_) => {
                    warn!(handle = %unit.id(), ?limit, "unit of work timed out");
                    Err(Failure::Database(DatabaseError::TransactionTimedOut(limit)))
                }
            },
            None => work().await.map_err(Failure::Work),
        };

        match result {
            Ok(value) => match unit.commit().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    unit.rollback().await;
                    Err(Failure::Database(err))
                }
            },
            Err(failure) => {
                unit.rollback().await;
                Err(failure)
            }
        }
    }
}

impl TransactionManager for SqlTransactionManager {
    async fn begin<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<PortError> + Send,
    {
        self.run(work).await.map_err(|failure| match failure {
            Failure::Work(err) => err,
            Failure::Database(err) => E::from(PortError::from(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionPool};
    use crate::error::DbResult;
    use async_trait::async_trait;

    struct NoPool;

    #[async_trait]
    impl ConnectionPool for NoPool {
        async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
            Err(DatabaseError::PoolUnavailable("no pool".to_string()))
        }

        fn release(&self, _connection: Box<dyn Connection>) {}
    }

    #[test]
    fn test_state_machine_allows_only_forward_transitions() {
        use UnitOfWorkState::*;

        assert!(Idle.can_advance_to(ConnectionAcquired));
        assert!(TransactionStarted.can_advance_to(Committed));
        assert!(TransactionStarted.can_advance_to(RolledBack));
        assert!(Committed.can_advance_to(ConnectionReleased));

        assert!(!Idle.can_advance_to(TransactionStarted));
        assert!(!Committed.can_advance_to(TransactionStarted));
        assert!(!RolledBack.can_advance_to(Committed));
        assert!(!ConnectionReleased.can_advance_to(ConnectionAcquired));
    }

    #[test]
    fn test_from_config_applies_transaction_timeout() {
        let clients = ClientManager::from_arc(std::sync::Arc::new(NoPool));

        let bounded = DatabaseConfig::new("postgres://test").transaction_timeout(Duration::from_secs(5));
        let manager = SqlTransactionManager::from_config(clients.clone(), &bounded);
        assert_eq!(manager.timeout(), Some(Duration::from_secs(5)));

        let unbounded = DatabaseConfig::new("postgres://test");
        let manager = SqlTransactionManager::from_config(clients, &unbounded);
        assert_eq!(manager.timeout(), None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(UnitOfWorkState::RolledBack.to_string(), "rolled-back");
    }
}
