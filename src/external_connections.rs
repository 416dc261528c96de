use sqlx::PgConnection;

/// A handle to an active database connection, whether it was checked out of the pool or
/// belongs to an open transaction
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Gives driven adapters access to the systems they talk to. Business logic only ever sees
/// this trait, so adapters can be swapped for in-memory fakes in tests.
pub trait ExternalConnectivity {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}

/// The unit of work: every port call made through the handle is staged in one transaction
/// and nothing is persisted until [TransactionHandle::commit] is called. Dropping the handle
/// without committing rolls the work back.
pub trait TransactionHandle {
    async fn commit(self) -> Result<(), anyhow::Error>;
}

/// Something which can open a unit of work
pub trait Transactable {
    type Handle: ExternalConnectivity + TransactionHandle + Send;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error>;
}

/// Convenience bound for services that read outside a transaction and write inside one
pub trait TransactableExternalConnectivity: ExternalConnectivity + Transactable {}

impl<T> TransactableExternalConnectivity for T where T: ExternalConnectivity + Transactable {}
