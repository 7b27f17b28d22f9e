use crate::domain::ports::UnitOfWorkProviderRef;
use crate::domain::unit_of_work::UnitOfWork;
use crate::error::Result;
use tracing::debug;

/// Runs a body of ledger and log writes as one all-or-nothing unit.
pub struct UnitOfWorkCoordinator {
    provider: UnitOfWorkProviderRef,
}

impl UnitOfWorkCoordinator {
    pub fn new(provider: UnitOfWorkProviderRef) -> Self {
        Self { provider }
    }

    /// Stages writes through `body` and commits them together.
    ///
    /// If `body` fails, the staged writes are rolled back and its error is
    /// returned unchanged. A failed commit also leaves the stores untouched.
    pub async fn run_atomic<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T>,
    {
        let mut uow = self.provider.begin();
        match body(&mut uow) {
            Ok(value) => {
                self.provider.commit(uow).await?;
                Ok(value)
            }
            Err(e) => {
                debug!(staged = uow.len(), error = %e, "Rolling back unit of work");
                self.provider.rollback(uow);
                Err(e)
            }
        }
    }
}
