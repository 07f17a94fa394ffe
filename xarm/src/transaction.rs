//! Transaction façade over a platform transaction manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use xarm_core::constants::{XA_TMFAIL, XA_TMSUCCESS};
use xarm_core::{Result, TransactionStatus, XarmError};

use crate::resource::{BoundResource, HoldObject, ResourceFactoryHolder};

/// The platform transaction manager surface this façade bridges.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Begins a new transaction on the calling context.
    async fn begin(&self) -> Result<()>;

    /// Commits the current transaction.
    async fn commit(&self) -> Result<()>;

    /// Rolls the current transaction back.
    async fn rollback(&self) -> Result<()>;

    /// Suspends the current transaction and returns it.
    async fn suspend(&self) -> Result<Arc<dyn PlatformTransaction>>;

    /// Resumes a previously suspended transaction.
    async fn resume(&self, transaction: Arc<dyn PlatformTransaction>) -> Result<()>;

    /// Sets the timeout, in seconds, for subsequently begun transactions.
    fn set_transaction_timeout(&self, seconds: u64) -> Result<()>;

    /// Returns the transaction associated with the calling context, if any.
    fn transaction(&self) -> Result<Option<Arc<dyn PlatformTransaction>>>;
}

/// A transaction owned by the platform transaction manager.
#[async_trait]
pub trait PlatformTransaction: Send + Sync {
    /// Queries the current status.
    fn status(&self) -> Result<TransactionStatus>;

    /// Marks the transaction so it can only roll back.
    fn set_rollback_only(&self) -> Result<()>;

    /// Enlists an XA resource with the transaction.
    async fn enlist_resource(&self, resource: Arc<dyn XaResource>) -> Result<bool>;

    /// Delists an XA resource from the transaction.
    async fn delist_resource(&self, resource: Arc<dyn XaResource>, flag: i32) -> Result<bool>;
}

/// An enlistable XA resource.
#[async_trait]
pub trait XaResource: Send + Sync {
    /// Sets the resource-local transaction timeout in seconds. Returns true
    /// if the resource accepted the value.
    fn set_transaction_timeout(&self, seconds: u64) -> Result<bool>;
}

/// Application-facing transaction bridging a [`TransactionManager`] to the
/// toolkit's transaction abstraction.
///
/// Tracks enlisted XA resources for delisting, and application-level
/// resource bindings keyed by hold object for commit-time cleanup.
pub struct XaTransaction {
    manager: Option<Arc<dyn TransactionManager>>,
    timeout: Option<Duration>,
    transaction: Mutex<Option<Arc<dyn PlatformTransaction>>>,
    suspended: Mutex<Option<Arc<dyn PlatformTransaction>>>,
    bound_resources: Mutex<HashMap<HoldObject, Arc<dyn BoundResource>>>,
    enlisted: Mutex<Vec<Arc<dyn XaResource>>>,
}

impl XaTransaction {
    /// Creates a transaction over the given platform manager. `None` builds
    /// a transaction whose lifecycle operations fail with illegal-state
    /// errors, matching deployments where no manager was configured.
    pub fn new(manager: Option<Arc<dyn TransactionManager>>) -> Self {
        Self {
            manager,
            timeout: None,
            transaction: Mutex::new(None),
            suspended: Mutex::new(None),
            bound_resources: Mutex::new(HashMap::new()),
            enlisted: Mutex::new(Vec::new()),
        }
    }

    /// Sets the transaction timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn require_manager(&self, operation: &str) -> Result<&Arc<dyn TransactionManager>> {
        self.manager.as_ref().ok_or_else(|| {
            XarmError::IllegalState(format!(
                "no transaction manager configured, cannot {operation}"
            ))
        })
    }

    /// Begins the transaction. A configured timeout is pushed onto the
    /// manager, in seconds, strictly before `begin` is called.
    pub async fn begin(&self) -> Result<()> {
        let manager = self.require_manager("begin")?;
        if let Some(timeout) = self.timeout {
            manager
                .set_transaction_timeout(timeout.as_secs())
                .map_err(|e| XarmError::Transaction(format!("failed to set timeout: {e}")))?;
        }
        manager
            .begin()
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to begin transaction: {e}")))?;
        *self.transaction.lock().await = manager
            .transaction()
            .map_err(|e| XarmError::Transaction(format!("failed to resolve transaction: {e}")))?;
        Ok(())
    }

    /// Commits the transaction.
    ///
    /// Enlisted XA resources are delisted from the underlying transaction
    /// and bound resources are delisted before the commit; bound resources
    /// are closed after it, whatever the commit outcome. Cleanup failures
    /// are logged and never mask the commit result.
    pub async fn commit(&self) -> Result<()> {
        let manager = self.require_manager("commit")?;
        self.delist_enlisted(XA_TMSUCCESS).await;
        let resources = self.bound_resource_list().await;
        for resource in &resources {
            if let Err(e) = resource.delist().await {
                tracing::warn!(error = %e, "failed to delist resource during commit");
            }
        }
        let outcome = manager
            .commit()
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to commit transaction: {e}")));
        for resource in &resources {
            if let Err(e) = resource.close().await {
                tracing::warn!(error = %e, "failed to close resource during commit");
            }
        }
        self.transaction.lock().await.take();
        outcome
    }

    /// Rolls the transaction back and closes bound resources. Enlisted XA
    /// resources are delisted with the failure flag first.
    pub async fn rollback(&self) -> Result<()> {
        let manager = self.require_manager("rollback")?;
        self.delist_enlisted(XA_TMFAIL).await;
        let outcome = manager
            .rollback()
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to roll back transaction: {e}")));
        for resource in &self.bound_resource_list().await {
            if let Err(e) = resource.close().await {
                tracing::warn!(error = %e, "failed to close resource during rollback");
            }
        }
        self.transaction.lock().await.take();
        outcome
    }

    /// Suspends the underlying transaction and parks it on this façade.
    pub async fn suspend(&self) -> Result<()> {
        let manager = self.require_manager("suspend")?;
        let suspended = manager
            .suspend()
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to suspend transaction: {e}")))?;
        *self.suspended.lock().await = Some(suspended);
        Ok(())
    }

    /// Resumes the previously suspended transaction.
    pub async fn resume(&self) -> Result<()> {
        let manager = self.require_manager("resume")?;
        let suspended = self.suspended.lock().await.take().ok_or_else(|| {
            XarmError::IllegalState("no suspended transaction to resume".to_string())
        })?;
        manager
            .resume(suspended)
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to resume transaction: {e}")))
    }

    /// Marks the underlying transaction rollback-only.
    ///
    /// Failures here are treated as programming errors, not transient
    /// conditions, and surface as illegal-state.
    pub async fn set_rollback_only(&self) -> Result<()> {
        let transaction = self.current_transaction().await?.ok_or_else(|| {
            XarmError::IllegalState(
                "no active transaction, cannot mark rollback-only".to_string(),
            )
        })?;
        transaction.set_rollback_only().map_err(|e| {
            XarmError::IllegalState(format!("failed to mark transaction rollback-only: {e}"))
        })
    }

    /// Returns true when the currently queried status is marked-rollback,
    /// rolling-back, or rolled-back. The status is re-read on every call,
    /// never memoized.
    pub async fn is_rollback_only(&self) -> Result<bool> {
        Ok(matches!(
            self.status().await?,
            TransactionStatus::MarkedRollback
                | TransactionStatus::RolledBack
                | TransactionStatus::RollingBack
        ))
    }

    /// Returns the underlying transaction's status, or
    /// [`TransactionStatus::NoTransaction`] when none exists.
    pub async fn status(&self) -> Result<TransactionStatus> {
        match self.current_transaction().await? {
            Some(transaction) => transaction
                .status()
                .map_err(|e| XarmError::Status(format!("failed to query status: {e}"))),
            None => Ok(TransactionStatus::NoTransaction),
        }
    }

    /// Enlists an XA resource, propagating a configured timeout onto the
    /// resource first.
    pub async fn enlist_resource(&self, resource: Arc<dyn XaResource>) -> Result<bool> {
        if let Some(timeout) = self.timeout {
            resource
                .set_transaction_timeout(timeout.as_secs())
                .map_err(|e| {
                    XarmError::Transaction(format!("failed to set resource timeout: {e}"))
                })?;
        }
        let transaction = self.current_transaction().await?.ok_or_else(|| {
            XarmError::Transaction("no active transaction to enlist with".to_string())
        })?;
        let enlisted = transaction.enlist_resource(Arc::clone(&resource)).await?;
        self.enlisted.lock().await.push(resource);
        Ok(enlisted)
    }

    /// Delists an XA resource. The absence of a transaction is a recoverable
    /// transaction error, not an illegal state.
    pub async fn delist_resource(
        &self,
        resource: Arc<dyn XaResource>,
        flag: i32,
    ) -> Result<bool> {
        let transaction = self.current_transaction().await?.ok_or_else(|| {
            XarmError::Transaction("no active transaction to delist from".to_string())
        })?;
        transaction
            .delist_resource(resource, flag)
            .await
            .map_err(|e| XarmError::Transaction(format!("failed to delist resource: {e}")))
    }

    /// Binds a resource under the holder's hold object.
    pub async fn bind_resource(
        &self,
        holder: &dyn ResourceFactoryHolder,
        resource: Arc<dyn BoundResource>,
    ) {
        self.bound_resources
            .lock()
            .await
            .insert(holder.hold_object(), resource);
    }

    /// Returns true if a resource is bound for the holder's hold object.
    pub async fn has_resource(&self, holder: &dyn ResourceFactoryHolder) -> bool {
        self.bound_resources
            .lock()
            .await
            .contains_key(&holder.hold_object())
    }

    /// Returns the resource bound for the holder's hold object, if any.
    pub async fn get_resource(
        &self,
        holder: &dyn ResourceFactoryHolder,
    ) -> Option<Arc<dyn BoundResource>> {
        self.bound_resources
            .lock()
            .await
            .get(&holder.hold_object())
            .cloned()
    }

    async fn bound_resource_list(&self) -> Vec<Arc<dyn BoundResource>> {
        self.bound_resources.lock().await.values().cloned().collect()
    }

    /// Delists every enlisted XA resource from the underlying transaction
    /// with the given flag and clears the list. Best-effort: failures are
    /// logged, a missing transaction only drops the list.
    async fn delist_enlisted(&self, flag: i32) {
        let resources: Vec<_> = self.enlisted.lock().await.drain(..).collect();
        if resources.is_empty() {
            return;
        }
        let transaction = match self.current_transaction().await {
            Ok(Some(transaction)) => transaction,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "failed to resolve transaction for delisting");
                return;
            }
        };
        for resource in resources {
            if let Err(e) = transaction.delist_resource(resource, flag).await {
                tracing::warn!(error = %e, "failed to delist enlisted resource");
            }
        }
    }

    async fn current_transaction(&self) -> Result<Option<Arc<dyn PlatformTransaction>>> {
        if let Some(transaction) = self.transaction.lock().await.as_ref() {
            return Ok(Some(Arc::clone(transaction)));
        }
        match &self.manager {
            Some(manager) => manager.transaction().map_err(|e| {
                XarmError::Status(format!("failed to resolve current transaction: {e}"))
            }),
            None => Ok(None),
        }
    }
}
