//! The resource manager: transaction registries and 2PC orchestration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use xarm_core::{Result, TransactionStatus, XarmError, Xid};

use crate::config::ResourceManagerConfig;
use crate::context::{PrepareVote, XaTransactionContext};

/// The resource-specific two-phase-commit hooks.
///
/// The [`ResourceManager`] drives the protocol and delegates the actual
/// resource work to an implementation of this trait. Hooks may block on I/O;
/// the manager itself never does. Hook failures are propagated, never
/// retried: retry and compensation belong to the caller, typically the
/// session layer's dangling-transaction recovery.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Begins resource work for the transaction.
    async fn do_begin(&self, context: &XaTransactionContext) -> Result<()>;

    /// Collects the branch's vote.
    async fn do_prepare(&self, context: &XaTransactionContext) -> Result<PrepareVote>;

    /// Commits the branch.
    async fn do_commit(&self, context: &XaTransactionContext) -> Result<()>;

    /// Rolls the branch back.
    async fn do_rollback(&self, context: &XaTransactionContext) -> Result<()>;
}

/// Coordinates transaction contexts through the two-phase-commit protocol.
///
/// Maintains the active and suspended context registries keyed by [`Xid`]
/// and drives prepare/commit/rollback against the [`ResourceHandler`] hooks.
/// Registry operations for different Xids are safe to run concurrently;
/// operations on one Xid are serialized by the caller, per the XA protocol.
pub struct ResourceManager<H: ResourceHandler> {
    handler: H,
    config: ResourceManagerConfig,
    started: AtomicBool,
    active: RwLock<HashMap<Xid, Arc<XaTransactionContext>>>,
    suspended: RwLock<HashMap<Xid, Arc<XaTransactionContext>>>,
}

impl<H: ResourceHandler> ResourceManager<H> {
    /// Creates a resource manager over the given hooks.
    pub fn new(handler: H, config: ResourceManagerConfig) -> Self {
        Self {
            handler,
            config,
            started: AtomicBool::new(false),
            active: RwLock::new(HashMap::new()),
            suspended: RwLock::new(HashMap::new()),
        }
    }

    /// Starts the manager. Transactions cannot begin or prepare until this
    /// has been called.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
        tracing::info!(name = self.config.name(), "resource manager started");
    }

    /// Stops the manager; subsequent begin/prepare calls fail until it is
    /// started again.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        tracing::info!(name = self.config.name(), "resource manager stopped");
    }

    /// Returns true if the manager has been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.is_started() {
            return Err(XarmError::ResourceManager(
                "resource manager is not ready".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the manager-wide default transaction timeout.
    pub fn default_transaction_timeout(&self) -> Duration {
        self.config.default_transaction_timeout()
    }

    /// Returns the resource handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Begins resource work for a context. Does not register the context in
    /// any registry; registration is the session's responsibility.
    pub async fn begin_transaction(&self, context: &XaTransactionContext) -> Result<()> {
        self.ensure_ready()?;
        self.handler.do_begin(context).await
    }

    /// Runs the prepare phase: records the handler's vote on the context and
    /// returns it.
    pub async fn prepare_transaction(
        &self,
        context: &XaTransactionContext,
    ) -> Result<PrepareVote> {
        self.ensure_ready()?;
        context.transaction().set_status(TransactionStatus::Preparing);
        let vote = self.handler.do_prepare(context).await?;
        context.set_prepare_vote(vote);
        context.transaction().set_status(TransactionStatus::Prepared);
        tracing::debug!(name = self.config.name(), ?vote, "transaction prepared");
        Ok(vote)
    }

    /// Runs the commit phase. A rollback-only context cannot commit and the
    /// hook never fires for it. A read-only prepare vote short-circuits the
    /// hook: no resource participated, so there is nothing to commit.
    pub async fn commit_transaction(&self, context: &XaTransactionContext) -> Result<()> {
        if context.transaction().status() == TransactionStatus::MarkedRollback {
            return Err(XarmError::ResourceManager(
                "transaction is marked rollback-only and cannot commit".to_string(),
            ));
        }
        if context.prepare_vote() != Some(PrepareVote::ReadOnly) {
            context
                .transaction()
                .set_status(TransactionStatus::Committing);
            self.handler.do_commit(context).await?;
        }
        context.transaction().set_status(TransactionStatus::Committed);
        context.transaction().notify_finish();
        tracing::debug!(name = self.config.name(), "transaction committed");
        Ok(())
    }

    /// Rolls the transaction back.
    pub async fn rollback_transaction(&self, context: &XaTransactionContext) -> Result<()> {
        context
            .transaction()
            .set_status(TransactionStatus::RollingBack);
        self.handler.do_rollback(context).await?;
        context
            .transaction()
            .set_status(TransactionStatus::RolledBack);
        context.transaction().notify_finish();
        tracing::debug!(name = self.config.name(), "transaction rolled back");
        Ok(())
    }

    /// Marks the context rollback-only without touching any resource.
    pub fn set_transaction_rollback_only(&self, context: &XaTransactionContext) {
        context
            .transaction()
            .set_status(TransactionStatus::MarkedRollback);
    }

    /// Registers a context as the active entry for the Xid.
    pub async fn add_active_transactional_resource(
        &self,
        xid: Xid,
        context: Arc<XaTransactionContext>,
    ) {
        self.active.write().await.insert(xid, context);
    }

    /// Removes and returns the active entry for the Xid.
    pub async fn remove_active_transactional_resource(
        &self,
        xid: &Xid,
    ) -> Option<Arc<XaTransactionContext>> {
        self.active.write().await.remove(xid)
    }

    /// Registers a context as the suspended entry for the Xid.
    pub async fn add_suspended_transactional_resource(
        &self,
        xid: Xid,
        context: Arc<XaTransactionContext>,
    ) {
        self.suspended.write().await.insert(xid, context);
    }

    /// Removes and returns the suspended entry for the Xid.
    pub async fn remove_suspended_transactional_resource(
        &self,
        xid: &Xid,
    ) -> Option<Arc<XaTransactionContext>> {
        self.suspended.write().await.remove(xid)
    }

    /// Returns the active entry for the Xid.
    pub async fn get_active_transactional_resource(
        &self,
        xid: &Xid,
    ) -> Option<Arc<XaTransactionContext>> {
        self.active.read().await.get(xid).cloned()
    }

    /// Returns the suspended entry for the Xid.
    pub async fn get_suspended_transactional_resource(
        &self,
        xid: &Xid,
    ) -> Option<Arc<XaTransactionContext>> {
        self.suspended.read().await.get(xid).cloned()
    }

    /// Returns the context tracked for the Xid; the active entry shadows the
    /// suspended one.
    pub async fn get_transactional_resource(
        &self,
        xid: &Xid,
    ) -> Option<Arc<XaTransactionContext>> {
        if let Some(context) = self.get_active_transactional_resource(xid).await {
            return Some(context);
        }
        self.get_suspended_transactional_resource(xid).await
    }
}
