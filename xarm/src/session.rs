//! The XA session: adapts the flags-based XA resource protocol onto the
//! resource manager.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use xarm_core::constants::{
    XAER_DUPID, XAER_INVAL, XAER_NOTA, XAER_PROTO, XAER_RMERR, XA_TMFAIL, XA_TMRESUME,
    XA_TMSUSPEND,
};
use xarm_core::{Result, XarmError, Xid};

use crate::context::{PrepareVote, XaTransactionContext};
use crate::manager::{ResourceHandler, ResourceManager};

/// Session-specific hooks: context creation and dangling-transaction
/// recovery.
///
/// The dangling hooks are a required recovery path, not an error path: after
/// a restart, commit and rollback calls can arrive for transactions this
/// session holds no in-memory context for, and the handler must resolve them
/// from durable state.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// Creates the context for a newly started transaction branch.
    async fn create_transaction_context(&self, xid: &Xid) -> Arc<XaTransactionContext>;

    /// Commits a transaction this session has no local context for.
    async fn commit_dangling_transaction(&self, xid: &Xid, one_phase: bool) -> Result<()>;

    /// Rolls back a transaction this session has no local context for.
    async fn rollback_dangling_transaction(&self, xid: &Xid) -> Result<()>;

    /// Returns the Xids of prepared-but-unresolved transaction branches.
    async fn recover(&self, flags: i32) -> Result<Vec<Xid>>;
}

struct SessionEntry {
    context: Arc<XaTransactionContext>,
    /// True between `start` and `end` for this Xid.
    associated: bool,
}

/// XA resource-protocol surface over a [`ResourceManager`].
///
/// Each concurrently processed transaction drives its own Xid through
/// `start`/`end`/`prepare`/`commit`/`rollback`; the session tracks the
/// per-Xid association and the registries move between the manager's active
/// and suspended maps as the flags dictate.
pub struct XaSession<H: ResourceHandler, S: SessionHandler> {
    resource_manager: Arc<ResourceManager<H>>,
    handler: S,
    entries: RwLock<HashMap<Xid, SessionEntry>>,
}

impl<H: ResourceHandler, S: SessionHandler> XaSession<H, S> {
    /// Creates a session over the given resource manager.
    pub fn new(resource_manager: Arc<ResourceManager<H>>, handler: S) -> Self {
        Self {
            resource_manager,
            handler,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the underlying resource manager.
    pub fn resource_manager(&self) -> &Arc<ResourceManager<H>> {
        &self.resource_manager
    }

    /// Returns the session handler.
    pub fn handler(&self) -> &S {
        &self.handler
    }

    /// Starts or resumes work on a transaction branch.
    ///
    /// With `XA_TMRESUME` the Xid must have a suspended entry, which is moved
    /// back to the active registry. A normal start creates and registers a
    /// fresh context, or re-associates a previously ended one; starting an
    /// Xid that is still associated fails.
    pub async fn start(&self, xid: &Xid, flags: i32) -> Result<()> {
        if flags & XA_TMRESUME != 0 {
            return self.resume(xid).await;
        }

        if self.try_reassociate(xid).await? {
            return Ok(());
        }

        // The hooks may block on I/O, so the entry lock is not held while
        // they run; starts for other Xids proceed in the meantime.
        let context = self.handler.create_transaction_context(xid).await;
        self.resource_manager
            .begin_transaction(&context)
            .await
            .map_err(|e| {
                XarmError::protocol(XAER_RMERR, format!("failed to begin transaction: {e}"))
            })?;

        let mut entries = self.entries.write().await;
        // A racing start for the same Xid may have inserted while the hooks
        // ran; its context wins.
        if let Some(entry) = entries.get_mut(xid) {
            if entry.associated {
                return Err(XarmError::protocol(
                    XAER_DUPID,
                    format!("transaction {xid} already started"),
                ));
            }
            entry.associated = true;
            return Ok(());
        }
        self.resource_manager
            .add_active_transactional_resource(xid.clone(), Arc::clone(&context))
            .await;
        entries.insert(
            xid.clone(),
            SessionEntry {
                context,
                associated: true,
            },
        );
        tracing::debug!(xid = %xid, "transaction branch started");
        Ok(())
    }

    /// Re-associates a tracked but ended entry. Returns false when the Xid
    /// is untracked and a fresh context is needed.
    async fn try_reassociate(&self, xid: &Xid) -> Result<bool> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(xid) {
            Some(entry) if entry.associated => Err(XarmError::protocol(
                XAER_DUPID,
                format!("transaction {xid} already started"),
            )),
            Some(entry) => {
                // Repeated start/end cycles within one unit of work.
                entry.associated = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resume(&self, xid: &Xid) -> Result<()> {
        let context = self
            .resource_manager
            .remove_suspended_transactional_resource(xid)
            .await
            .ok_or_else(|| {
                XarmError::protocol(
                    XAER_NOTA,
                    format!("no suspended transaction to resume for {xid}"),
                )
            })?;
        self.resource_manager
            .add_active_transactional_resource(xid.clone(), Arc::clone(&context))
            .await;
        self.entries.write().await.insert(
            xid.clone(),
            SessionEntry {
                context,
                associated: true,
            },
        );
        tracing::debug!(xid = %xid, "transaction branch resumed");
        Ok(())
    }

    /// Ends work on a transaction branch.
    ///
    /// `XA_TMSUSPEND` moves the context into the suspended registry;
    /// `XA_TMFAIL` marks it rollback-only and leaves the registries
    /// untouched; a normal end leaves the context active. In every case the
    /// Xid can be started again afterwards.
    pub async fn end(&self, xid: &Xid, flags: i32) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(xid)
            .filter(|entry| entry.associated)
            .ok_or_else(|| {
                XarmError::protocol(XAER_PROTO, format!("transaction {xid} was not started"))
            })?;

        if flags & XA_TMSUSPEND != 0 {
            self.resource_manager
                .add_suspended_transactional_resource(xid.clone(), Arc::clone(&entry.context))
                .await;
            self.resource_manager
                .remove_active_transactional_resource(xid)
                .await;
            tracing::debug!(xid = %xid, "transaction branch suspended");
        } else if flags & XA_TMFAIL != 0 {
            self.resource_manager
                .set_transaction_rollback_only(&entry.context);
            tracing::debug!(xid = %xid, "transaction branch marked rollback-only");
        }
        entry.associated = false;
        Ok(())
    }

    /// Runs the prepare phase for the branch.
    ///
    /// Looks the context up with the active-or-suspended fallback, so a
    /// suspended branch can still be prepared.
    pub async fn prepare(&self, xid: Option<&Xid>) -> Result<PrepareVote> {
        let xid = required_xid(xid)?;
        let context = self
            .resource_manager
            .get_transactional_resource(xid)
            .await
            .ok_or_else(|| {
                XarmError::protocol(XAER_NOTA, format!("no transaction context for {xid}"))
            })?;
        self.resource_manager.prepare_transaction(&context).await
    }

    /// Commits the branch.
    ///
    /// A missing local context is not a failure: the transaction manager may
    /// legitimately ask this session to commit a transaction it has no
    /// memory of, e.g. during recovery after a restart, and the dangling
    /// hook takes over.
    pub async fn commit(&self, xid: Option<&Xid>, one_phase: bool) -> Result<()> {
        let xid = required_xid(xid)?;
        let context = self
            .resource_manager
            .get_active_transactional_resource(xid)
            .await;
        match context {
            Some(context) => {
                self.resource_manager.commit_transaction(&context).await?;
                self.cleanup(xid).await;
                tracing::debug!(xid = %xid, one_phase, "transaction branch committed");
                Ok(())
            }
            None => {
                tracing::debug!(xid = %xid, "no local context, committing dangling transaction");
                self.handler.commit_dangling_transaction(xid, one_phase).await
            }
        }
    }

    /// Rolls the branch back, falling back to the dangling-transaction hook
    /// when no local context exists.
    pub async fn rollback(&self, xid: Option<&Xid>) -> Result<()> {
        let xid = required_xid(xid)?;
        let context = self
            .resource_manager
            .get_active_transactional_resource(xid)
            .await;
        match context {
            Some(context) => {
                self.resource_manager.rollback_transaction(&context).await?;
                self.cleanup(xid).await;
                tracing::debug!(xid = %xid, "transaction branch rolled back");
                Ok(())
            }
            None => {
                tracing::debug!(xid = %xid, "no local context, rolling back dangling transaction");
                self.handler.rollback_dangling_transaction(xid).await
            }
        }
    }

    /// Forgets a heuristically completed branch: removes it from both
    /// registries without commit or rollback semantics.
    pub async fn forget(&self, xid: &Xid) -> Result<()> {
        if self
            .resource_manager
            .get_transactional_resource(xid)
            .await
            .is_none()
        {
            return Err(XarmError::protocol(
                XAER_NOTA,
                format!("no transaction context for {xid}"),
            ));
        }
        self.cleanup(xid).await;
        tracing::debug!(xid = %xid, "transaction branch forgotten");
        Ok(())
    }

    /// Returns the Xids of prepared-but-unresolved branches.
    pub async fn recover(&self, flags: i32) -> Result<Vec<Xid>> {
        self.handler.recover(flags).await
    }

    /// Returns true if `other` is this session or shares the identical
    /// resource manager instance.
    pub fn is_same_rm(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || Arc::ptr_eq(&self.resource_manager, &other.resource_manager)
    }

    /// Returns the manager's default timeout in whole seconds, for XA
    /// protocol compatibility.
    pub fn transaction_timeout(&self) -> u64 {
        self.resource_manager.default_transaction_timeout().as_secs()
    }

    async fn cleanup(&self, xid: &Xid) {
        self.resource_manager
            .remove_suspended_transactional_resource(xid)
            .await;
        self.resource_manager
            .remove_active_transactional_resource(xid)
            .await;
        self.entries.write().await.remove(xid);
    }
}

fn required_xid(xid: Option<&Xid>) -> Result<&Xid> {
    xid.ok_or_else(|| XarmError::protocol(XAER_INVAL, "missing Xid"))
}
