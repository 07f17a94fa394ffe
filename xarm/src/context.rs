//! Per-transaction state holders.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use xarm_core::constants::{XA_OK, XA_RDONLY};
use xarm_core::TransactionStatus;

use crate::resource::{BoundResource, HoldObject, ResourceFactoryHolder};

/// Per-transaction state holder.
///
/// Records the transaction status and a `finished` flag. The two are
/// deliberately decoupled: a context can be "preparing, finished" when its
/// caller abandoned it early. Status transitions are not validated here;
/// legality is the resource manager's responsibility, enforced by driving
/// the context only at well-defined protocol points.
#[derive(Debug)]
pub struct TransactionContext {
    status: AtomicI32,
    finished: AtomicBool,
}

impl TransactionContext {
    /// Creates a context in the `active` state.
    pub fn new() -> Self {
        Self {
            status: AtomicI32::new(TransactionStatus::Active.code()),
            finished: AtomicBool::new(false),
        }
    }

    /// Returns the current status, mapping unrecognized codes onto
    /// [`TransactionStatus::Undefined`].
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_code(self.status_code())
    }

    /// Returns the raw status code.
    pub fn status_code(&self) -> i32 {
        self.status.load(Ordering::SeqCst)
    }

    /// Unconditionally overwrites the status.
    pub fn set_status(&self, status: TransactionStatus) {
        self.set_status_code(status.code());
    }

    /// Unconditionally overwrites the status with a raw code.
    pub fn set_status_code(&self, code: i32) {
        self.status.store(code, Ordering::SeqCst);
    }

    /// Marks terminal processing as complete. Does not change the status and
    /// may be called in any state.
    pub fn notify_finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`TransactionContext::notify_finish`] has fired.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "readonly" is a fixed display flag, rendered whether or not any
        // resource was modified.
        write!(f, "[{}, readonly", self.status())?;
        if self.is_finished() {
            f.write_str(", finished")?;
        }
        f.write_str("]")
    }
}

/// The vote recorded by the prepare phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareVote {
    /// The branch did no work that needs the commit phase.
    ReadOnly,
    /// The branch needs the commit phase.
    Commit,
}

impl PrepareVote {
    /// Returns the XA wire code for this vote.
    pub fn code(&self) -> i32 {
        match self {
            Self::ReadOnly => XA_RDONLY,
            Self::Commit => XA_OK,
        }
    }
}

/// Sentinel stored before any vote has been recorded.
const VOTE_NONE: i32 = -1;

/// Transaction context with XA-specific bookkeeping.
///
/// On top of the base status tracking this carries the resources bound to
/// the transaction, deduplicated by hold object, and the outcome of the
/// prepare phase.
pub struct XaTransactionContext {
    transaction: TransactionContext,
    bound_resources: Mutex<HashMap<HoldObject, Arc<dyn BoundResource>>>,
    prepare_vote: AtomicI32,
}

impl fmt::Debug for XaTransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaTransactionContext")
            .field("transaction", &self.transaction)
            .field("prepare_vote", &self.prepare_vote)
            .finish_non_exhaustive()
    }
}

impl XaTransactionContext {
    /// Creates an XA context in the `active` state with no bound resources.
    pub fn new() -> Self {
        Self {
            transaction: TransactionContext::new(),
            bound_resources: Mutex::new(HashMap::new()),
            prepare_vote: AtomicI32::new(VOTE_NONE),
        }
    }

    /// Returns the base transaction context.
    pub fn transaction(&self) -> &TransactionContext {
        &self.transaction
    }

    /// Binds a resource under the holder's hold object. Binding through a
    /// different wrapper over the same hold object replaces the same slot.
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

    /// Returns all bound resources.
    pub async fn bound_resources(&self) -> Vec<Arc<dyn BoundResource>> {
        self.bound_resources.lock().await.values().cloned().collect()
    }

    /// Records the outcome of the prepare phase.
    pub fn set_prepare_vote(&self, vote: PrepareVote) {
        self.prepare_vote.store(vote.code(), Ordering::SeqCst);
    }

    /// Returns the recorded prepare vote, if the prepare phase has run.
    pub fn prepare_vote(&self) -> Option<PrepareVote> {
        match self.prepare_vote.load(Ordering::SeqCst) {
            VOTE_NONE => None,
            XA_RDONLY => Some(PrepareVote::ReadOnly),
            _ => Some(PrepareVote::Commit),
        }
    }
}

impl Default for XaTransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for XaTransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.transaction.fmt(f)
    }
}
