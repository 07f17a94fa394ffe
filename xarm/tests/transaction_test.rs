//! Integration tests for the transaction façade.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use xarm::{
    BoundResource, HoldObject, PlatformTransaction, ResourceFactoryHolder, TransactionManager,
    XaResource, XaTransaction,
};
use xarm_core::constants::{XA_TMFAIL, XA_TMSUCCESS};
use xarm_core::{Result, TransactionStatus, XarmError};

/// Platform transaction whose status answers are scripted per poll.
struct ScriptedTransaction {
    statuses: Mutex<VecDeque<TransactionStatus>>,
    rollback_only_calls: Mutex<u32>,
    enlisted: Mutex<u32>,
    delisted: Mutex<Vec<i32>>,
}

impl ScriptedTransaction {
    fn new(statuses: Vec<TransactionStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            rollback_only_calls: Mutex::new(0),
            enlisted: Mutex::new(0),
            delisted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlatformTransaction for ScriptedTransaction {
    fn status(&self) -> Result<TransactionStatus> {
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.len() {
            0 => Ok(TransactionStatus::Active),
            1 => Ok(*statuses.front().unwrap()),
            _ => Ok(statuses.pop_front().unwrap()),
        }
    }

    fn set_rollback_only(&self) -> Result<()> {
        *self.rollback_only_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn enlist_resource(&self, _resource: Arc<dyn XaResource>) -> Result<bool> {
        *self.enlisted.lock().unwrap() += 1;
        Ok(true)
    }

    async fn delist_resource(&self, _resource: Arc<dyn XaResource>, flag: i32) -> Result<bool> {
        self.delisted.lock().unwrap().push(flag);
        Ok(true)
    }
}

/// Transaction manager recording the order of calls made against it.
struct RecordingManager {
    calls: Mutex<Vec<String>>,
    transaction: Arc<ScriptedTransaction>,
}

impl RecordingManager {
    fn new(transaction: Arc<ScriptedTransaction>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            transaction,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl TransactionManager for RecordingManager {
    async fn begin(&self) -> Result<()> {
        self.record("begin");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.record("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.record("rollback");
        Ok(())
    }

    async fn suspend(&self) -> Result<Arc<dyn PlatformTransaction>> {
        self.record("suspend");
        Ok(Arc::clone(&self.transaction) as Arc<dyn PlatformTransaction>)
    }

    async fn resume(&self, _transaction: Arc<dyn PlatformTransaction>) -> Result<()> {
        self.record("resume");
        Ok(())
    }

    fn set_transaction_timeout(&self, seconds: u64) -> Result<()> {
        self.record(format!("set_timeout({seconds})"));
        Ok(())
    }

    fn transaction(&self) -> Result<Option<Arc<dyn PlatformTransaction>>> {
        Ok(Some(
            Arc::clone(&self.transaction) as Arc<dyn PlatformTransaction>
        ))
    }
}

/// Transaction manager whose transaction lookup always fails.
struct FailingManager;

#[async_trait]
impl TransactionManager for FailingManager {
    async fn begin(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }

    async fn suspend(&self) -> Result<Arc<dyn PlatformTransaction>> {
        Err(XarmError::Transaction("nothing to suspend".to_string()))
    }

    async fn resume(&self, _transaction: Arc<dyn PlatformTransaction>) -> Result<()> {
        Ok(())
    }

    fn set_transaction_timeout(&self, _seconds: u64) -> Result<()> {
        Ok(())
    }

    fn transaction(&self) -> Result<Option<Arc<dyn PlatformTransaction>>> {
        Err(XarmError::Transaction("platform lookup failed".to_string()))
    }
}

/// Bound resource recording delist/close invocations.
#[derive(Default)]
struct TrackedResource {
    calls: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl BoundResource for TrackedResource {
    async fn delist(&self) -> Result<bool> {
        self.calls.lock().unwrap().push("delist");
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.calls.lock().unwrap().push("close");
        Ok(())
    }
}

struct TimeoutAwareResource {
    timeouts: Mutex<Vec<u64>>,
}

impl XaResource for TimeoutAwareResource {
    fn set_transaction_timeout(&self, seconds: u64) -> Result<bool> {
        self.timeouts.lock().unwrap().push(seconds);
        Ok(true)
    }
}

struct FactoryWrapper {
    hold: HoldObject,
}

impl ResourceFactoryHolder for FactoryWrapper {
    fn hold_object(&self) -> HoldObject {
        self.hold.clone()
    }
}

fn scripted(statuses: Vec<TransactionStatus>) -> (Arc<RecordingManager>, XaTransaction) {
    let manager = Arc::new(RecordingManager::new(Arc::new(ScriptedTransaction::new(
        statuses,
    ))));
    let tx = XaTransaction::new(Some(Arc::clone(&manager) as Arc<dyn TransactionManager>));
    (manager, tx)
}

#[tokio::test]
async fn test_begin_without_manager_is_illegal_state() {
    let tx = XaTransaction::new(None);
    let err = tx.begin().await.unwrap_err();
    assert!(matches!(err, XarmError::IllegalState(_)));
}

#[tokio::test]
async fn test_suspend_and_resume_without_manager_are_illegal_state() {
    let tx = XaTransaction::new(None);
    assert!(matches!(
        tx.suspend().await.unwrap_err(),
        XarmError::IllegalState(_)
    ));
    assert!(matches!(
        tx.resume().await.unwrap_err(),
        XarmError::IllegalState(_)
    ));
}

#[tokio::test]
async fn test_begin_sets_timeout_before_begin() {
    let (manager, tx) = scripted(vec![]);
    let tx = tx.with_timeout(Duration::from_secs(30));

    tx.begin().await.unwrap();

    assert_eq!(manager.calls(), vec!["set_timeout(30)", "begin"]);
}

#[tokio::test]
async fn test_begin_without_timeout_skips_timeout_call() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();
    assert_eq!(manager.calls(), vec!["begin"]);
}

#[tokio::test]
async fn test_timeout_milliseconds_truncate_to_seconds() {
    let (manager, tx) = scripted(vec![]);
    let tx = tx.with_timeout(Duration::from_millis(1500));
    tx.begin().await.unwrap();
    assert_eq!(manager.calls(), vec!["set_timeout(1)", "begin"]);
}

#[tokio::test]
async fn test_is_rollback_only_tracks_polled_status() {
    let (_manager, tx) = scripted(vec![
        TransactionStatus::Active,
        TransactionStatus::Committed,
        TransactionStatus::MarkedRollback,
        TransactionStatus::RolledBack,
        TransactionStatus::RollingBack,
    ]);
    tx.begin().await.unwrap();

    let mut observed = Vec::new();
    for _ in 0..5 {
        observed.push(tx.is_rollback_only().await.unwrap());
    }
    assert_eq!(observed, vec![false, false, true, true, true]);
}

#[tokio::test]
async fn test_status_without_transaction_is_no_transaction() {
    let tx = XaTransaction::new(None);
    assert_eq!(tx.status().await.unwrap(), TransactionStatus::NoTransaction);
}

#[tokio::test]
async fn test_set_rollback_only_without_transaction_is_illegal_state() {
    let tx = XaTransaction::new(None);
    let err = tx.set_rollback_only().await.unwrap_err();
    assert!(matches!(err, XarmError::IllegalState(_)));
}

#[tokio::test]
async fn test_set_rollback_only_delegates_to_platform_transaction() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();
    tx.set_rollback_only().await.unwrap();
    assert_eq!(*manager.transaction.rollback_only_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_delist_without_transaction_is_transaction_error() {
    let tx = XaTransaction::new(None);
    let resource = Arc::new(TimeoutAwareResource {
        timeouts: Mutex::new(Vec::new()),
    });
    let err = tx
        .delist_resource(resource, XA_TMSUCCESS)
        .await
        .unwrap_err();
    assert!(matches!(err, XarmError::Transaction(_)));
}

#[tokio::test]
async fn test_enlist_propagates_timeout_to_resource_first() {
    let (manager, tx) = scripted(vec![]);
    let tx = tx.with_timeout(Duration::from_secs(45));
    tx.begin().await.unwrap();

    let resource = Arc::new(TimeoutAwareResource {
        timeouts: Mutex::new(Vec::new()),
    });
    let enlisted = tx
        .enlist_resource(Arc::clone(&resource) as Arc<dyn XaResource>)
        .await
        .unwrap();

    assert!(enlisted);
    assert_eq!(*resource.timeouts.lock().unwrap(), vec![45]);
    assert_eq!(*manager.transaction.enlisted.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_status_wraps_manager_lookup_failure() {
    let tx = XaTransaction::new(Some(Arc::new(FailingManager) as Arc<dyn TransactionManager>));
    let err = tx.status().await.unwrap_err();
    assert!(matches!(err, XarmError::Status(_)));
}

#[tokio::test]
async fn test_commit_delists_enlisted_resources() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();

    let resource = Arc::new(TimeoutAwareResource {
        timeouts: Mutex::new(Vec::new()),
    });
    tx.enlist_resource(resource as Arc<dyn XaResource>)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        *manager.transaction.delisted.lock().unwrap(),
        vec![XA_TMSUCCESS]
    );

    // The list was consumed; a second commit has nothing to delist.
    tx.begin().await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(
        *manager.transaction.delisted.lock().unwrap(),
        vec![XA_TMSUCCESS]
    );
}

#[tokio::test]
async fn test_rollback_delists_enlisted_resources_as_failed() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();

    let resource = Arc::new(TimeoutAwareResource {
        timeouts: Mutex::new(Vec::new()),
    });
    tx.enlist_resource(resource as Arc<dyn XaResource>)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(
        *manager.transaction.delisted.lock().unwrap(),
        vec![XA_TMFAIL]
    );
}

#[tokio::test]
async fn test_commit_delists_then_closes_bound_resources() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();

    let underlying: Arc<dyn Any + Send + Sync> = Arc::new("connection".to_string());
    let holder = FactoryWrapper {
        hold: HoldObject::new(underlying),
    };
    let resource = Arc::new(TrackedResource::default());
    tx.bind_resource(&holder, Arc::clone(&resource) as Arc<dyn BoundResource>)
        .await;

    tx.commit().await.unwrap();

    assert_eq!(*resource.calls.lock().unwrap(), vec!["delist", "close"]);
    assert_eq!(manager.calls(), vec!["begin", "commit"]);
}

#[tokio::test]
async fn test_bind_resource_deduplicates_by_hold_object() {
    let (_manager, tx) = scripted(vec![]);

    let underlying: Arc<dyn Any + Send + Sync> = Arc::new(0u64);
    let first = FactoryWrapper {
        hold: HoldObject::new(Arc::clone(&underlying)),
    };
    let second = FactoryWrapper {
        hold: HoldObject::new(underlying),
    };

    let resource = Arc::new(TrackedResource::default());
    tx.bind_resource(&first, Arc::clone(&resource) as Arc<dyn BoundResource>)
        .await;

    // Two distinct wrappers over the same hold object resolve to one binding.
    assert!(tx.has_resource(&second).await);
    let found = tx.get_resource(&second).await.unwrap();
    found.delist().await.unwrap();
    assert_eq!(*resource.calls.lock().unwrap(), vec!["delist"]);
}

#[tokio::test]
async fn test_suspend_parks_and_resume_consumes() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();
    tx.suspend().await.unwrap();
    tx.resume().await.unwrap();
    assert_eq!(manager.calls(), vec!["begin", "suspend", "resume"]);

    // A second resume has nothing parked.
    assert!(matches!(
        tx.resume().await.unwrap_err(),
        XarmError::IllegalState(_)
    ));
}

#[tokio::test]
async fn test_rollback_closes_bound_resources() {
    let (manager, tx) = scripted(vec![]);
    tx.begin().await.unwrap();

    let holder = FactoryWrapper {
        hold: HoldObject::new(Arc::new(1u64)),
    };
    let resource = Arc::new(TrackedResource::default());
    tx.bind_resource(&holder, Arc::clone(&resource) as Arc<dyn BoundResource>)
        .await;

    tx.rollback().await.unwrap();

    assert_eq!(*resource.calls.lock().unwrap(), vec!["close"]);
    assert_eq!(manager.calls(), vec!["begin", "rollback"]);
}
