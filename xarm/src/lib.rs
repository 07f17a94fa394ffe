//! Embeddable XA-style transaction resource manager.
//!
//! This crate implements the coordination core of a distributed-transaction
//! resource manager: per-transaction state machines, concurrent registries
//! of active and suspended transaction contexts keyed by [`Xid`], and
//! two-phase-commit orchestration with XA suspend/resume, rollback-only
//! propagation, and dangling-transaction recovery.
//!
//! The resource-specific work lives behind two hook traits:
//! [`ResourceHandler`] for the 2PC phases and [`SessionHandler`] for context
//! creation and recovery. Implement them for your resource (a store, a
//! queue, a connection pool) and drive the protocol through an
//! [`XaSession`]:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xarm::{ResourceManager, ResourceManagerConfig, XaSession};
//! use xarm_core::constants::{XA_TMNOFLAGS, XA_TMSUCCESS};
//! use xarm_core::Xid;
//!
//! let rm = Arc::new(ResourceManager::new(MyHandler::new(), ResourceManagerConfig::default()));
//! rm.start();
//! let session = XaSession::new(Arc::clone(&rm), MySessionHandler::new());
//!
//! let xid = Xid::generate();
//! session.start(&xid, XA_TMNOFLAGS).await?;
//! // ... perform resource work ...
//! session.end(&xid, XA_TMSUCCESS).await?;
//! session.prepare(Some(&xid)).await?;
//! session.commit(Some(&xid), false).await?;
//! ```
//!
//! Applications that sit on top of an external platform transaction manager
//! use the [`XaTransaction`] façade instead, which bridges begin/commit/
//! rollback/suspend/resume and tracks enlisted and bound resources.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod manager;
pub mod resource;
pub mod session;
pub mod transaction;

pub use config::{ResourceManagerConfig, ResourceManagerConfigBuilder};
pub use context::{PrepareVote, TransactionContext, XaTransactionContext};
pub use manager::{ResourceHandler, ResourceManager};
pub use resource::{BoundResource, HoldObject, ResourceFactoryHolder};
pub use session::{SessionHandler, XaSession};
pub use transaction::{PlatformTransaction, TransactionManager, XaResource, XaTransaction};

pub use xarm_core::{Result, TransactionStatus, XarmError, Xid};
