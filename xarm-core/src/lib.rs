//! Core types for the xarm XA transaction toolkit.
//!
//! This crate holds the pieces shared by every layer of the toolkit: the
//! [`Xid`] global transaction identifier, the [`TransactionStatus`] code set,
//! the X/Open XA protocol constants, and the [`XarmError`] error taxonomy.

#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod status;
pub mod xid;

pub use error::{Result, XarmError};
pub use status::TransactionStatus;
pub use xid::Xid;
