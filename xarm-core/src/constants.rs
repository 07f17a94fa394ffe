//! X/Open XA protocol constants.
//!
//! Flag, vote, and error code values are numerically identical to the
//! X/Open XA specification so that Xids and outcomes can be exchanged with
//! any other XA-compliant participant.

// ============================================================================
// XA Flags
// ============================================================================

/// No flags set.
pub const XA_TMNOFLAGS: i32 = 0x0000_0000;

/// Caller is joining an existing transaction branch.
pub const XA_TMJOIN: i32 = 0x0020_0000;

/// Caller is resuming association with a suspended transaction branch.
pub const XA_TMRESUME: i32 = 0x0800_0000;

/// Dissociate caller from the transaction branch, work completed.
pub const XA_TMSUCCESS: i32 = 0x0400_0000;

/// Dissociate caller from the transaction branch, work failed.
pub const XA_TMFAIL: i32 = 0x2000_0000;

/// Caller is suspending (not ending) its association with the branch.
pub const XA_TMSUSPEND: i32 = 0x0200_0000;

/// Start a recovery scan.
pub const XA_TMSTARTRSCAN: i32 = 0x0100_0000;

/// End a recovery scan.
pub const XA_TMENDRSCAN: i32 = 0x0080_0000;

/// Use the one-phase commit optimization.
pub const XA_TMONEPHASE: i32 = 0x4000_0000;

// ============================================================================
// XA Votes
// ============================================================================

/// Normal execution; the branch needs the commit phase.
pub const XA_OK: i32 = 0;

/// The branch was read-only and has already been committed.
pub const XA_RDONLY: i32 = 3;

// ============================================================================
// XA Error Codes
// ============================================================================

/// Asynchronous operation already outstanding.
pub const XAER_ASYNC: i32 = -2;

/// A resource manager error occurred in the transaction branch.
pub const XAER_RMERR: i32 = -3;

/// The Xid is not valid (no such transaction).
pub const XAER_NOTA: i32 = -4;

/// Invalid arguments were given.
pub const XAER_INVAL: i32 = -5;

/// The routine was invoked in an improper context.
pub const XAER_PROTO: i32 = -6;

/// The resource manager is unavailable.
pub const XAER_RMFAIL: i32 = -7;

/// The Xid already exists.
pub const XAER_DUPID: i32 = -8;

/// The resource manager is doing work outside a global transaction.
pub const XAER_OUTSIDE: i32 = -9;
