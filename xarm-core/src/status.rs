//! Transaction status codes.

use std::fmt;

/// The status of a distributed transaction, mirroring the standard
/// distributed-transaction status codes.
///
/// Status codes travel as raw integers between participants; any code this
/// crate does not recognize maps onto [`TransactionStatus::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// The transaction is active.
    Active,
    /// The transaction has been marked rollback-only and can no longer commit.
    MarkedRollback,
    /// The transaction has voted and is awaiting the commit decision.
    Prepared,
    /// The transaction has been committed.
    Committed,
    /// The transaction has been rolled back.
    RolledBack,
    /// The outcome of the transaction is unknown.
    Unknown,
    /// No transaction is associated with the current context.
    NoTransaction,
    /// The transaction is collecting votes.
    Preparing,
    /// The transaction is in the second commit phase.
    Committing,
    /// The transaction is rolling back.
    RollingBack,
    /// Catch-all for unrecognized status codes.
    Undefined,
}

impl TransactionStatus {
    /// Maps a raw status code onto a status, returning
    /// [`TransactionStatus::Undefined`] for unrecognized codes.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Active,
            1 => Self::MarkedRollback,
            2 => Self::Prepared,
            3 => Self::Committed,
            4 => Self::RolledBack,
            5 => Self::Unknown,
            6 => Self::NoTransaction,
            7 => Self::Preparing,
            8 => Self::Committing,
            9 => Self::RollingBack,
            _ => Self::Undefined,
        }
    }

    /// Returns the raw status code, or `-1` for
    /// [`TransactionStatus::Undefined`].
    pub fn code(&self) -> i32 {
        match self {
            Self::Active => 0,
            Self::MarkedRollback => 1,
            Self::Prepared => 2,
            Self::Committed => 3,
            Self::RolledBack => 4,
            Self::Unknown => 5,
            Self::NoTransaction => 6,
            Self::Preparing => 7,
            Self::Committing => 8,
            Self::RollingBack => 9,
            Self::Undefined => -1,
        }
    }

    /// Returns the lowercase display name of this status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::MarkedRollback => "marked rollback",
            Self::Prepared => "prepared",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Unknown => "unknown",
            Self::NoTransaction => "no transaction",
            Self::Preparing => "preparing",
            Self::Committing => "committing",
            Self::RollingBack => "rolling back",
            Self::Undefined => "undefined status",
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
