//! XA global transaction identifiers.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{Result, XarmError};

/// XA transaction identifier following the X/Open XA specification.
///
/// An Xid uniquely identifies a global transaction and one of its branches.
/// Xids are used as registry keys throughout the toolkit and compare by
/// their logical equality contract, never by object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Maximum length of a global transaction id.
    pub const MAXGTRIDSIZE: usize = 64;
    /// Maximum length of a branch qualifier.
    pub const MAXBQUALSIZE: usize = 64;

    /// Creates a new transaction identifier.
    ///
    /// # Panics
    ///
    /// Panics if `global_transaction_id` or `branch_qualifier` exceeds the
    /// maximum size.
    pub fn new(format_id: i32, global_transaction_id: &[u8], branch_qualifier: &[u8]) -> Self {
        assert!(
            global_transaction_id.len() <= Self::MAXGTRIDSIZE,
            "global transaction id exceeds maximum size of {} bytes",
            Self::MAXGTRIDSIZE
        );
        assert!(
            branch_qualifier.len() <= Self::MAXBQUALSIZE,
            "branch qualifier exceeds maximum size of {} bytes",
            Self::MAXBQUALSIZE
        );

        Self {
            format_id,
            global_transaction_id: global_transaction_id.to_vec(),
            branch_qualifier: branch_qualifier.to_vec(),
        }
    }

    /// Generates a new random Xid with format id 0 and an empty branch
    /// qualifier slot.
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        Self::new(0, uuid.as_bytes(), &[0u8; 8])
    }

    /// Returns the format identifier.
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Returns the global transaction identifier.
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Returns the branch qualifier.
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }

    /// Serializes the Xid into a length-prefixed little-endian byte form.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            4 + 4 + self.global_transaction_id.len() + 4 + self.branch_qualifier.len(),
        );
        buf.put_i32_le(self.format_id);
        buf.put_i32_le(self.global_transaction_id.len() as i32);
        buf.put_slice(&self.global_transaction_id);
        buf.put_i32_le(self.branch_qualifier.len() as i32);
        buf.put_slice(&self.branch_qualifier);
        buf.freeze()
    }

    /// Deserializes an Xid from its byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        if buf.remaining() < 8 {
            return Err(XarmError::Transaction("Xid data too short".to_string()));
        }
        let format_id = buf.get_i32_le();
        let gtrid_len = buf.get_i32_le() as usize;
        if gtrid_len > Self::MAXGTRIDSIZE || buf.remaining() < gtrid_len + 4 {
            return Err(XarmError::Transaction(
                "Xid data too short for global transaction id".to_string(),
            ));
        }
        let global_transaction_id = buf[..gtrid_len].to_vec();
        buf.advance(gtrid_len);
        let bqual_len = buf.get_i32_le() as usize;
        if bqual_len > Self::MAXBQUALSIZE || buf.remaining() < bqual_len {
            return Err(XarmError::Transaction(
                "Xid data too short for branch qualifier".to_string(),
            ));
        }
        let branch_qualifier = buf[..bqual_len].to_vec();

        Ok(Self {
            format_id,
            global_transaction_id,
            branch_qualifier,
        })
    }
}

impl Default for Xid {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for byte in &self.global_transaction_id {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(":")?;
        for byte in &self.branch_qualifier {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
