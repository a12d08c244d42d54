//! Object identifier.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of an object id in bytes.
pub const OID_LEN: usize = 32;

/// Content-derived identifier of an immutable object.
///
/// Object ids are SHA-256 digests of an object's canonical encoding:
/// - Equal content always yields an equal id
/// - Immutable once computed
/// - Equality is byte equality
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; OID_LEN]);

impl ObjectId {
    /// Creates an object id from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }

    /// Computes the id of the given canonical encoding.
    #[must_use]
    pub fn digest(encoded: &[u8]) -> Self {
        let hash = Sha256::digest(encoded);
        let mut bytes = [0u8; OID_LEN];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Returns the full lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the abbreviated hex form used in log output.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(8);
        s
    }

    /// Parses a 64 character hex string.
    pub fn from_hex(s: &str) -> StoreResult<Self> {
        let mut bytes = [0u8; OID_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| StoreError::InvalidObjectId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl From<[u8; OID_LEN]> for ObjectId {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}
