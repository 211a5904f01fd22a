//! Digest computation over canonical bytes.

use crate::canonical::{encode, Value};
use crate::errors::Result;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of a value's canonical encoding.
///
/// ## Returns
///
/// Hex-encoded SHA-256 digest (64 lowercase characters)
///
/// ## Errors
///
/// Returns `EvtrailError::UnencodableValue` if the value cannot be
/// canonicalized.
///
/// ## Example
///
/// ```
/// use evtrail_core::canonical::{Map, Value};
/// use evtrail_core::evidence::hash;
///
/// let digest = hash(&Value::from(Map::new().with("a", 1))).unwrap();
/// assert_eq!(digest.len(), 64);
/// ```
pub fn hash(value: &Value) -> Result<String> {
    let bytes = encode(value)?;
    Ok(hash_bytes(&bytes))
}

/// Hash raw bytes using SHA-256.
pub(crate) fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
