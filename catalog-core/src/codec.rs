//! Cache codec for records.
//!
//! Records are stored in the cache as UTF-8 JSON, field for field. The image
//! reference is always written: an absent image encodes as `null` and an
//! empty one as `""`, so the two stay distinguishable after a round trip.

use crate::{CacheError, Record};

/// Serialize a record for storage under `key`.
pub fn encode_record(key: &str, record: &Record) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(record).map_err(|e| CacheError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Reconstruct a record previously written by [`encode_record`].
pub fn decode_record(key: &str, bytes: &[u8]) -> Result<Record, CacheError> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
