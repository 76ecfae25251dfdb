//! Protected timestamp records.
//!
//! A record guarantees that garbage collection keeps every revision of its
//! target span at or above its timestamp. Records are written by the
//! ingestion worker; the control plane only reads them.

use crate::types::{JobId, PtsRecordId, Span, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedTimestampRecord {
  pub id: PtsRecordId,
  pub timestamp: Timestamp,
  pub target: Span,
  /// Job owning the record.
  pub job_id: JobId,
}

impl ProtectedTimestampRecord {
  pub fn new(job_id: JobId, timestamp: Timestamp, target: Span) -> Self {
    Self {
      id: PtsRecordId::new_random(),
      timestamp,
      target,
      job_id,
    }
  }

  /// Whether data as of `ts` is guaranteed to still be readable.
  pub fn protects(&self, ts: Timestamp) -> bool {
    ts >= self.timestamp
  }
}
