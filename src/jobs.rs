//! Replication job records.
//!
//! A job carries a generic scheduler status plus a typed payload (details,
//! including the mutable retention policy) and typed progress. The control
//! plane only ever changes payload and progress through
//! [`crate::store::Txn::update_job`], which applies a pure transformation to
//! a copy of [`JobMetadata`].

use crate::error::{ReplError, Result};
use crate::streamclient::StreamAddress;
use crate::types::{JobId, PtsRecordId, Span, TenantId, TenantName, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduler-level status. Transitions other than pause/unpause belong to
/// the external job runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
  Running,
  PauseRequested,
  Paused,
  Succeeded,
  Failed,
  Canceled,
}

impl JobStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
    )
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      JobStatus::Running => "running",
      JobStatus::PauseRequested => "pause-requested",
      JobStatus::Paused => "paused",
      JobStatus::Succeeded => "succeeded",
      JobStatus::Failed => "failed",
      JobStatus::Canceled => "canceled",
    };
    write!(f, "{value}")
  }
}

/// Replication-specific state machine. Only moves forward, except when a
/// failback replaces the job entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReplicationStatus {
  #[default]
  Running,
  PendingCutover,
  CuttingOver,
  Complete,
}

impl fmt::Display for ReplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      ReplicationStatus::Running => "replicating",
      ReplicationStatus::PendingCutover => "pending cutover",
      ReplicationStatus::CuttingOver => "cutting over",
      ReplicationStatus::Complete => "complete",
    };
    write!(f, "{value}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamIngestionDetails {
  pub source_address: StreamAddress,
  pub source_tenant_name: TenantName,
  pub destination_tenant_id: TenantId,
  pub span: Span,
  pub replication_start_time: Timestamp,
  pub replication_ttl_seconds: i32,
  pub protected_timestamp_record_id: Option<PtsRecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreamIngestionProgress {
  pub replication_status: ReplicationStatus,
  pub cutover_time: Timestamp,
  pub remaining_cutover_spans: Vec<Span>,
  /// High water: everything at or below this time has been applied.
  pub replicated_time: Timestamp,
  /// Roll the destination back to `initial_revert_to` before streaming.
  pub initial_revert_required: bool,
  pub initial_revert_to: Timestamp,
}

/// Source-side job serving a replication stream to another cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProducerDetails {
  pub tenant_id: TenantId,
  pub expiration_window_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPayload {
  StreamIngestion(StreamIngestionDetails),
  StreamProducer(StreamProducerDetails),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobProgress {
  StreamIngestion(StreamIngestionProgress),
  StreamProducer,
}

/// The mutable parts of a job, handed to update closures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
  pub payload: JobPayload,
  pub progress: JobProgress,
}

impl JobMetadata {
  pub fn stream_ingestion_mut(
    &mut self,
    job_id: JobId,
  ) -> Result<(&mut StreamIngestionDetails, &mut StreamIngestionProgress)> {
    match (&mut self.payload, &mut self.progress) {
      (JobPayload::StreamIngestion(details), JobProgress::StreamIngestion(progress)) => {
        Ok((details, progress))
      }
      _ => Err(ReplError::NotStreamIngestionJob(job_id)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
  pub id: JobId,
  pub status: JobStatus,
  pub pause_reason: Option<String>,
  pub description: String,
  pub metadata: JobMetadata,
}

impl Job {
  pub fn stream_ingestion_details(&self) -> Result<&StreamIngestionDetails> {
    match &self.metadata.payload {
      JobPayload::StreamIngestion(details) => Ok(details),
      _ => Err(ReplError::NotStreamIngestionJob(self.id)),
    }
  }

  pub fn stream_ingestion_progress(&self) -> Result<&StreamIngestionProgress> {
    match &self.metadata.progress {
      JobProgress::StreamIngestion(progress) => Ok(progress),
      _ => Err(ReplError::NotStreamIngestionJob(self.id)),
    }
  }
}

/// Everything needed to create a new stream ingestion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationJobSpec {
  pub job_id: JobId,
  pub source_address: StreamAddress,
  pub source_tenant_name: TenantName,
  pub destination_tenant_id: TenantId,
  pub retention_ttl_seconds: i32,
  pub start_time: Timestamp,
  pub revert_first: bool,
  pub description: String,
}

impl ReplicationJobSpec {
  pub fn into_job(self) -> Job {
    let details = StreamIngestionDetails {
      source_address: self.source_address,
      source_tenant_name: self.source_tenant_name,
      destination_tenant_id: self.destination_tenant_id,
      span: Span::for_tenant(self.destination_tenant_id),
      replication_start_time: self.start_time,
      replication_ttl_seconds: self.retention_ttl_seconds,
      protected_timestamp_record_id: None,
    };
    let progress = StreamIngestionProgress {
      initial_revert_required: self.revert_first,
      initial_revert_to: if self.revert_first {
        self.start_time
      } else {
        Timestamp::EMPTY
      },
      ..StreamIngestionProgress::default()
    };

    Job {
      id: self.job_id,
      status: JobStatus::Running,
      pause_reason: None,
      description: self.description,
      metadata: JobMetadata {
        payload: JobPayload::StreamIngestion(details),
        progress: JobProgress::StreamIngestion(progress),
      },
    }
  }
}
