//! Error types for replication control operations.

use crate::streamclient::StreamClientError;
use crate::types::{JobId, NodeId, PtsRecordId, TenantId, Timestamp};
use thiserror::Error;

/// Broad classes of failure, used by callers deciding whether a retry of the
/// whole operation is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Current state does not permit the operation.
  Precondition,
  /// Caller-supplied input is malformed or out of range.
  Validation,
  /// A referenced record does not exist.
  NotFound,
  /// The operation would risk data loss or misdirected replication.
  Safety,
  /// Infrastructure failure; the whole operation may be retried.
  Transient,
  /// Caller contract violation or corrupted durable state.
  Assertion,
}

#[derive(Debug, Error)]
pub enum ReplError {
  #[error(
    "physical replication is disabled (hint: enable it with the `physical_replication.enabled` setting)"
  )]
  ReplicationDisabled,

  #[error("only the system tenant can alter tenant")]
  InsufficientPrivilege,

  #[error("resume timestamp cannot be altered")]
  ResumeTimestampNotAlterable,

  #[error(
    "cannot start replication for tenant {name:?} ({id}) in service mode {mode}; service mode must be {required}"
  )]
  TenantNotOffline {
    name: String,
    id: TenantId,
    mode: String,
    required: String,
  },

  #[error("tenant {name:?} ({id}) does not have an active replication job")]
  NoActiveJob { name: String, id: TenantId },

  #[error("job {job_id} already started cutting over to timestamp {cutover_time}")]
  CutoverAlreadyInProgress {
    job_id: JobId,
    cutover_time: Timestamp,
  },

  #[error("job {job_id} already completed cutover to timestamp {cutover_time}")]
  ReplicationAlreadyComplete {
    job_id: JobId,
    cutover_time: Timestamp,
  },

  #[error("unsupported job command in ALTER VIRTUAL CLUSTER REPLICATION: {0}")]
  UnsupportedCommand(String),

  #[error("job {job_id} with status {status} cannot be resumed")]
  JobNotResumable { job_id: JobId, status: String },

  #[error("job {job_id} with status {status} cannot be paused")]
  JobNotPausable { job_id: JobId, status: String },

  #[error("job {0} already exists")]
  JobAlreadyExists(JobId),

  #[error("invalid replication source address: {0}")]
  AddressInvalid(String),

  #[error("retention should result in a number of seconds between 0 and {max}: {reason}")]
  RetentionRangeInvalid { max: i32, reason: String },

  #[error("invalid timestamp: {0}")]
  InvalidTimestamp(String),

  #[error("invalid tenant id: {0}")]
  InvalidTenantId(String),

  #[error("invalid tenant record: {0}")]
  InvalidTenantRecord(String),

  #[error("tenant {0} does not exist")]
  TenantNotFound(String),

  #[error("job {0} not found")]
  JobNotFound(JobId),

  #[error("protected timestamp record {0} not found")]
  ProtectedTimestampNotFound(PtsRecordId),

  #[error("cutover time {cutover_time} is before earliest safe cutover time {floor}")]
  CutoverBeforeRetentionFloor {
    cutover_time: Timestamp,
    floor: Timestamp,
  },

  #[error("replicated tenant {name:?} ({id}) has not yet recorded a retained timestamp")]
  RetentionNotYetEstablished { name: String, id: TenantId },

  #[error(
    "tenant {source_tenant:?} on specified cluster reports it was replicated from {actual:?}; {expected:?} cannot be rewound to start replication"
  )]
  ReplicationOriginMismatch {
    source_tenant: String,
    expected: String,
    actual: String,
  },

  #[error("creating stream client for {address}: {source}")]
  SourceUnreachable {
    address: String,
    #[source]
    source: StreamClientError,
  },

  #[error("fetching prior replication details: {0}")]
  PriorReplicationDetails(#[source] StreamClientError),

  #[error("closing stream client: {0}")]
  StreamClientClose(#[source] StreamClientError),

  #[error("n{0} required, but unavailable")]
  NodeUnavailable(NodeId),

  #[error("job with id {0} is not a stream ingestion job")]
  NotStreamIngestionJob(JobId),

  #[error("invariant violation: {0}")]
  InvariantViolation(String),

  #[error("serialization error: {0}")]
  Serialization(String),

  #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
  CrcMismatch { stored: u32, computed: u32 },

  #[error("version mismatch: found {required}, supported {current}")]
  VersionMismatch { required: u32, current: u32 },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ReplError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ReplError::ReplicationDisabled
      | ReplError::InsufficientPrivilege
      | ReplError::ResumeTimestampNotAlterable
      | ReplError::TenantNotOffline { .. }
      | ReplError::NoActiveJob { .. }
      | ReplError::CutoverAlreadyInProgress { .. }
      | ReplError::ReplicationAlreadyComplete { .. }
      | ReplError::UnsupportedCommand(_)
      | ReplError::JobNotResumable { .. }
      | ReplError::JobNotPausable { .. }
      | ReplError::JobAlreadyExists(_) => ErrorKind::Precondition,
      ReplError::AddressInvalid(_)
      | ReplError::RetentionRangeInvalid { .. }
      | ReplError::InvalidTimestamp(_)
      | ReplError::InvalidTenantId(_)
      | ReplError::InvalidTenantRecord(_) => ErrorKind::Validation,
      ReplError::TenantNotFound(_)
      | ReplError::JobNotFound(_)
      | ReplError::ProtectedTimestampNotFound(_) => ErrorKind::NotFound,
      ReplError::CutoverBeforeRetentionFloor { .. }
      | ReplError::RetentionNotYetEstablished { .. }
      | ReplError::ReplicationOriginMismatch { .. } => ErrorKind::Safety,
      ReplError::SourceUnreachable { .. }
      | ReplError::PriorReplicationDetails(_)
      | ReplError::StreamClientClose(_)
      | ReplError::NodeUnavailable(_)
      | ReplError::Io(_) => ErrorKind::Transient,
      ReplError::NotStreamIngestionJob(_)
      | ReplError::InvariantViolation(_)
      | ReplError::Serialization(_)
      | ReplError::CrcMismatch { .. }
      | ReplError::VersionMismatch { .. } => ErrorKind::Assertion,
    }
  }

  /// Only transient failures are worth retrying, and only as a whole
  /// operation in a fresh transaction.
  pub fn is_retryable(&self) -> bool {
    self.kind() == ErrorKind::Transient
  }
}

pub type Result<T> = std::result::Result<T, ReplError>;
