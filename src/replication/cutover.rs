//! Cutover: install the timestamp at which a replication stream stops and
//! the destination tenant becomes a standalone cluster.
//!
//! This only deposits the instruction in job progress. The ingestion worker
//! notices it, moves the job through `CuttingOver` to `Complete`, and callers
//! observe that by polling job state.

use crate::error::{ReplError, Result};
use crate::jobs::ReplicationStatus;
use crate::store::Txn;
use crate::tenant::TenantRecord;
use crate::types::{JobId, Timestamp};
use std::fmt;
use tracing::info;

/// Where to cut over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoverTarget {
  /// Whatever the job has replicated up to right now.
  Latest,
  At(Timestamp),
}

impl fmt::Display for CutoverTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CutoverTarget::Latest => write!(f, "LATEST"),
      CutoverTarget::At(ts) => write!(f, "{ts}"),
    }
  }
}

/// Install a cutover time on the tenant's replication job and return the
/// timestamp actually used. `Latest` resolves to the job's replicated time,
/// or to its start time if nothing has been replicated yet.
pub fn alter_tenant_job_cutover(
  txn: &mut Txn,
  tenant: &TenantRecord,
  target: CutoverTarget,
) -> Result<Timestamp> {
  let job_id = tenant.consumer_job()?;
  let job = txn.load_job(job_id)?;
  let details = job.stream_ingestion_details()?;
  let progress = job.stream_ingestion_progress()?;

  check_not_cut_over(job_id, progress.replication_status, progress.cutover_time)?;

  let cutover_time = match target {
    CutoverTarget::At(ts) => ts,
    CutoverTarget::Latest if progress.replicated_time.is_empty() => details.replication_start_time,
    CutoverTarget::Latest => progress.replicated_time,
  };

  let Some(record_id) = details.protected_timestamp_record_id else {
    return Err(ReplError::RetentionNotYetEstablished {
      name: tenant.name.to_string(),
      id: tenant.id,
    });
  };
  let record = txn.get_pts_record(record_id)?;
  if !record.protects(cutover_time) {
    return Err(ReplError::CutoverBeforeRetentionFloor {
      cutover_time,
      floor: record.timestamp,
    });
  }

  apply_cutover_time(txn, job_id, cutover_time)?;
  Ok(cutover_time)
}

/// Write the cutover instruction into job progress and unpause the job if it
/// is paused.
fn apply_cutover_time(txn: &mut Txn, job_id: JobId, cutover_time: Timestamp) -> Result<()> {
  info!(job_id = %job_id, cutover_time = %cutover_time, "adding cutover time to job record");
  txn.update_job(job_id, |mut metadata| {
    let (details, progress) = metadata.stream_ingestion_mut(job_id)?;
    check_not_cut_over(job_id, progress.replication_status, progress.cutover_time)?;

    progress.replication_status = ReplicationStatus::PendingCutover;
    progress.cutover_time = cutover_time;
    progress.remaining_cutover_spans = vec![details.span.clone()];
    Ok(metadata)
  })?;
  txn.unpause(job_id)
}

fn check_not_cut_over(
  job_id: JobId,
  status: ReplicationStatus,
  cutover_time: Timestamp,
) -> Result<()> {
  match status {
    ReplicationStatus::CuttingOver => Err(ReplError::CutoverAlreadyInProgress {
      job_id,
      cutover_time,
    }),
    ReplicationStatus::Complete => Err(ReplError::ReplicationAlreadyComplete {
      job_id,
      cutover_time,
    }),
    ReplicationStatus::Running | ReplicationStatus::PendingCutover => Ok(()),
  }
}
