//! Creation of stream ingestion jobs.

use crate::error::Result;
use crate::jobs::ReplicationJobSpec;
use crate::store::Txn;
use crate::tenant::TenantSpec;
use tracing::info;

/// Creates the replication job for a destination tenant inside the caller's
/// transaction.
pub trait ReplicationJobCreator: Send + Sync {
  fn create_replication_job(&self, txn: &mut Txn, spec: ReplicationJobSpec) -> Result<()>;
}

/// Writes the new job straight into the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreJobCreator;

impl ReplicationJobCreator for StoreJobCreator {
  fn create_replication_job(&self, txn: &mut Txn, spec: ReplicationJobSpec) -> Result<()> {
    let tenant = txn.lookup_tenant(&TenantSpec::Id(spec.destination_tenant_id))?;
    info!(
      job_id = %spec.job_id,
      tenant = %tenant.name,
      source = %spec.source_address,
      source_tenant = %spec.source_tenant_name,
      start_time = %spec.start_time,
      revert_first = spec.revert_first,
      "creating replication job"
    );
    txn.create_job(spec.into_job())
  }
}
