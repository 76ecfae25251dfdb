//! Changing the retention policy of a running replication job.

use super::options::ResolvedOptions;
use crate::error::Result;
use crate::store::Txn;
use crate::tenant::TenantRecord;
use tracing::info;

/// Apply altered options to the tenant's replication job. Only the retention
/// TTL is alterable; progress, status and the protected timestamp record are
/// left untouched.
pub fn alter_tenant_options(
  txn: &mut Txn,
  tenant: &TenantRecord,
  options: &ResolvedOptions,
) -> Result<()> {
  let job_id = tenant.consumer_job()?;
  txn.update_job(job_id, |mut metadata| {
    let (details, _) = metadata.stream_ingestion_mut(job_id)?;
    if let Some(retention) = options.retention() {
      info!(job_id = %job_id, retention_ttl_seconds = retention, "updating replication retention");
      details.replication_ttl_seconds = retention;
    }
    Ok(metadata)
  })
}
