//! Failback: start replicating into a tenant that was itself the
//! destination of a completed replication stream, from the tenant that used
//! to be its destination.
//!
//! The remote tenant must report that it was replicated from exactly this
//! cluster and tenant. The new job first reverts the local tenant to the
//! remote's resume timestamp, the last point both sides agree on, and then
//! streams forward from there.

use super::ReplicationContext;
use crate::error::{ReplError, Result};
use crate::jobs::ReplicationJobSpec;
use crate::store::Txn;
use crate::streamclient::{with_stream_client, StreamAddress};
use crate::tenant::{DataState, ServiceMode, TenantRecord};
use crate::types::{JobId, ReplicationOrigin, TenantName, Timestamp};
use tracing::info;

/// Remote end of a replication stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSource {
  /// Address of the remote cluster, URL-shaped.
  pub address: String,
  pub tenant: TenantName,
}

/// Re-point an offline tenant to replicate from `source`. The tenant record
/// update and the new job are written in the caller's transaction, so they
/// commit together or not at all. Returns the new job's ID.
pub fn alter_tenant_restart_replication(
  ctx: &ReplicationContext<'_>,
  txn: &mut Txn,
  tenant: &TenantRecord,
  source: &ReplicationSource,
  retention_ttl_seconds: i32,
) -> Result<JobId> {
  // Replicating into a tenant requires that it is offline; its data is
  // about to be rewound.
  if tenant.service_mode != ServiceMode::None {
    return Err(ReplError::TenantNotOffline {
      name: tenant.name.to_string(),
      id: tenant.id,
      mode: tenant.service_mode.to_string(),
      required: ServiceMode::None.to_string(),
    });
  }

  let address = StreamAddress::parse(&source.address)?;

  let prior = with_stream_client(ctx.stream_clients, &address, |client| {
    client
      .prior_replication_details(&source.tenant)
      .map_err(ReplError::PriorReplicationDetails)
  })?;

  let expected = ReplicationOrigin::new(ctx.settings.cluster_id, tenant.id).to_string();
  if prior.origin_id != expected {
    return Err(ReplError::ReplicationOriginMismatch {
      source_tenant: source.tenant.to_string(),
      expected,
      actual: prior.origin_id,
    });
  }

  let job_id = txn.make_job_id();
  let mut updated = tenant.clone();
  updated.last_revert_tenant_timestamp = Timestamp::EMPTY;
  updated.physical_replication_consumer_job_id = Some(job_id);
  updated.data_state = DataState::Add;
  txn.update_tenant_record(&updated)?;

  info!(
    tenant = %tenant.name,
    job_id = %job_id,
    source = %address,
    resume_timestamp = %prior.resume_timestamp,
    "restarting replication in reverse direction"
  );

  let description = format!(
    "ALTER VIRTUAL CLUSTER {} START REPLICATION OF {} ON '{}'",
    tenant.name, source.tenant, address
  );
  ctx.job_creator.create_replication_job(
    txn,
    ReplicationJobSpec {
      job_id,
      source_address: address,
      source_tenant_name: source.tenant.clone(),
      destination_tenant_id: tenant.id,
      retention_ttl_seconds,
      start_time: prior.resume_timestamp,
      revert_first: true,
      description,
    },
  )?;

  Ok(job_id)
}
