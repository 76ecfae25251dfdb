//! Entry point for `ALTER VIRTUAL CLUSTER ... REPLICATION` requests.

use super::command::{alter_job_command, JobCommand};
use super::cutover::{alter_tenant_job_cutover, CutoverTarget};
use super::failback::{alter_tenant_restart_replication, ReplicationSource};
use super::options::ReplicationOptions;
use super::retention::alter_tenant_options;
use super::ReplicationContext;
use crate::error::{ReplError, Result};
use crate::store::Txn;
use crate::tenant::TenantSpec;
use crate::types::Timestamp;

/// One alter request. At most one of `source`, `cutover`, non-default
/// `options` or `command` takes effect, in that order of precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterReplication {
  pub tenant: TenantSpec,
  pub source: Option<ReplicationSource>,
  pub cutover: Option<CutoverTarget>,
  pub options: ReplicationOptions,
  pub command: Option<JobCommand>,
}

impl AlterReplication {
  pub fn new(tenant: impl Into<TenantSpec>) -> Self {
    Self {
      tenant: tenant.into(),
      source: None,
      cutover: None,
      options: ReplicationOptions::default(),
      command: None,
    }
  }

  pub fn cutover(mut self, target: CutoverTarget) -> Self {
    self.cutover = Some(target);
    self
  }

  pub fn options(mut self, options: ReplicationOptions) -> Self {
    self.options = options;
    self
  }

  pub fn command(mut self, command: JobCommand) -> Self {
    self.command = Some(command);
    self
  }

  pub fn start_replication_from(mut self, source: ReplicationSource) -> Self {
    self.source = Some(source);
    self
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlterOutcome {
  /// Set only for cutover requests: the resolved cutover time.
  pub cutover_time: Option<Timestamp>,
}

/// Validate and execute an alter request inside `txn`.
pub fn alter_replication(
  ctx: &ReplicationContext<'_>,
  txn: &mut Txn,
  request: &AlterReplication,
) -> Result<AlterOutcome> {
  if !ctx.settings.enabled {
    return Err(ReplError::ReplicationDisabled);
  }
  if !ctx.settings.system_tenant {
    return Err(ReplError::InsufficientPrivilege);
  }
  if request.options.resume_timestamp.is_some() {
    return Err(ReplError::ResumeTimestampNotAlterable);
  }

  let options = request.options.resolve()?;
  let retention_ttl_seconds = options
    .retention()
    .unwrap_or(ctx.settings.default_retention_ttl_seconds);

  let tenant = txn.lookup_tenant(&request.tenant)?;

  if let Some(source) = &request.source {
    alter_tenant_restart_replication(ctx, txn, &tenant, source, retention_ttl_seconds)?;
    return Ok(AlterOutcome::default());
  }

  tenant.consumer_job()?;

  if let Some(target) = request.cutover {
    let cutover_time = alter_tenant_job_cutover(txn, &tenant, target)?;
    return Ok(AlterOutcome {
      cutover_time: Some(cutover_time),
    });
  }

  if !request.options.is_default() {
    alter_tenant_options(txn, &tenant, &options)?;
    return Ok(AlterOutcome::default());
  }

  match request.command {
    Some(command) => alter_job_command(txn, &tenant, command)?,
    None => return Err(ReplError::UnsupportedCommand("<none>".to_string())),
  }
  Ok(AlterOutcome::default())
}
