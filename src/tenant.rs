//! Tenant (virtual cluster) records.

use crate::error::{ReplError, Result};
use crate::types::{JobId, TenantId, TenantName, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How, if at all, a tenant's SQL service is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ServiceMode {
  /// Offline: no SQL service. The only mode that accepts replication.
  #[default]
  None,
  External,
  Shared,
  Stopping,
}

impl fmt::Display for ServiceMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      ServiceMode::None => "none",
      ServiceMode::External => "external",
      ServiceMode::Shared => "shared",
      ServiceMode::Stopping => "stopping",
    };
    write!(f, "{value}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataState {
  #[default]
  Ready,
  /// Data is being replayed and is not yet consistent.
  Add,
  Drop,
}

impl fmt::Display for DataState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      DataState::Ready => "ready",
      DataState::Add => "add",
      DataState::Drop => "drop",
    };
    write!(f, "{value}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
  pub id: TenantId,
  pub name: TenantName,
  pub data_state: DataState,
  pub service_mode: ServiceMode,
  pub physical_replication_consumer_job_id: Option<JobId>,
  pub last_revert_tenant_timestamp: Timestamp,
}

impl TenantRecord {
  pub fn new(id: TenantId, name: TenantName) -> Self {
    Self {
      id,
      name,
      data_state: DataState::Ready,
      service_mode: ServiceMode::None,
      physical_replication_consumer_job_id: None,
      last_revert_tenant_timestamp: Timestamp::EMPTY,
    }
  }

  /// The tenant's replication consumer job, or `NoActiveJob`.
  pub fn consumer_job(&self) -> Result<JobId> {
    self
      .physical_replication_consumer_job_id
      .ok_or_else(|| ReplError::NoActiveJob {
        name: self.name.to_string(),
        id: self.id,
      })
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.name.as_str().is_empty() {
      return Err(ReplError::InvalidTenantRecord(format!(
        "tenant {} has an empty name",
        self.id
      )));
    }
    if self.data_state != DataState::Ready && self.service_mode != ServiceMode::None {
      return Err(ReplError::InvalidTenantRecord(format!(
        "tenant {:?} ({}) in data state {} cannot have service mode {}",
        self.name.as_str(),
        self.id,
        self.data_state,
        self.service_mode
      )));
    }
    Ok(())
  }
}

/// How a request names its tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSpec {
  Id(TenantId),
  Name(TenantName),
}

impl fmt::Display for TenantSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TenantSpec::Id(id) => write!(f, "[{id}]"),
      TenantSpec::Name(name) => write!(f, "{:?}", name.as_str()),
    }
  }
}

impl From<TenantId> for TenantSpec {
  fn from(id: TenantId) -> Self {
    TenantSpec::Id(id)
  }
}

impl From<&str> for TenantSpec {
  fn from(name: &str) -> Self {
    TenantSpec::Name(TenantName::new(name))
  }
}

#[cfg(test)]
mod tests {
  use super::{DataState, ServiceMode, TenantRecord};
  use crate::error::ReplError;
  use crate::types::{TenantId, TenantName};

  fn record() -> TenantRecord {
    TenantRecord::new(TenantId::new(4).expect("id"), TenantName::new("app"))
  }

  #[test]
  fn missing_job_reports_no_active_job() {
    let err = record().consumer_job().expect_err("no job");
    assert!(matches!(err, ReplError::NoActiveJob { .. }));
    assert!(err.to_string().contains("\"app\" (4)"), "{err}");
  }

  #[test]
  fn unready_tenant_cannot_be_served() {
    let mut tenant = record();
    tenant.data_state = DataState::Add;
    tenant.service_mode = ServiceMode::Shared;
    assert!(matches!(
      tenant.validate(),
      Err(ReplError::InvalidTenantRecord(_))
    ));

    tenant.service_mode = ServiceMode::None;
    assert!(tenant.validate().is_ok());
  }
}
