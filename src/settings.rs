//! Cluster-level settings consulted by replication control operations.

use crate::error::{ReplError, Result};
use crate::types::ClusterId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Retention applied to new replication jobs when none is requested.
pub const DEFAULT_RETENTION_TTL_SECONDS: i32 = 4 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSettings {
  /// Identity of the local cluster, used to verify failback origins.
  pub cluster_id: ClusterId,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  /// Whether the caller runs as the system tenant. Only the system tenant
  /// may alter another tenant's replication.
  #[serde(default = "default_enabled")]
  pub system_tenant: bool,
  #[serde(default = "default_retention_ttl_seconds")]
  pub default_retention_ttl_seconds: i32,
}

fn default_enabled() -> bool {
  true
}

fn default_retention_ttl_seconds() -> i32 {
  DEFAULT_RETENTION_TTL_SECONDS
}

impl ReplicationSettings {
  pub fn new(cluster_id: ClusterId) -> Self {
    Self {
      cluster_id,
      enabled: true,
      system_tenant: true,
      default_retention_ttl_seconds: DEFAULT_RETENTION_TTL_SECONDS,
    }
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn system_tenant(mut self, system_tenant: bool) -> Self {
    self.system_tenant = system_tenant;
    self
  }

  pub fn default_retention_ttl_seconds(mut self, seconds: i32) -> Self {
    self.default_retention_ttl_seconds = seconds;
    self
  }

  /// Load settings from a JSON document.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let bytes = std::fs::read(path.as_ref())?;
    let settings: Self = serde_json::from_slice(&bytes)
      .map_err(|error| ReplError::Serialization(format!("decode replication settings: {error}")))?;
    if settings.default_retention_ttl_seconds < 0 {
      return Err(ReplError::RetentionRangeInvalid {
        max: i32::MAX,
        reason: format!(
          "default retention {} is negative",
          settings.default_retention_ttl_seconds
        ),
      });
    }
    Ok(settings)
  }
}
