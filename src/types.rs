//! Identifiers, timestamps and spans shared across the replication control
//! plane.

use crate::error::{ReplError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Width of the logical component in the decimal rendering of a timestamp.
const LOGICAL_DIGITS: usize = 10;

/// Hybrid-logical timestamp. Ordered by wall time, then logical counter.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp {
  pub wall_time: i64,
  pub logical: i32,
}

impl Timestamp {
  pub const EMPTY: Timestamp = Timestamp {
    wall_time: 0,
    logical: 0,
  };

  pub const fn new(wall_time: i64, logical: i32) -> Self {
    Self { wall_time, logical }
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::EMPTY
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}.{:0width$}",
      self.wall_time,
      self.logical,
      width = LOGICAL_DIGITS
    )
  }
}

impl FromStr for Timestamp {
  type Err = ReplError;

  fn from_str(raw: &str) -> Result<Self> {
    let (wall, logical) = match raw.split_once('.') {
      Some((wall, logical)) => (wall, Some(logical)),
      None => (raw, None),
    };

    let wall_time = parse_component::<i64>(wall, "wall time", raw)?;
    let logical = match logical {
      None => 0,
      Some(text) => {
        let logical = parse_component::<i32>(text, "logical", raw)?;
        if format!("{logical:0width$}", width = LOGICAL_DIGITS) != text {
          return Err(ReplError::InvalidTimestamp(format!(
            "logical component must be padded to {LOGICAL_DIGITS} digits: {raw}"
          )));
        }
        logical
      }
    };

    Ok(Self::new(wall_time, logical))
  }
}

/// Decimal integer with an optional leading `-`.
fn parse_component<T: FromStr>(value: &str, component: &'static str, original: &str) -> Result<T> {
  let digits = value.strip_prefix('-').unwrap_or(value);
  if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
    return Err(ReplError::InvalidTimestamp(format!(
      "invalid {component}: {original}"
    )));
  }

  value
    .parse::<T>()
    .map_err(|_| ReplError::InvalidTimestamp(format!("{component} overflow: {original}")))
}

/// Identifier of a virtual cluster. Zero is never a valid tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64")]
pub struct TenantId(u64);

impl TenantId {
  pub const SYSTEM: TenantId = TenantId(1);

  pub fn new(id: u64) -> Result<Self> {
    if id == 0 {
      return Err(ReplError::InvalidTenantId(
        "tenant id must be non-zero".to_string(),
      ));
    }
    Ok(Self(id))
  }

  pub fn get(&self) -> u64 {
    self.0
  }
}

impl TryFrom<u64> for TenantId {
  type Error = ReplError;

  fn try_from(id: u64) -> Result<Self> {
    Self::new(id)
  }
}

impl fmt::Display for TenantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for TenantId {
  type Err = ReplError;

  fn from_str(raw: &str) -> Result<Self> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
      return Err(ReplError::InvalidTenantId(raw.to_string()));
    }
    let id = raw
      .parse::<u64>()
      .map_err(|_| ReplError::InvalidTenantId(raw.to_string()))?;
    Self::new(id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantName(String);

impl TenantName {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TenantName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
  pub const fn new(id: u64) -> Self {
    Self(id)
  }

  pub fn get(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for JobId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PtsRecordId(Uuid);

impl PtsRecordId {
  pub fn new_random() -> Self {
    Self(Uuid::new_v4())
  }
}

impl fmt::Display for PtsRecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterId(Uuid);

impl ClusterId {
  pub fn new_random() -> Self {
    Self(Uuid::new_v4())
  }

  pub const fn from_uuid(id: Uuid) -> Self {
    Self(id)
  }
}

impl fmt::Display for ClusterId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The identity a replicated tenant reports as its source, rendered as
/// `<cluster>:<tenant>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationOrigin {
  pub cluster_id: ClusterId,
  pub tenant_id: TenantId,
}

impl ReplicationOrigin {
  pub const fn new(cluster_id: ClusterId, tenant_id: TenantId) -> Self {
    Self {
      cluster_id,
      tenant_id,
    }
  }
}

impl fmt::Display for ReplicationOrigin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.cluster_id, self.tenant_id)
  }
}

const TENANT_PREFIX_BYTE: u8 = 0xfe;

/// Half-open key range `[start_key, end_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
  pub start_key: Vec<u8>,
  pub end_key: Vec<u8>,
}

impl Span {
  /// The full keyspace owned by a tenant.
  pub fn for_tenant(tenant_id: TenantId) -> Self {
    let start_key = tenant_prefix(tenant_id.get());
    let end_key = match tenant_id.get().checked_add(1) {
      Some(next) => tenant_prefix(next),
      None => vec![TENANT_PREFIX_BYTE + 1],
    };
    Self { start_key, end_key }
  }
}

fn tenant_prefix(id: u64) -> Vec<u8> {
  let mut key = Vec::with_capacity(9);
  key.push(TENANT_PREFIX_BYTE);
  key.extend_from_slice(&id.to_be_bytes());
  key
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for byte in &self.start_key {
      write!(f, "{byte:02x}")?;
    }
    write!(f, ", ")?;
    for byte in &self.end_key {
      write!(f, "{byte:02x}")?;
    }
    write!(f, ")")
  }
}
