//! Pause and resume of a tenant's replication job.

use crate::error::{ReplError, Result};
use crate::store::Txn;
use crate::tenant::TenantRecord;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Reason recorded on the job when replication is paused by request.
pub const PAUSE_REPLICATION_REASON: &str = "ALTER VIRTUAL CLUSTER PAUSE REPLICATION";

/// Job control verbs a request can carry. Only pause and resume apply to
/// replication jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCommand {
  Pause,
  Resume,
  Cancel,
}

impl fmt::Display for JobCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      JobCommand::Pause => "PAUSE",
      JobCommand::Resume => "RESUME",
      JobCommand::Cancel => "CANCEL",
    };
    write!(f, "{value}")
  }
}

impl FromStr for JobCommand {
  type Err = ReplError;

  fn from_str(raw: &str) -> Result<Self> {
    match raw.to_ascii_uppercase().as_str() {
      "PAUSE" => Ok(Self::Pause),
      "RESUME" => Ok(Self::Resume),
      "CANCEL" => Ok(Self::Cancel),
      _ => Err(ReplError::UnsupportedCommand(raw.to_string())),
    }
  }
}

pub fn alter_job_command(txn: &mut Txn, tenant: &TenantRecord, command: JobCommand) -> Result<()> {
  let job_id = tenant.consumer_job()?;
  match command {
    JobCommand::Resume => {
      info!(job_id = %job_id, tenant = %tenant.name, "resuming replication");
      txn.unpause(job_id)
    }
    JobCommand::Pause => {
      info!(job_id = %job_id, tenant = %tenant.name, "pausing replication");
      txn.pause_requested(job_id, PAUSE_REPLICATION_REASON)
    }
    other => Err(ReplError::UnsupportedCommand(other.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::JobCommand;
  use crate::error::ReplError;
  use std::str::FromStr;

  #[test]
  fn verbs_parse_case_insensitively() {
    assert_eq!(JobCommand::from_str("pause").expect("pause"), JobCommand::Pause);
    assert_eq!(JobCommand::from_str("Resume").expect("resume"), JobCommand::Resume);
    assert_eq!(JobCommand::from_str("CANCEL").expect("cancel"), JobCommand::Cancel);
  }

  #[test]
  fn unknown_verbs_unsupported() {
    for raw in ["", "stop", "PAUSE NOW", "restart"] {
      assert!(
        matches!(JobCommand::from_str(raw), Err(ReplError::UnsupportedCommand(_))),
        "verb should fail: {raw}"
      );
    }
  }
}
