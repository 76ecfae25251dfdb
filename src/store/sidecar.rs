//! Durable sidecar for the replication store.
//!
//! The whole store state is written as a checksummed JSON envelope through a
//! temp file, fsync, rename and parent directory sync. Writers on the same
//! directory are serialised through an exclusive lock file.

use super::StoreState;
use crate::error::{ReplError, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const STATE_ENVELOPE_VERSION: u32 = 1;

const STATE_FILE_NAME: &str = "replication-state.json";
const LOCK_FILE_NAME: &str = "replication-state.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateEnvelope {
  version: u32,
  payload_crc32: u32,
  state: StoreState,
}

#[derive(Debug, Clone)]
pub(crate) struct SidecarStore {
  dir: PathBuf,
}

impl SidecarStore {
  pub(crate) fn new(dir: impl AsRef<Path>) -> Result<Self> {
    fs::create_dir_all(dir.as_ref())?;
    Ok(Self {
      dir: dir.as_ref().to_path_buf(),
    })
  }

  pub(crate) fn state_path(&self) -> PathBuf {
    self.dir.join(STATE_FILE_NAME)
  }

  fn temp_path(&self) -> PathBuf {
    self.state_path().with_extension("json.tmp")
  }

  /// Read the last committed state, or an empty state for a fresh sidecar.
  pub(crate) fn read(&self) -> Result<StoreState> {
    let path = self.state_path();
    if !path.exists() {
      return Ok(StoreState::default());
    }
    let bytes = fs::read(&path)?;
    decode_state_bytes(&bytes)
  }

  pub(crate) fn write(&self, state: &StoreState) -> Result<()> {
    let bytes = encode_state_bytes(state)?;
    let temp_path = self.temp_path();

    let mut temp_file = OpenOptions::new()
      .create(true)
      .truncate(true)
      .write(true)
      .open(&temp_path)?;
    temp_file.write_all(&bytes)?;
    temp_file.sync_all()?;

    fs::rename(&temp_path, self.state_path())?;
    sync_dir(&self.dir)?;
    Ok(())
  }

  /// Run `f` while holding the sidecar's exclusive lock.
  pub(crate) fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let lock_file = OpenOptions::new()
      .create(true)
      .read(true)
      .write(true)
      .truncate(false)
      .open(self.dir.join(LOCK_FILE_NAME))?;
    lock_file.lock_exclusive()?;

    let result = f();
    let unlock_result = FileExt::unlock(&lock_file);
    match (result, unlock_result) {
      (Ok(value), Ok(())) => Ok(value),
      (Ok(_), Err(error)) => Err(error.into()),
      (Err(error), _) => Err(error),
    }
  }
}

fn encode_state_bytes(state: &StoreState) -> Result<Vec<u8>> {
  let payload = serde_json::to_vec(state)
    .map_err(|error| ReplError::Serialization(format!("encode store state payload: {error}")))?;

  let envelope = StateEnvelope {
    version: STATE_ENVELOPE_VERSION,
    payload_crc32: crc32fast::hash(&payload),
    state: state.clone(),
  };

  serde_json::to_vec(&envelope)
    .map_err(|error| ReplError::Serialization(format!("encode store state envelope: {error}")))
}

fn decode_state_bytes(bytes: &[u8]) -> Result<StoreState> {
  let envelope: StateEnvelope = serde_json::from_slice(bytes)
    .map_err(|error| ReplError::Serialization(format!("decode store state envelope: {error}")))?;

  if envelope.version != STATE_ENVELOPE_VERSION {
    return Err(ReplError::VersionMismatch {
      required: envelope.version,
      current: STATE_ENVELOPE_VERSION,
    });
  }

  let payload = serde_json::to_vec(&envelope.state)
    .map_err(|error| ReplError::Serialization(format!("encode store state payload: {error}")))?;
  let computed = crc32fast::hash(&payload);
  if computed != envelope.payload_crc32 {
    return Err(ReplError::CrcMismatch {
      stored: envelope.payload_crc32,
      computed,
    });
  }

  Ok(envelope.state)
}

fn sync_dir(dir: &Path) -> Result<()> {
  #[cfg(unix)]
  {
    File::open(dir)?.sync_all()?;
  }

  #[cfg(not(unix))]
  {
    let _ = dir;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::{SidecarStore, StateEnvelope, STATE_ENVELOPE_VERSION};
  use crate::error::ReplError;
  use crate::store::StoreState;
  use crate::tenant::TenantRecord;
  use crate::types::{TenantId, TenantName};

  fn sample_state() -> StoreState {
    let mut state = StoreState::default();
    let id = TenantId::new(3).expect("id");
    state
      .tenants
      .insert(id, TenantRecord::new(id, TenantName::new("app")));
    state.next_job_id = 17;
    state
  }

  #[test]
  fn missing_state_reads_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sidecar = SidecarStore::new(dir.path()).expect("sidecar");
    assert_eq!(sidecar.read().expect("read"), StoreState::default());
  }

  #[test]
  fn write_then_read_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sidecar = SidecarStore::new(dir.path()).expect("sidecar");
    let state = sample_state();
    sidecar.write(&state).expect("write");
    assert_eq!(sidecar.read().expect("read"), state);
    assert!(!sidecar.temp_path().exists());
  }

  #[test]
  fn checksum_mismatch_fails_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sidecar = SidecarStore::new(dir.path()).expect("sidecar");
    sidecar.write(&sample_state()).expect("write");

    let path = sidecar.state_path();
    let mut envelope: StateEnvelope =
      serde_json::from_slice(&std::fs::read(&path).expect("read bytes")).expect("parse envelope");
    envelope.payload_crc32 ^= 0xFF;
    std::fs::write(&path, serde_json::to_vec(&envelope).expect("encode")).expect("write");

    assert!(matches!(sidecar.read(), Err(ReplError::CrcMismatch { .. })));
  }

  #[test]
  fn future_version_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sidecar = SidecarStore::new(dir.path()).expect("sidecar");
    sidecar.write(&sample_state()).expect("write");

    let path = sidecar.state_path();
    let mut envelope: StateEnvelope =
      serde_json::from_slice(&std::fs::read(&path).expect("read bytes")).expect("parse envelope");
    envelope.version = STATE_ENVELOPE_VERSION + 1;
    std::fs::write(&path, serde_json::to_vec(&envelope).expect("encode")).expect("write");

    assert!(matches!(
      sidecar.read(),
      Err(ReplError::VersionMismatch { .. })
    ));
  }

  #[test]
  fn lock_is_released_after_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sidecar = SidecarStore::new(dir.path()).expect("sidecar");
    let result: crate::Result<()> =
      sidecar.with_lock(|| Err(ReplError::InvariantViolation("boom".to_string())));
    assert!(result.is_err());
    sidecar.with_lock(|| Ok(())).expect("relock");
  }
}
