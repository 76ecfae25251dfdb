//! Transactional store for tenant records, replication jobs and protected
//! timestamp records.
//!
//! A transaction runs against a private copy of the store state and is
//! published only if its closure succeeds and the cross-record invariants
//! hold. Transactions are serialised: in-process by a mutex held for the
//! transaction's lifetime, and across processes sharing a sidecar directory
//! by an exclusive lock file, with the state reloaded from disk under that
//! lock.

mod sidecar;

use crate::error::{ReplError, Result};
use crate::jobs::{Job, JobMetadata, JobPayload, JobStatus};
use crate::protectedts::ProtectedTimestampRecord;
use crate::tenant::{TenantRecord, TenantSpec};
use crate::types::{JobId, PtsRecordId, TenantId};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sidecar::SidecarStore;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreState {
  #[serde(default)]
  tenants: IndexMap<TenantId, TenantRecord>,
  #[serde(default)]
  jobs: IndexMap<JobId, Job>,
  #[serde(default)]
  protected_timestamps: IndexMap<PtsRecordId, ProtectedTimestampRecord>,
  #[serde(default)]
  next_job_id: u64,
}

impl StoreState {
  fn check_invariants(&self) -> Result<()> {
    for tenant in self.tenants.values() {
      tenant.validate()?;

      let Some(job_id) = tenant.physical_replication_consumer_job_id else {
        continue;
      };
      let job = self.jobs.get(&job_id).ok_or_else(|| {
        ReplError::InvariantViolation(format!(
          "tenant {} references missing replication job {job_id}",
          tenant.id
        ))
      })?;
      if let JobPayload::StreamIngestion(details) = &job.metadata.payload {
        if details.destination_tenant_id != tenant.id {
          return Err(ReplError::InvariantViolation(format!(
            "tenant {} references job {job_id} replicating into tenant {}",
            tenant.id, details.destination_tenant_id
          )));
        }
      }
    }
    Ok(())
  }
}

/// Options for a file-backed store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  sidecar_path: PathBuf,
}

impl StoreOptions {
  pub fn new(sidecar_path: impl AsRef<Path>) -> Self {
    Self {
      sidecar_path: sidecar_path.as_ref().to_path_buf(),
    }
  }

  pub fn sidecar_path(&self) -> &Path {
    &self.sidecar_path
  }
}

#[derive(Debug)]
pub struct ReplicationStore {
  state: Mutex<StoreState>,
  sidecar: Option<SidecarStore>,
}

impl ReplicationStore {
  pub fn in_memory() -> Self {
    Self {
      state: Mutex::new(StoreState::default()),
      sidecar: None,
    }
  }

  /// Open a store persisted under the given sidecar directory, creating it
  /// if needed.
  pub fn open(options: StoreOptions) -> Result<Self> {
    let sidecar = SidecarStore::new(options.sidecar_path())?;
    let state = sidecar.with_lock(|| sidecar.read())?;
    info!(
      path = %options.sidecar_path().display(),
      tenants = state.tenants.len(),
      jobs = state.jobs.len(),
      "opened replication store"
    );
    Ok(Self {
      state: Mutex::new(state),
      sidecar: Some(sidecar),
    })
  }

  /// Run `f` in a read-write transaction. Nothing `f` does is visible to
  /// anyone unless it returns `Ok`.
  pub fn txn<T>(&self, f: impl FnOnce(&mut Txn) -> Result<T>) -> Result<T> {
    let mut guard = self.state.lock();
    match &self.sidecar {
      None => {
        let mut txn = Txn::new(guard.clone());
        let value = f(&mut txn)?;
        txn.state.check_invariants()?;
        *guard = txn.state;
        debug!("committed replication store transaction");
        Ok(value)
      }
      Some(sidecar) => sidecar.with_lock(|| {
        let mut txn = Txn::new(sidecar.read()?);
        let value = f(&mut txn)?;
        txn.state.check_invariants()?;
        sidecar.write(&txn.state)?;
        *guard = txn.state;
        debug!("committed replication store transaction");
        Ok(value)
      }),
    }
  }

  /// Run `f` against a consistent snapshot.
  pub fn read<T>(&self, f: impl FnOnce(&Txn) -> Result<T>) -> Result<T> {
    let guard = self.state.lock();
    let snapshot = match &self.sidecar {
      None => guard.clone(),
      Some(sidecar) => sidecar.with_lock(|| sidecar.read())?,
    };
    drop(guard);
    f(&Txn::new(snapshot))
  }
}

/// Handle to an open transaction; every tenant, job and protected timestamp
/// access inside one operation goes through the same handle.
#[derive(Debug)]
pub struct Txn {
  state: StoreState,
}

impl Txn {
  fn new(state: StoreState) -> Self {
    Self { state }
  }

  pub fn lookup_tenant(&self, spec: &TenantSpec) -> Result<TenantRecord> {
    let found = match spec {
      TenantSpec::Id(id) => self.state.tenants.get(id),
      TenantSpec::Name(name) => self
        .state
        .tenants
        .values()
        .find(|tenant| &tenant.name == name),
    };
    found
      .cloned()
      .ok_or_else(|| ReplError::TenantNotFound(spec.to_string()))
  }

  pub fn tenants(&self) -> impl Iterator<Item = &TenantRecord> {
    self.state.tenants.values()
  }

  pub fn create_tenant(&mut self, record: TenantRecord) -> Result<()> {
    record.validate()?;
    if self.state.tenants.contains_key(&record.id) {
      return Err(ReplError::InvalidTenantRecord(format!(
        "tenant with id {} already exists",
        record.id
      )));
    }
    if self
      .state
      .tenants
      .values()
      .any(|tenant| tenant.name == record.name)
    {
      return Err(ReplError::InvalidTenantRecord(format!(
        "tenant with name {:?} already exists",
        record.name.as_str()
      )));
    }
    self.state.tenants.insert(record.id, record);
    Ok(())
  }

  /// Overwrite an existing tenant record. Identity fields cannot change.
  pub fn update_tenant_record(&mut self, record: &TenantRecord) -> Result<()> {
    record.validate()?;
    let existing = self
      .state
      .tenants
      .get_mut(&record.id)
      .ok_or_else(|| ReplError::TenantNotFound(TenantSpec::Id(record.id).to_string()))?;
    if existing.name != record.name {
      return Err(ReplError::InvalidTenantRecord(format!(
        "tenant {} cannot be renamed from {:?} to {:?} by a record update",
        record.id,
        existing.name.as_str(),
        record.name.as_str()
      )));
    }
    *existing = record.clone();
    Ok(())
  }

  /// Allocate a job ID that no existing job uses.
  pub fn make_job_id(&mut self) -> JobId {
    loop {
      self.state.next_job_id += 1;
      let id = JobId::new(self.state.next_job_id);
      if !self.state.jobs.contains_key(&id) {
        return id;
      }
    }
  }

  pub fn load_job(&self, id: JobId) -> Result<Job> {
    self
      .state
      .jobs
      .get(&id)
      .cloned()
      .ok_or(ReplError::JobNotFound(id))
  }

  pub fn jobs(&self) -> impl Iterator<Item = &Job> {
    self.state.jobs.values()
  }

  pub fn create_job(&mut self, job: Job) -> Result<()> {
    if self.state.jobs.contains_key(&job.id) {
      return Err(ReplError::JobAlreadyExists(job.id));
    }
    self.state.next_job_id = self.state.next_job_id.max(job.id.get());
    self.state.jobs.insert(job.id, job);
    Ok(())
  }

  /// Load a job's metadata, apply `f`, and write the result back. On error
  /// the job is left untouched.
  pub fn update_job(
    &mut self,
    id: JobId,
    f: impl FnOnce(JobMetadata) -> Result<JobMetadata>,
  ) -> Result<()> {
    let job = self
      .state
      .jobs
      .get_mut(&id)
      .ok_or(ReplError::JobNotFound(id))?;
    job.metadata = f(job.metadata.clone())?;
    Ok(())
  }

  /// Ask the job runtime to pause a job. Already pausing or paused jobs are
  /// left as they are.
  pub fn pause_requested(&mut self, id: JobId, reason: &str) -> Result<()> {
    let job = self
      .state
      .jobs
      .get_mut(&id)
      .ok_or(ReplError::JobNotFound(id))?;
    if job.status.is_terminal() {
      return Err(ReplError::JobNotPausable {
        job_id: id,
        status: job.status.to_string(),
      });
    }
    if job.status == JobStatus::Running {
      job.status = JobStatus::PauseRequested;
      job.pause_reason = Some(reason.to_string());
    }
    Ok(())
  }

  /// Resume a paused job. Running jobs are left as they are.
  pub fn unpause(&mut self, id: JobId) -> Result<()> {
    let job = self
      .state
      .jobs
      .get_mut(&id)
      .ok_or(ReplError::JobNotFound(id))?;
    if job.status.is_terminal() {
      return Err(ReplError::JobNotResumable {
        job_id: id,
        status: job.status.to_string(),
      });
    }
    if job.status != JobStatus::Running {
      job.status = JobStatus::Running;
      job.pause_reason = None;
    }
    Ok(())
  }

  /// Record a status transition made by the job runtime.
  pub fn set_job_status(&mut self, id: JobId, status: JobStatus) -> Result<()> {
    let job = self
      .state
      .jobs
      .get_mut(&id)
      .ok_or(ReplError::JobNotFound(id))?;
    job.status = status;
    Ok(())
  }

  pub fn protect(&mut self, record: ProtectedTimestampRecord) -> Result<()> {
    if !self.state.jobs.contains_key(&record.job_id) {
      return Err(ReplError::JobNotFound(record.job_id));
    }
    self.state.protected_timestamps.insert(record.id, record);
    Ok(())
  }

  pub fn get_pts_record(&self, id: PtsRecordId) -> Result<ProtectedTimestampRecord> {
    self
      .state
      .protected_timestamps
      .get(&id)
      .cloned()
      .ok_or(ReplError::ProtectedTimestampNotFound(id))
  }
}
