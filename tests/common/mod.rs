#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tenant_replication::jobs::{ReplicationJobSpec, StreamIngestionProgress};
use tenant_replication::protectedts::ProtectedTimestampRecord;
use tenant_replication::streamclient::{
  PriorReplicationDetails, StreamAddress, StreamClient, StreamClientError, StreamClientFactory,
};
use tenant_replication::tenant::{ServiceMode, TenantRecord};
use tenant_replication::types::Span;
use tenant_replication::{
  ClusterId, JobId, ReplicationSettings, ReplicationStore, TenantId, TenantName, Timestamp,
};
use uuid::Uuid;

pub fn cluster_id() -> ClusterId {
  ClusterId::from_uuid(Uuid::from_u128(0x6b1e_4a0c_93d2_4f7e_8a55_0c1d_2e3f_4a5b))
}

pub fn settings() -> ReplicationSettings {
  ReplicationSettings::new(cluster_id())
}

pub fn tenant_id(id: u64) -> TenantId {
  TenantId::new(id).expect("tenant id")
}

/// A tenant replicating from a remote source under a fresh job, optionally
/// with a protected timestamp floor already established.
pub fn seed_replicating_tenant(
  store: &ReplicationStore,
  id: u64,
  name: &str,
  floor: Option<Timestamp>,
) -> JobId {
  store
    .txn(|txn| {
      let job_id = txn.make_job_id();
      let mut tenant = TenantRecord::new(tenant_id(id), TenantName::new(name));
      tenant.physical_replication_consumer_job_id = Some(job_id);
      txn.create_tenant(tenant)?;
      txn.create_job(
        ReplicationJobSpec {
          job_id,
          source_address: StreamAddress::parse("postgresql://source-cluster:26257/")
            .expect("address"),
          source_tenant_name: TenantName::new(format!("{name}-source")),
          destination_tenant_id: tenant_id(id),
          retention_ttl_seconds: 3600,
          start_time: Timestamp::new(20, 0),
          revert_first: false,
          description: format!("replicate {name}"),
        }
        .into_job(),
      )?;

      if let Some(floor) = floor {
        let record = ProtectedTimestampRecord::new(job_id, floor, Span::for_tenant(tenant_id(id)));
        let record_id = record.id;
        txn.protect(record)?;
        txn.update_job(job_id, |mut metadata| {
          metadata.stream_ingestion_mut(job_id)?.0.protected_timestamp_record_id = Some(record_id);
          Ok(metadata)
        })?;
      }
      Ok(job_id)
    })
    .expect("seed replicating tenant")
}

/// A tenant with no replication job, in the given service mode.
pub fn seed_tenant(store: &ReplicationStore, id: u64, name: &str, mode: ServiceMode) {
  store
    .txn(|txn| {
      let mut tenant = TenantRecord::new(tenant_id(id), TenantName::new(name));
      tenant.service_mode = mode;
      tenant.last_revert_tenant_timestamp = Timestamp::new(33, 0);
      txn.create_tenant(tenant)
    })
    .expect("seed tenant");
}

/// Stand-in for the ingestion worker advancing job progress.
pub fn worker_update(
  store: &ReplicationStore,
  job_id: JobId,
  f: impl FnOnce(&mut StreamIngestionProgress),
) {
  store
    .txn(|txn| {
      txn.update_job(job_id, |mut metadata| {
        f(metadata.stream_ingestion_mut(job_id)?.1);
        Ok(metadata)
      })
    })
    .expect("worker update");
}

#[derive(Debug, Clone, Default)]
pub struct SourceCalls {
  pub connects: usize,
  pub queries: usize,
  pub closes: usize,
  pub addresses: Vec<String>,
  pub tenants: Vec<TenantName>,
}

/// Scripted remote cluster.
pub struct FakeSource {
  calls: Arc<Mutex<SourceCalls>>,
  reply: Option<PriorReplicationDetails>,
  reachable: bool,
}

impl FakeSource {
  pub fn replying(origin_id: impl Into<String>, resume_timestamp: Timestamp) -> Self {
    Self {
      calls: Arc::new(Mutex::new(SourceCalls::default())),
      reply: Some(PriorReplicationDetails {
        origin_id: origin_id.into(),
        resume_timestamp,
      }),
      reachable: true,
    }
  }

  pub fn failing_query() -> Self {
    Self {
      calls: Arc::new(Mutex::new(SourceCalls::default())),
      reply: None,
      reachable: true,
    }
  }

  pub fn unreachable() -> Self {
    Self {
      calls: Arc::new(Mutex::new(SourceCalls::default())),
      reply: None,
      reachable: false,
    }
  }

  pub fn calls(&self) -> SourceCalls {
    self.calls.lock().clone()
  }
}

struct FakeClient {
  calls: Arc<Mutex<SourceCalls>>,
  reply: Option<PriorReplicationDetails>,
}

impl StreamClient for FakeClient {
  fn prior_replication_details(
    &mut self,
    tenant: &TenantName,
  ) -> Result<PriorReplicationDetails, StreamClientError> {
    let mut calls = self.calls.lock();
    calls.queries += 1;
    calls.tenants.push(tenant.clone());
    self
      .reply
      .clone()
      .ok_or_else(|| StreamClientError::new("tenant has no prior replication"))
  }

  fn close(&mut self) -> Result<(), StreamClientError> {
    self.calls.lock().closes += 1;
    Ok(())
  }
}

impl StreamClientFactory for FakeSource {
  fn connect(&self, address: &StreamAddress) -> Result<Box<dyn StreamClient>, StreamClientError> {
    let mut calls = self.calls.lock();
    calls.connects += 1;
    calls.addresses.push(address.as_str().to_string());
    if !self.reachable {
      return Err(StreamClientError::new("connection refused"));
    }
    Ok(Box::new(FakeClient {
      calls: Arc::clone(&self.calls),
      reply: self.reply.clone(),
    }))
  }
}
