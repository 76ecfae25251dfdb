//! Control plane for cross-cluster physical replication of virtual clusters
//! (tenants).
//!
//! A standing stream ingestion job replays a source tenant into a
//! destination tenant. This crate installs cutover instructions on that job,
//! changes its retention, pauses and resumes it, and reverses the direction
//! of replication after a cutover (failback). Each operation reads and writes
//! tenant, job and protected timestamp state within one store transaction.

pub mod error;
pub mod fence;
pub mod jobs;
pub mod protectedts;
pub mod replication;
pub mod settings;
pub mod store;
pub mod streamclient;
pub mod tenant;
pub mod types;

pub use error::{ErrorKind, ReplError, Result};
pub use replication::{
  alter_replication, AlterOutcome, AlterReplication, CutoverTarget, JobCommand,
  ReplicationContext, ReplicationOptions, ReplicationSource,
};
pub use settings::ReplicationSettings;
pub use store::{ReplicationStore, StoreOptions, Txn};
pub use types::{ClusterId, JobId, TenantId, TenantName, Timestamp};
