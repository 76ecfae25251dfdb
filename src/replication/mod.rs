//! Replication control operations: cutover, retention changes, failback and
//! pause/resume of a tenant's replication consumer job.
//!
//! Every operation runs inside a single store transaction supplied by the
//! caller and either commits all of its writes or none of them.

pub mod alter;
pub mod command;
pub mod create;
pub mod cutover;
pub mod failback;
pub mod options;
pub mod retention;

pub use alter::{alter_replication, AlterOutcome, AlterReplication};
pub use command::{JobCommand, PAUSE_REPLICATION_REASON};
pub use create::{ReplicationJobCreator, StoreJobCreator};
pub use cutover::CutoverTarget;
pub use failback::ReplicationSource;
pub use options::{ReplicationOptions, ResolvedOptions, RetentionInterval};

use crate::error::Result;
use crate::settings::ReplicationSettings;
use crate::store::ReplicationStore;
use crate::streamclient::StreamClientFactory;

/// Collaborators an alter request needs besides the store.
#[derive(Clone, Copy)]
pub struct ReplicationContext<'a> {
  pub settings: &'a ReplicationSettings,
  pub stream_clients: &'a dyn StreamClientFactory,
  pub job_creator: &'a dyn ReplicationJobCreator,
}

impl<'a> ReplicationContext<'a> {
  pub fn new(
    settings: &'a ReplicationSettings,
    stream_clients: &'a dyn StreamClientFactory,
  ) -> Self {
    Self {
      settings,
      stream_clients,
      job_creator: &StoreJobCreator,
    }
  }

  pub fn job_creator(mut self, job_creator: &'a dyn ReplicationJobCreator) -> Self {
    self.job_creator = job_creator;
    self
  }

  /// Run `request` in its own transaction on `store`.
  pub fn execute(&self, store: &ReplicationStore, request: &AlterReplication) -> Result<AlterOutcome> {
    store.txn(|txn| alter_replication(self, txn, request))
  }
}
