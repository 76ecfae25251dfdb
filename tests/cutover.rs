mod common;

use common::{seed_replicating_tenant, settings, worker_update, FakeSource};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tenant_replication::jobs::ReplicationStatus;
use tenant_replication::types::Span;
use tenant_replication::{
  AlterReplication, CutoverTarget, ReplError, ReplicationContext, ReplicationStore, TenantId,
  Timestamp,
};

fn cutover(
  store: &ReplicationStore,
  tenant: &str,
  target: CutoverTarget,
) -> tenant_replication::Result<Timestamp> {
  let settings = settings();
  let source = FakeSource::unreachable();
  let ctx = ReplicationContext::new(&settings, &source);
  let outcome = ctx.execute(store, &AlterReplication::new(tenant).cutover(target))?;
  Ok(outcome.cutover_time.expect("cutover returns a timestamp"))
}

#[test]
fn example_scenario_floor_then_single_shot() {
  let store = ReplicationStore::in_memory();
  let j1 = seed_replicating_tenant(&store, 2, "t1", Some(Timestamp::new(100, 0)));

  let err = cutover(&store, "t1", CutoverTarget::At(Timestamp::new(50, 0))).expect_err("t=50");
  assert!(
    matches!(err, ReplError::CutoverBeforeRetentionFloor { .. }),
    "unexpected error: {err}"
  );
  let job = store.read(|txn| txn.load_job(j1)).expect("load");
  assert_eq!(
    job.stream_ingestion_progress().expect("progress").replication_status,
    ReplicationStatus::Running
  );

  let ts = cutover(&store, "t1", CutoverTarget::At(Timestamp::new(150, 0))).expect("t=150");
  assert_eq!(ts, Timestamp::new(150, 0));
  let job = store.read(|txn| txn.load_job(j1)).expect("load");
  let progress = job.stream_ingestion_progress().expect("progress");
  assert_eq!(progress.replication_status, ReplicationStatus::PendingCutover);
  assert_eq!(progress.cutover_time, Timestamp::new(150, 0));
  assert_eq!(
    progress.remaining_cutover_spans,
    vec![Span::for_tenant(TenantId::new(2).expect("id"))]
  );

  worker_update(&store, j1, |progress| {
    progress.replication_status = ReplicationStatus::CuttingOver;
  });
  let before = store.read(|txn| txn.load_job(j1)).expect("load");

  for target in [
    CutoverTarget::Latest,
    CutoverTarget::At(Timestamp::new(50, 0)),
    CutoverTarget::At(Timestamp::new(150, 0)),
    CutoverTarget::At(Timestamp::new(900, 0)),
  ] {
    let err = cutover(&store, "t1", target).expect_err("already cutting over");
    match err {
      ReplError::CutoverAlreadyInProgress { job_id, cutover_time } => {
        assert_eq!(job_id, j1);
        assert_eq!(cutover_time, Timestamp::new(150, 0));
      }
      other => panic!("unexpected error for {target}: {other}"),
    }
  }
  let after = store.read(|txn| txn.load_job(j1)).expect("load");
  assert_eq!(after, before);
}

#[test]
fn cutover_below_floor_never_mutates_progress() {
  let mut rng = StdRng::seed_from_u64(0x5eed_cafe);

  for i in 0..200_u64 {
    let store = ReplicationStore::in_memory();
    let floor = Timestamp::new(rng.gen_range(1..1_000_000), rng.gen_range(0..10));
    let job_id = seed_replicating_tenant(&store, 2 + i, "app", Some(floor));
    let before = store.read(|txn| txn.load_job(job_id)).expect("load");

    let below = if floor.logical > 0 && rng.gen_bool(0.5) {
      Timestamp::new(floor.wall_time, floor.logical - 1)
    } else {
      Timestamp::new(rng.gen_range(0..floor.wall_time), rng.gen_range(0..10))
    };
    let err = cutover(&store, "app", CutoverTarget::At(below)).expect_err("below floor");
    assert!(
      matches!(err, ReplError::CutoverBeforeRetentionFloor { floor: f, .. } if f == floor),
      "unexpected error: {err}"
    );
    assert_eq!(store.read(|txn| txn.load_job(job_id)).expect("load"), before);
  }
}

#[test]
fn latest_resolves_to_high_water_or_start_time() {
  let store = ReplicationStore::in_memory();
  let job_id = seed_replicating_tenant(&store, 2, "app", Some(Timestamp::new(5, 0)));

  let ts = cutover(&store, "app", CutoverTarget::Latest).expect("latest without progress");
  assert_eq!(ts, Timestamp::new(20, 0));

  worker_update(&store, job_id, |progress| {
    progress.replicated_time = Timestamp::new(480, 7);
  });
  let ts = cutover(&store, "app", CutoverTarget::Latest).expect("latest with progress");
  assert_eq!(ts, Timestamp::new(480, 7));

  let job = store.read(|txn| txn.load_job(job_id)).expect("load");
  assert_eq!(
    job.stream_ingestion_progress().expect("progress").cutover_time,
    Timestamp::new(480, 7)
  );
}

#[test]
fn latest_below_floor_is_rejected() {
  let store = ReplicationStore::in_memory();
  seed_replicating_tenant(&store, 2, "app", Some(Timestamp::new(30, 0)));

  let err = cutover(&store, "app", CutoverTarget::Latest).expect_err("start time below floor");
  assert!(matches!(err, ReplError::CutoverBeforeRetentionFloor { .. }));
}

#[test]
fn cutover_requires_retained_floor() {
  let store = ReplicationStore::in_memory();
  let job_id = seed_replicating_tenant(&store, 2, "app", None);

  let err = cutover(&store, "app", CutoverTarget::At(Timestamp::new(1_000, 0)))
    .expect_err("no protected timestamp");
  assert!(matches!(err, ReplError::RetentionNotYetEstablished { .. }));
  assert!(err.to_string().contains("has not yet recorded a retained timestamp"));

  let job = store.read(|txn| txn.load_job(job_id)).expect("load");
  assert_eq!(
    job.stream_ingestion_progress().expect("progress").replication_status,
    ReplicationStatus::Running
  );
}
