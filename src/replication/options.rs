//! Replication options as supplied by a request, and their evaluated form.

use crate::error::{ReplError, Result};
use crate::types::Timestamp;
use std::time::Duration;

/// A requested retention window, before range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionInterval {
  Seconds(i64),
  Duration(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationOptions {
  pub retention: Option<RetentionInterval>,
  pub resume_timestamp: Option<Timestamp>,
}

impl ReplicationOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn retention_seconds(mut self, seconds: i64) -> Self {
    self.retention = Some(RetentionInterval::Seconds(seconds));
    self
  }

  pub fn retention(mut self, retention: Duration) -> Self {
    self.retention = Some(RetentionInterval::Duration(retention));
    self
  }

  pub fn resume_timestamp(mut self, ts: Timestamp) -> Self {
    self.resume_timestamp = Some(ts);
    self
  }

  pub fn is_default(&self) -> bool {
    self.retention.is_none() && self.resume_timestamp.is_none()
  }

  /// Evaluate the options once, validating the retention range.
  pub fn resolve(&self) -> Result<ResolvedOptions> {
    let retention = match self.retention {
      None => None,
      Some(interval) => Some(retention_to_seconds(interval)?),
    };
    Ok(ResolvedOptions {
      retention,
      resume_timestamp: self.resume_timestamp,
    })
  }
}

fn retention_to_seconds(interval: RetentionInterval) -> Result<i32> {
  let seconds = match interval {
    RetentionInterval::Seconds(seconds) => seconds,
    RetentionInterval::Duration(duration) => {
      if duration.subsec_nanos() != 0 {
        return Err(range_error(format!(
          "interval conversion error: {duration:?} is not a whole number of seconds"
        )));
      }
      i64::try_from(duration.as_secs())
        .map_err(|_| range_error(format!("interval conversion error: {duration:?}")))?
    }
  };

  i32::try_from(seconds)
    .ok()
    .filter(|seconds| *seconds >= 0)
    .ok_or_else(|| range_error(format!("got {seconds}")))
}

fn range_error(reason: String) -> ReplError {
  ReplError::RetentionRangeInvalid {
    max: i32::MAX,
    reason,
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedOptions {
  retention: Option<i32>,
  resume_timestamp: Option<Timestamp>,
}

impl ResolvedOptions {
  pub fn retention(&self) -> Option<i32> {
    self.retention
  }

  pub fn resume_timestamp(&self) -> Option<Timestamp> {
    self.resume_timestamp
  }
}

#[cfg(test)]
mod tests {
  use super::ReplicationOptions;
  use crate::error::ReplError;
  use crate::types::Timestamp;
  use std::time::Duration;

  #[test]
  fn retention_bounds() {
    for seconds in [0_i64, 1, 3600, i32::MAX as i64] {
      let resolved = ReplicationOptions::new()
        .retention_seconds(seconds)
        .resolve()
        .expect("in range");
      assert_eq!(resolved.retention(), Some(seconds as i32));
    }

    for seconds in [-1_i64, i32::MAX as i64 + 1, i64::MIN, i64::MAX] {
      assert!(
        matches!(
          ReplicationOptions::new().retention_seconds(seconds).resolve(),
          Err(ReplError::RetentionRangeInvalid { .. })
        ),
        "retention should fail: {seconds}"
      );
    }
  }

  #[test]
  fn durations_must_downcast_losslessly() {
    let resolved = ReplicationOptions::new()
      .retention(Duration::from_secs(90))
      .resolve()
      .expect("whole seconds");
    assert_eq!(resolved.retention(), Some(90));

    for duration in [
      Duration::from_millis(1500),
      Duration::from_secs(u64::MAX),
      Duration::from_secs(i32::MAX as u64 + 1),
    ] {
      assert!(
        matches!(
          ReplicationOptions::new().retention(duration).resolve(),
          Err(ReplError::RetentionRangeInvalid { .. })
        ),
        "duration should fail: {duration:?}"
      );
    }
  }

  #[test]
  fn default_detection() {
    assert!(ReplicationOptions::new().is_default());
    assert!(!ReplicationOptions::new().retention_seconds(1).is_default());
    let with_resume = ReplicationOptions::new().resume_timestamp(Timestamp::new(5, 0));
    assert!(!with_resume.is_default());
    assert_eq!(
      with_resume.resolve().expect("resolve").resume_timestamp(),
      Some(Timestamp::new(5, 0))
    );
    assert_eq!(
      ReplicationOptions::new().resolve().expect("resolve").retention(),
      None
    );
  }
}
