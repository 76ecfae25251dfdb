//! Stream client seam: the connection to a remote cluster that failback asks
//! for its prior replication details.
//!
//! The wire protocol lives behind [`StreamClientFactory`]; this module owns
//! address canonicalization and scoped acquisition of clients.

use crate::error::{ReplError, Result};
use crate::types::{TenantName, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Failure reported by a stream client implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StreamClientError {
  message: String,
}

impl StreamClientError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// A replication source address in canonical URL form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamAddress(String);

impl StreamAddress {
  /// Parse and canonicalize by round-tripping through a URL.
  pub fn parse(raw: &str) -> Result<Self> {
    let url = Url::parse(raw).map_err(|error| ReplError::AddressInvalid(format!("url: {error}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
      return Err(ReplError::AddressInvalid(format!(
        "url: address must name a host: {}",
        redact(&url)
      )));
    }
    Ok(Self(url.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The address with any password removed, for logs and errors.
  pub fn redacted(&self) -> String {
    match Url::parse(&self.0) {
      Ok(url) => redact(&url),
      Err(_) => "<unparseable>".to_string(),
    }
  }
}

fn redact(url: &Url) -> String {
  let mut url = url.clone();
  if url.password().is_some() {
    // Only fails for cannot-be-a-base URLs, which carry no password.
    let _ = url.set_password(Some("redacted"));
  }
  url.to_string()
}

impl fmt::Display for StreamAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.redacted())
  }
}

/// What a remote tenant reports about the stream it was last replicated
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorReplicationDetails {
  /// `<clusterID>:<tenantID>` of the remote tenant's former source.
  pub origin_id: String,
  /// Latest time at which the remote tenant is known consistent with its
  /// former source.
  pub resume_timestamp: Timestamp,
}

pub trait StreamClient {
  fn prior_replication_details(
    &mut self,
    tenant: &TenantName,
  ) -> std::result::Result<PriorReplicationDetails, StreamClientError>;

  fn close(&mut self) -> std::result::Result<(), StreamClientError>;
}

pub trait StreamClientFactory: Send + Sync {
  fn connect(
    &self,
    address: &StreamAddress,
  ) -> std::result::Result<Box<dyn StreamClient>, StreamClientError>;
}

/// Connect to `address`, run `f` against the client and close it on every
/// path. A close failure after a successful `f` is reported; after a failed
/// `f` it is logged and `f`'s error wins.
pub fn with_stream_client<T>(
  factory: &dyn StreamClientFactory,
  address: &StreamAddress,
  f: impl FnOnce(&mut dyn StreamClient) -> Result<T>,
) -> Result<T> {
  let mut client = factory
    .connect(address)
    .map_err(|source| ReplError::SourceUnreachable {
      address: address.redacted(),
      source,
    })?;

  let result = f(client.as_mut());
  let close_result = client.close();
  match (result, close_result) {
    (Ok(value), Ok(())) => Ok(value),
    (Ok(_), Err(error)) => Err(ReplError::StreamClientClose(error)),
    (Err(error), Ok(())) => Err(error),
    (Err(error), Err(close_error)) => {
      warn!(address = %address, error = %close_error, "failed to close stream client");
      Err(error)
    }
  }
}
