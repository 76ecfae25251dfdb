//! Run an operation against every live node of a cluster, tolerating nodes
//! joining while it runs.
//!
//! Membership is read, the operation is run on each member, and membership
//! is read again. If it changed, the round is repeated against the new
//! membership until two consecutive reads agree. On return every node that
//! was a member at the end has run the operation, and any node joining later
//! did so strictly after the last round started.

use crate::error::{ReplError, Result};
use crate::types::NodeId;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
  Active,
  Decommissioning,
  Decommissioned,
}

/// One node's liveness as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
  pub node_id: NodeId,
  pub epoch: i64,
  pub membership: Membership,
  pub live: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
  pub id: NodeId,
  pub epoch: i64,
}

/// A membership snapshot, sorted by node ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nodes(Vec<Node>);

impl Nodes {
  pub fn new(mut nodes: Vec<Node>) -> Self {
    nodes.sort();
    Self(nodes)
  }

  /// Build a snapshot from liveness records. Decommissioned nodes are
  /// skipped; any other node that is not live fails the snapshot.
  pub fn from_liveness(livenesses: &[Liveness]) -> Result<Self> {
    let mut nodes = Vec::with_capacity(livenesses.len());
    for liveness in livenesses {
      if liveness.membership == Membership::Decommissioned {
        continue;
      }
      if !liveness.live {
        return Err(ReplError::NodeUnavailable(liveness.node_id));
      }
      nodes.push(Node {
        id: liveness.node_id,
        epoch: liveness.epoch,
      });
    }
    Ok(Self::new(nodes))
  }

  pub fn iter(&self) -> impl Iterator<Item = &Node> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Compare two snapshots, describing every difference.
  pub fn identical(&self, other: &Nodes) -> (bool, Vec<String>) {
    let mut diffs = Vec::new();
    for node in &self.0 {
      match other.0.iter().find(|candidate| candidate.id == node.id) {
        None => diffs.push(format!("n{} was decommissioned", node.id)),
        Some(candidate) if candidate.epoch != node.epoch => diffs.push(format!(
          "n{}'s epoch changed from {} to {}",
          node.id, node.epoch, candidate.epoch
        )),
        Some(_) => {}
      }
    }
    for node in &other.0 {
      if !self.0.iter().any(|candidate| candidate.id == node.id) {
        diffs.push(format!("n{} joined the cluster", node.id));
      }
    }
    (diffs.is_empty(), diffs)
  }
}

impl fmt::Display for Nodes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for node in &self.0 {
      if !first {
        write!(f, ", ")?;
      }
      first = false;
      write!(f, "n{}", node.id)?;
    }
    Ok(())
  }
}

/// Access to cluster membership and per-node connections.
pub trait Cluster {
  type Client;

  fn nodes(&self) -> Result<Nodes>;

  fn dial(&self, node: NodeId) -> Result<Self::Client>;
}

/// Invoke `f` on every node until membership stabilizes. `op` names the
/// operation in logs.
pub fn every_node<C: Cluster>(
  cluster: &C,
  op: &str,
  mut f: impl FnMut(NodeId, &C::Client) -> Result<()>,
) -> Result<()> {
  let mut nodes = cluster.nodes()?;

  loop {
    info!(op, nodes = %nodes, "executing on nodes");

    for node in nodes.iter() {
      let client = cluster.dial(node.id)?;
      f(node.id, &client)?;
    }

    let current = cluster.nodes()?;
    let (identical, diffs) = nodes.identical(&current);
    if identical {
      return Ok(());
    }
    info!(op, diffs = ?diffs, "membership changed, retrying");
    nodes = current;
  }
}
