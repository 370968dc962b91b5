use serde::{Deserialize, Serialize};
use std::fmt;

use super::finger_table::FingerTable;
use super::hashing::{in_half_open, in_open};

/// Identity of a peer on the ring.
///
/// The `address` is an opaque routable string (`host:port` for the HTTP
/// transport) and is only a routing hint: two peers are the same node iff
/// their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: u64,
    pub address: String,
}

impl PartialEq for NodeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeInfo {}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}

/// Pure Chord node state machine.
///
/// Holds the ring pointers of one node and implements the Chord decision
/// rules over them. No I/O happens here: the service layer reads routing
/// decisions from this struct and performs the actual network calls, so the
/// whole protocol logic stays testable without a network.
#[derive(Debug)]
pub struct ChordNode {
    id: u64,
    address: String,
    predecessor: Option<NodeInfo>,
    successor: NodeInfo,
    finger: FingerTable,
}

impl ChordNode {
    /// A freshly booted node points at itself: sole member of its own ring
    /// until a join or a notify teaches it otherwise.
    pub fn new(id: u64, address: String, m_bits: u8) -> Self {
        let info = NodeInfo {
            id,
            address: address.clone(),
        };
        Self {
            id,
            address,
            predecessor: None,
            successor: info.clone(),
            finger: FingerTable::new(info, m_bits),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            id: self.id,
            address: self.address.clone(),
        }
    }

    pub fn successor(&self) -> &NodeInfo {
        &self.successor
    }

    pub fn predecessor(&self) -> Option<&NodeInfo> {
        self.predecessor.as_ref()
    }

    pub fn finger(&self) -> &FingerTable {
        &self.finger
    }

    pub fn finger_mut(&mut self) -> &mut FingerTable {
        &mut self.finger
    }

    /// True while this node is the only member it knows of.
    pub fn is_alone(&self) -> bool {
        self.successor.id == self.id
    }

    /// A node claims `key` iff it falls in `(predecessor, self]`.
    ///
    /// With no predecessor the node only claims anything when it is alone;
    /// otherwise it has not yet learned its lower boundary and defers to
    /// routing until stabilization fills the predecessor in.
    pub fn is_responsible_for(&self, key: u64) -> bool {
        match &self.predecessor {
            Some(pred) => in_half_open(pred.id, key, self.id),
            None => self.is_alone(),
        }
    }

    /// Stabilization rule: adopt `candidate` as successor iff it sits
    /// strictly between us and the current successor.
    pub fn should_update_successor(&self, candidate: &NodeInfo) -> bool {
        candidate.id != self.id && in_open(self.id, candidate.id, self.successor.id)
    }

    /// Process a notify from a peer that believes it precedes us.
    ///
    /// Returns whether the predecessor actually changed; re-notifying with
    /// the current predecessor is a no-op.
    pub fn notify(&mut self, candidate: NodeInfo) -> bool {
        let accept = match &self.predecessor {
            Some(pred) => in_open(pred.id, candidate.id, self.id),
            None => true,
        };
        if accept {
            self.predecessor = Some(candidate);
        }
        accept
    }

    pub fn set_successor(&mut self, successor: NodeInfo) {
        self.successor = successor;
    }

    pub fn set_predecessor(&mut self, predecessor: NodeInfo) {
        self.predecessor = Some(predecessor);
    }

    pub fn clear_predecessor(&mut self) {
        self.predecessor = None;
    }
}
