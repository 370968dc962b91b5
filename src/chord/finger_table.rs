use super::hashing::{in_open, ring_size};
use super::node::NodeInfo;

/// Routing table with `m_bits` shortcut entries.
///
/// Slot `i` (1-indexed) is intended to hold the successor of
/// `(self_id + 2^(i-1)) mod 2^m`. Entries start out pointing at the owning
/// node and are overwritten by the join seed and the stabilization refresh.
#[derive(Debug)]
pub struct FingerTable {
    node: NodeInfo,
    m_bits: u8,
    entries: Vec<NodeInfo>,
}

impl FingerTable {
    pub fn new(node: NodeInfo, m_bits: u8) -> Self {
        let entries = vec![node.clone(); m_bits as usize];
        Self {
            node,
            m_bits,
            entries,
        }
    }

    /// Point every slot at `peer`. Used right after a join, when the
    /// successor is the only remote node we know.
    pub fn fill(&mut self, peer: NodeInfo) {
        for entry in self.entries.iter_mut() {
            *entry = peer.clone();
        }
    }

    /// Overwrite slot `index` (1-indexed).
    pub fn update(&mut self, index: usize, peer: NodeInfo) {
        self.entries[index - 1] = peer;
    }

    /// Slot `index` (1-indexed).
    pub fn get(&self, index: usize) -> &NodeInfo {
        &self.entries[index - 1]
    }

    /// The `(index, start_i)` lookup keys a refresh pass has to resolve.
    pub fn refresh_targets(&self) -> Vec<(usize, u64)> {
        (1..=self.m_bits as usize)
            .map(|i| {
                let start = (self.node.id + (1u64 << (i - 1))) % ring_size(self.m_bits);
                (i, start)
            })
            .collect()
    }

    /// Closest known node preceding `key`.
    ///
    /// Scans from the highest slot down so the longest jumps are tried
    /// first, which is what gives lookups their O(log N) hop bound. Returns
    /// the owning node itself when no entry qualifies; the caller then
    /// claims the key or falls back to its successor.
    pub fn closest_preceding(&self, key: u64) -> NodeInfo {
        for entry in self.entries.iter().rev() {
            if in_open(self.node.id, entry.id, key) {
                return entry.clone();
            }
        }
        self.node.clone()
    }

    /// Entry ids in slot order, for state snapshots.
    pub fn ids(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.id).collect()
    }
}
