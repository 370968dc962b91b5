use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ChordError;
use crate::chord::hashing::{dht_hash, in_half_open, in_open, ring_size};
use crate::chord::node::{ChordNode, NodeInfo};
use crate::storage::StorageBackend;
use crate::transport::Transport;

pub const DEFAULT_STABILIZE_PERIOD: Duration = Duration::from_secs(2);
const JOIN_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Consistent view of one node's ring pointers, as served by `/chord/info`.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub info: NodeInfo,
    pub successor: NodeInfo,
    pub predecessor: Option<NodeInfo>,
    pub finger_ids: Vec<u64>,
}

/// Orchestrates one ring member.
///
/// Owns the [`ChordNode`] state behind a coarse lock and drives it with
/// transport and storage side effects: the join handshake, iterative
/// find-successor routing, the periodic stabilization cycle, key migration,
/// and the client file operations.
///
/// The lock is only ever held for in-memory reads and updates. Every method
/// takes a consistent snapshot, releases, performs its I/O, and re-acquires
/// only to commit, so inbound handlers and the stabilization task can run
/// concurrently.
pub struct NodeService {
    self_id: u64,
    self_address: String,
    node: RwLock<ChordNode>,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn StorageBackend>,
    m_bits: u8,
    max_hops: usize,
    stabilize_period: Duration,
    bootstrap: Option<String>,
}

impl NodeService {
    pub fn new(
        address: String,
        bootstrap: Option<String>,
        m_bits: u8,
        stabilize_period: Duration,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let id = dht_hash(address.as_bytes(), m_bits);
        Self::build(
            id,
            address,
            bootstrap,
            m_bits,
            stabilize_period,
            transport,
            storage,
        )
    }

    #[cfg(test)]
    pub(crate) fn with_id(
        id: u64,
        address: String,
        m_bits: u8,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self::build(
            id,
            address,
            None,
            m_bits,
            DEFAULT_STABILIZE_PERIOD,
            transport,
            storage,
        )
    }

    fn build(
        id: u64,
        address: String,
        bootstrap: Option<String>,
        m_bits: u8,
        stabilize_period: Duration,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let node = ChordNode::new(id, address.clone(), m_bits);
        Self {
            self_id: id,
            self_address: address,
            node: RwLock::new(node),
            transport,
            storage,
            m_bits,
            max_hops: m_bits as usize,
            stabilize_period,
            bootstrap,
        }
    }

    pub fn id(&self) -> u64 {
        self.self_id
    }

    pub fn address(&self) -> &str {
        &self.self_address
    }

    pub fn m_bits(&self) -> u8 {
        self.m_bits
    }

    pub fn ring_size(&self) -> u64 {
        ring_size(self.m_bits)
    }

    /// Key of a filename on this ring.
    pub fn key_of(&self, filename: &str) -> u64 {
        dht_hash(filename.as_bytes(), self.m_bits)
    }

    fn read_node(&self) -> Result<RwLockReadGuard<'_, ChordNode>, ChordError> {
        self.node
            .read()
            .map_err(|_| ChordError::Internal("node state lock poisoned".to_string()))
    }

    fn write_node(&self) -> Result<RwLockWriteGuard<'_, ChordNode>, ChordError> {
        self.node
            .write()
            .map_err(|_| ChordError::Internal("node state lock poisoned".to_string()))
    }

    fn self_info(&self) -> NodeInfo {
        NodeInfo {
            id: self.self_id,
            address: self.self_address.clone(),
        }
    }

    fn is_responsible_for(&self, key: u64) -> Result<bool, ChordError> {
        Ok(self.read_node()?.is_responsible_for(key))
    }

    pub fn predecessor(&self) -> Result<Option<NodeInfo>, ChordError> {
        Ok(self.read_node()?.predecessor().cloned())
    }

    pub fn snapshot(&self) -> Result<NodeSnapshot, ChordError> {
        let node = self.read_node()?;
        Ok(NodeSnapshot {
            info: node.info(),
            successor: node.successor().clone(),
            predecessor: node.predecessor().cloned(),
            finger_ids: node.finger().ids(),
        })
    }

    // --- Boot and join -----------------------------------------------------

    /// Join the ring if a bootstrap peer is configured, then spawn the
    /// stabilization task. Returns its handle so the caller can abort it at
    /// shutdown.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, ChordError> {
        info!("Starting node {} at {}", self.self_id, self.self_address);

        if let Some(bootstrap) = self.bootstrap.clone() {
            {
                let node = self.read_node()?;
                if !node.is_alone() || node.predecessor().is_some() {
                    return Err(ChordError::AlreadyBootstrapped);
                }
            }
            self.join_ring(&bootstrap).await?;
        }

        let service = self.clone();
        let handle = tokio::spawn(async move { service.run_stabilization().await });
        info!(
            "Node {} started, stabilization loop running",
            self.self_id
        );
        Ok(handle)
    }

    /// Join handshake against `bootstrap`, retried until the peer answers.
    ///
    /// Only the join RPC itself is retried; once a successor is committed,
    /// a failed notify or migration is left to stabilization rather than
    /// re-running the handshake against a ring that already adopted us.
    pub(crate) async fn join_ring(&self, bootstrap: &str) -> Result<(), ChordError> {
        let self_info = self.self_info();

        let successor = loop {
            info!("Attempting to join ring via {}", bootstrap);
            match self.transport.join(bootstrap, &self_info).await {
                Ok(successor) => break successor,
                Err(e) => {
                    warn!("Join attempt failed: {}, retrying...", e);
                    let jitter = rand::random::<u64>() % 500;
                    tokio::time::sleep(JOIN_RETRY_INTERVAL + Duration::from_millis(jitter)).await;
                }
            }
        };

        if successor.id == self_info.id {
            return Err(ChordError::Internal(format!(
                "bootstrap {} returned this node as its own successor",
                bootstrap
            )));
        }

        {
            let mut node = self.write_node()?;
            node.set_successor(successor.clone());
            node.finger_mut().fill(successor.clone());
        }
        info!("Joined ring, successor is {}", successor);

        if let Err(e) = self.transport.notify(&successor.address, &self_info).await {
            // Stabilization re-notifies every cycle.
            warn!("Notify after join failed: {}", e);
        }

        if let Err(e) = self.migrate_from_successor().await {
            warn!("Key migration failed: {}", e);
        }

        Ok(())
    }

    /// Pull the files this node is now responsible for from its successor.
    ///
    /// With no predecessor yet, the successor's own id bounds the range:
    /// scanned against what the successor actually holds, `(succ, self]`
    /// selects exactly the keys that changed owner.
    async fn migrate_from_successor(&self) -> Result<(), ChordError> {
        let (lo, hi, successor) = {
            let node = self.read_node()?;
            if node.is_alone() {
                return Ok(());
            }
            let successor = node.successor().clone();
            let lo = node.predecessor().map(|p| p.id).unwrap_or(successor.id);
            (lo, node.id(), successor)
        };

        let files = self.transport.transfer_range(&successor.address, lo, hi).await?;
        if files.is_empty() {
            return Ok(());
        }

        let count = files.len();
        for (name, content) in files {
            self.storage.save(&name, &content).await?;
        }
        info!("Migrated {} files from {}", count, successor);
        Ok(())
    }

    // --- Inbound protocol handlers ----------------------------------------

    /// Place a joining node on the ring and return its successor.
    pub async fn handle_join(&self, joiner: NodeInfo) -> Result<NodeInfo, ChordError> {
        enum Placement {
            Alone(NodeInfo),
            Between(NodeInfo),
            Route,
        }

        let placement = {
            let mut node = self.write_node()?;
            if joiner.id == node.id() {
                return Err(ChordError::InvalidArgument(format!(
                    "joining id {} collides with this node",
                    joiner.id
                )));
            }
            if node.is_alone() {
                node.set_successor(joiner.clone());
                Placement::Alone(node.info())
            } else if in_open(node.id(), joiner.id, node.successor().id) {
                let old_successor = node.successor().clone();
                node.set_successor(joiner.clone());
                Placement::Between(old_successor)
            } else {
                Placement::Route
            }
        };

        match placement {
            Placement::Alone(me) => {
                info!("Node {} joined; adopted as our successor", joiner);
                Ok(me)
            }
            Placement::Between(old_successor) => {
                info!("Node {} joined between us and {}", joiner, old_successor);
                Ok(old_successor)
            }
            Placement::Route => self.find_successor(joiner.id).await,
        }
    }

    /// Process a notify from a peer that believes it precedes us.
    ///
    /// Migration is the new predecessor's job (it pulls from us as its
    /// successor), so accepting the pointer is all that happens here.
    pub fn handle_notify(&self, candidate: NodeInfo) -> Result<bool, ChordError> {
        let mut node = self.write_node()?;
        let changed = node.notify(candidate.clone());
        if changed {
            info!("Adopted {} as predecessor", candidate);
        }
        Ok(changed)
    }

    /// Single routing step served to remote lookups: this node, its
    /// successor, or the closest preceding finger.
    pub fn route_step(&self, key: u64) -> Result<NodeInfo, ChordError> {
        let node = self.read_node()?;
        if node.is_responsible_for(key) {
            return Ok(node.info());
        }
        if in_half_open(node.id(), key, node.successor().id) {
            return Ok(node.successor().clone());
        }
        let next = node.finger().closest_preceding(key);
        if next.id == node.id() {
            Ok(node.successor().clone())
        } else {
            Ok(next)
        }
    }

    // --- Routing -----------------------------------------------------------

    /// Iteratively resolve the owner of `key`, driving remote routing steps
    /// from this node. Hops are capped at `m_bits`; a transport failure
    /// aborts the lookup with the failing hop's diagnostic.
    pub async fn find_successor(&self, key: u64) -> Result<NodeInfo, ChordError> {
        let (origin, mut cursor) = {
            let node = self.read_node()?;
            if node.is_responsible_for(key) {
                return Ok(node.info());
            }
            if in_half_open(node.id(), key, node.successor().id) {
                return Ok(node.successor().clone());
            }
            let cursor = node.finger().closest_preceding(key);
            if cursor.id == node.id() {
                return Ok(node.successor().clone());
            }
            (node.info(), cursor)
        };

        for _ in 0..self.max_hops {
            let reply = self
                .transport
                .find_successor(&cursor.address, key, &origin.address)
                .await?;
            if reply.id == key {
                return Ok(reply);
            }
            if reply == cursor {
                // The hop either owns the key or cannot improve on itself.
                return Ok(reply);
            }
            cursor = reply;
        }

        debug!(
            "Lookup for {} exhausted {} hops, settling for {}",
            key, self.max_hops, cursor
        );
        Ok(cursor)
    }

    // --- Stabilization ------------------------------------------------------

    pub async fn run_stabilization(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.stabilize_period);
        loop {
            interval.tick().await;
            self.stabilize_once().await;
        }
    }

    pub(crate) async fn stabilize_once(&self) {
        if let Err(e) = self.stabilize_cycle().await {
            warn!("Stabilization cycle failed: {}", e);
        }
    }

    /// One stabilization cycle: verify the successor against its
    /// predecessor pointer, notify it, then refresh every finger. Skipped
    /// entirely while alone.
    async fn stabilize_cycle(&self) -> Result<(), ChordError> {
        let (self_info, successor) = {
            let node = self.read_node()?;
            if node.is_alone() {
                return Ok(());
            }
            (node.info(), node.successor().clone())
        };

        if let Some(candidate) = self.transport.get_predecessor(&successor.address).await? {
            let mut node = self.write_node()?;
            if node.should_update_successor(&candidate) {
                debug!("Updated successor to {}", candidate);
                node.set_successor(candidate);
            }
        }

        let successor = self.read_node()?.successor().clone();
        self.transport.notify(&successor.address, &self_info).await?;

        let targets = self.read_node()?.finger().refresh_targets();
        for (index, start) in targets {
            match self.find_successor(start).await {
                Ok(peer) => {
                    self.write_node()?.finger_mut().update(index, peer);
                }
                Err(e) => {
                    // Next cycle retries.
                    debug!("Failed to refresh finger {}: {}", index, e);
                }
            }
        }

        Ok(())
    }

    // --- Client file operations --------------------------------------------

    /// Store a file on its owner: locally when this node claims the key,
    /// otherwise forwarded to the resolved owner.
    pub async fn save_file(&self, filename: &str, content: Vec<u8>) -> Result<(), ChordError> {
        let key = self.key_of(filename);
        if self.is_responsible_for(key)? {
            self.storage.save(filename, &content).await?;
            debug!("Stored {} locally (key {})", filename, key);
            return Ok(());
        }

        let owner = self.find_successor(key).await?;
        if owner.id == self.self_id {
            self.storage.save(filename, &content).await?;
            return Ok(());
        }
        debug!("Forwarding {} (key {}) to owner {}", filename, key, owner);
        self.transport
            .forward_file(&owner.address, filename, content)
            .await?;
        Ok(())
    }

    /// Fetch a file from its owner, wherever the request landed.
    pub async fn fetch_file(&self, filename: &str) -> Result<Vec<u8>, ChordError> {
        let key = self.key_of(filename);
        if self.is_responsible_for(key)? {
            return self
                .storage
                .get(filename)
                .await?
                .ok_or(ChordError::NotFound);
        }

        let owner = self.find_successor(key).await?;
        if owner.id == self.self_id {
            return self
                .storage
                .get(filename)
                .await?
                .ok_or(ChordError::NotFound);
        }
        self.transport
            .get_file(&owner.address, filename)
            .await?
            .ok_or(ChordError::NotFound)
    }

    /// Delete a file on its owner.
    pub async fn remove_file(&self, filename: &str) -> Result<(), ChordError> {
        let key = self.key_of(filename);
        if self.is_responsible_for(key)? {
            return match self.storage.delete(filename).await? {
                true => Ok(()),
                false => Err(ChordError::NotFound),
            };
        }

        let owner = self.find_successor(key).await?;
        let deleted = if owner.id == self.self_id {
            self.storage.delete(filename).await?
        } else {
            self.transport.delete_file(&owner.address, filename).await?
        };
        match deleted {
            true => Ok(()),
            false => Err(ChordError::NotFound),
        }
    }

    /// Filenames stored on this node. Listing is local-only by design.
    pub async fn list_files(&self) -> Result<Vec<String>, ChordError> {
        Ok(self.storage.list().await?)
    }

    /// Store a file a peer forwarded to us. The sender already resolved
    /// ownership, so no responsibility re-check happens here.
    pub async fn store_forwarded(&self, filename: &str, content: &[u8]) -> Result<(), ChordError> {
        self.storage.save(filename, content).await?;
        debug!("Stored forwarded file {}", filename);
        Ok(())
    }

    /// Strictly local read, for peers that already routed.
    pub async fn local_file(&self, filename: &str) -> Result<Option<Vec<u8>>, ChordError> {
        Ok(self.storage.get(filename).await?)
    }

    /// Strictly local delete, for peers that already routed.
    pub async fn delete_local_file(&self, filename: &str) -> Result<bool, ChordError> {
        Ok(self.storage.delete(filename).await?)
    }

    /// Hand over every local file keyed in `(lo, hi]` and drop it: the
    /// response to the pulling peer is the acknowledgement, making the
    /// exchange a move rather than a copy.
    pub async fn handle_transfer(
        &self,
        lo: u64,
        hi: u64,
    ) -> Result<Vec<(String, Vec<u8>)>, ChordError> {
        let files = self.storage.scan_range(lo, hi).await?;
        for (name, _) in &files {
            self.storage.delete(name).await?;
        }
        if !files.is_empty() {
            info!("Handed over {} files in ({}, {}]", files.len(), lo, hi);
        }
        Ok(files)
    }
}
