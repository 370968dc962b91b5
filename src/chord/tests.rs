//! Chord Core Tests
//!
//! Validates the pure overlay logic: identifier hashing, the circular
//! between-ness laws, finger table behavior, and the node state machine's
//! decision rules.

#[cfg(test)]
mod tests {
    use crate::chord::finger_table::FingerTable;
    use crate::chord::hashing::{dht_hash, in_half_open, in_open, ring_size, DEFAULT_M_BITS};
    use crate::chord::node::{ChordNode, NodeInfo};

    const M: u8 = DEFAULT_M_BITS;

    fn peer(id: u64) -> NodeInfo {
        NodeInfo {
            id,
            address: format!("node-{}:5000", id),
        }
    }

    // ============================================================
    // HASHING TESTS
    // ============================================================

    #[test]
    fn test_hash_is_deterministic() {
        let h1 = dht_hash(b"foo.txt", M);
        let h2 = dht_hash(b"foo.txt", M);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_stays_within_ring() {
        for i in 0..1000 {
            let name = format!("file-{}.txt", i);
            let key = dht_hash(name.as_bytes(), M);
            assert!(key < ring_size(M), "key {} outside ring", key);
        }
    }

    #[test]
    fn test_hash_narrower_ring_is_consistent() {
        // Reducing modulo a smaller power of two must agree with reducing
        // the wider hash again.
        for i in 0..100 {
            let name = format!("file-{}.txt", i);
            let wide = dht_hash(name.as_bytes(), 16);
            let narrow = dht_hash(name.as_bytes(), 10);
            assert_eq!(narrow, wide % ring_size(10));
        }
    }

    #[test]
    fn test_hash_distribution_is_roughly_uniform() {
        let mut counts = std::collections::HashMap::new();
        for i in 0..10_000 {
            let name = format!("book_{}", i);
            *counts.entry(dht_hash(name.as_bytes(), M)).or_insert(0u32) += 1;
        }
        // 10k keys over 1024 buckets: nearly every bucket should be hit and
        // none should dominate.
        assert!(
            counts.len() > 900,
            "only {} distinct buckets were hit",
            counts.len()
        );
        let max = counts.values().max().copied().unwrap_or(0);
        assert!(max < 50, "one bucket received {} keys", max);
    }

    // ============================================================
    // BETWEEN-NESS TESTS
    // ============================================================

    #[test]
    fn test_in_open_basic() {
        assert!(in_open(100, 250, 400));
        assert!(!in_open(100, 100, 400));
        assert!(!in_open(100, 400, 400));
        assert!(!in_open(100, 500, 400));
    }

    #[test]
    fn test_in_open_wraparound() {
        assert!(in_open(800, 900, 100));
        assert!(in_open(800, 50, 100));
        assert!(!in_open(800, 400, 100));
        assert!(!in_open(800, 800, 100));
        assert!(!in_open(800, 100, 100));
    }

    #[test]
    fn test_in_open_degenerate_interval_is_full_ring() {
        assert!(in_open(100, 99, 100));
        assert!(in_open(100, 101, 100));
        assert!(!in_open(100, 100, 100));
    }

    #[test]
    fn test_in_half_open_includes_end() {
        assert!(in_half_open(100, 400, 400));
        assert!(in_half_open(800, 100, 100));
        assert!(!in_half_open(100, 100, 400));
        assert!(!in_half_open(800, 800, 100));
    }

    #[test]
    fn test_in_half_open_degenerate_interval_is_everything() {
        assert!(in_half_open(100, 100, 100));
        assert!(in_half_open(100, 99, 100));
        assert!(in_half_open(100, 900, 100));
    }

    #[test]
    fn test_between_ness_partitions_the_ring() {
        // For distinct a and b, every k is either in (a, b), in (b, a), or
        // one of the endpoints, and never more than one of those.
        for a in 0..32u64 {
            for b in 0..32u64 {
                if a == b {
                    continue;
                }
                for k in 0..32u64 {
                    let forward = in_open(a, k, b);
                    let backward = in_open(b, k, a) || k == a || k == b;
                    assert!(
                        forward != backward,
                        "a={} b={} k={}: forward={} backward={}",
                        a,
                        b,
                        k,
                        forward,
                        backward
                    );
                }
            }
        }
    }

    #[test]
    fn test_half_open_halves_are_disjoint_and_complete() {
        for a in 0..32u64 {
            for b in 0..32u64 {
                if a == b {
                    continue;
                }
                for k in 0..32u64 {
                    let forward = in_half_open(a, k, b);
                    let backward = in_half_open(b, k, a);
                    assert!(forward ^ backward, "a={} b={} k={}", a, b, k);
                }
            }
        }
    }

    // ============================================================
    // FINGER TABLE TESTS
    // ============================================================

    #[test]
    fn test_new_table_points_at_self() {
        let table = FingerTable::new(peer(100), M);
        assert_eq!(table.ids(), vec![100; M as usize]);
    }

    #[test]
    fn test_fill_and_update() {
        let mut table = FingerTable::new(peer(100), M);
        table.fill(peer(400));
        assert_eq!(table.ids(), vec![400; M as usize]);

        table.update(3, peer(800));
        assert_eq!(table.get(3).id, 800);
        assert_eq!(table.get(2).id, 400);
    }

    #[test]
    fn test_refresh_targets_cover_all_slots() {
        let table = FingerTable::new(peer(100), M);
        let targets = table.refresh_targets();

        assert_eq!(targets.len(), M as usize);
        assert_eq!(targets[0], (1, 101));
        assert_eq!(targets[1], (2, 102));
        assert_eq!(targets[9], (10, 612));
    }

    #[test]
    fn test_refresh_targets_wrap_around() {
        let table = FingerTable::new(peer(1000), M);
        let targets = table.refresh_targets();
        // 1000 + 512 wraps past the top of the ring.
        assert_eq!(targets[9], (10, (1000 + 512) % 1024));
    }

    #[test]
    fn test_closest_preceding_scans_from_the_top() {
        let mut table = FingerTable::new(peer(0), M);
        table.update(3, peer(300));
        table.update(5, peer(700));
        table.update(10, peer(900));

        // 900 overshoots 800, 700 is the highest slot that precedes it.
        assert_eq!(table.closest_preceding(800).id, 700);
        assert_eq!(table.closest_preceding(500).id, 300);
    }

    #[test]
    fn test_closest_preceding_returns_self_when_nothing_qualifies() {
        let mut table = FingerTable::new(peer(100), M);
        table.fill(peer(900));
        // Every entry overshoots the key, so the caller has to fall back.
        assert_eq!(table.closest_preceding(500).id, 100);
    }

    // ============================================================
    // CHORD NODE TESTS
    // ============================================================

    #[test]
    fn test_new_node_is_alone_and_claims_the_whole_ring() {
        let node = ChordNode::new(100, "node-100:5000".to_string(), M);
        assert!(node.is_alone());
        assert!(node.predecessor().is_none());
        assert_eq!(node.successor().id, 100);

        for key in [0, 99, 100, 101, 1023] {
            assert!(node.is_responsible_for(key), "alone node must own {}", key);
        }
    }

    #[test]
    fn test_node_without_predecessor_defers_to_routing() {
        let mut node = ChordNode::new(100, "node-100:5000".to_string(), M);
        node.set_successor(peer(400));

        for key in [0, 100, 150, 1023] {
            assert!(!node.is_responsible_for(key));
        }
    }

    #[test]
    fn test_responsibility_is_half_open_from_predecessor() {
        let mut node = ChordNode::new(400, "node-400:5000".to_string(), M);
        node.set_successor(peer(800));
        node.set_predecessor(peer(100));

        assert!(node.is_responsible_for(350));
        assert!(node.is_responsible_for(400));
        assert!(!node.is_responsible_for(100));
        assert!(!node.is_responsible_for(401));
        assert!(!node.is_responsible_for(900));
    }

    #[test]
    fn test_responsibility_wraps_around_zero() {
        let mut node = ChordNode::new(100, "node-100:5000".to_string(), M);
        node.set_successor(peer(400));
        node.set_predecessor(peer(800));

        assert!(node.is_responsible_for(900));
        assert!(node.is_responsible_for(0));
        assert!(node.is_responsible_for(100));
        assert!(!node.is_responsible_for(800));
        assert!(!node.is_responsible_for(400));
    }

    #[test]
    fn test_should_update_successor_only_for_closer_nodes() {
        let mut node = ChordNode::new(100, "node-100:5000".to_string(), M);
        node.set_successor(peer(800));

        assert!(node.should_update_successor(&peer(400)));
        assert!(!node.should_update_successor(&peer(900)));
        assert!(!node.should_update_successor(&peer(800)));
        assert!(!node.should_update_successor(&peer(100)));
    }

    #[test]
    fn test_should_update_successor_when_alone() {
        let node = ChordNode::new(100, "node-100:5000".to_string(), M);
        // Any other node beats pointing at ourselves.
        assert!(node.should_update_successor(&peer(400)));
        assert!(!node.should_update_successor(&peer(100)));
    }

    #[test]
    fn test_notify_sets_first_predecessor() {
        let mut node = ChordNode::new(400, "node-400:5000".to_string(), M);
        assert!(node.notify(peer(100)));
        assert_eq!(node.predecessor().map(|p| p.id), Some(100));
    }

    #[test]
    fn test_notify_replaces_predecessor_with_closer_node() {
        let mut node = ChordNode::new(400, "node-400:5000".to_string(), M);
        node.set_predecessor(peer(100));

        assert!(node.notify(peer(300)));
        assert_eq!(node.predecessor().map(|p| p.id), Some(300));

        // A farther candidate is rejected and changes nothing.
        assert!(!node.notify(peer(200)));
        assert_eq!(node.predecessor().map(|p| p.id), Some(300));
    }

    #[test]
    fn test_notify_is_idempotent() {
        let mut node = ChordNode::new(400, "node-400:5000".to_string(), M);
        node.set_predecessor(peer(100));

        for _ in 0..3 {
            assert!(!node.notify(peer(100)));
            assert_eq!(node.predecessor().map(|p| p.id), Some(100));
        }
    }

    #[test]
    fn test_clear_predecessor() {
        let mut node = ChordNode::new(400, "node-400:5000".to_string(), M);
        node.set_predecessor(peer(100));
        node.clear_predecessor();
        assert!(node.predecessor().is_none());
    }

    #[test]
    fn test_peer_equality_is_by_id_only() {
        let a = NodeInfo {
            id: 42,
            address: "left:5000".to_string(),
        };
        let b = NodeInfo {
            id: 42,
            address: "right:6000".to_string(),
        };
        assert_eq!(a, b);
        assert_ne!(a, peer(43));
    }
}
