use sha1::{Digest, Sha1};

/// Default width of the identifier space in bits (ring size 1024).
pub const DEFAULT_M_BITS: u8 = 10;

/// Number of identifiers in a ring of `m_bits` bits.
pub fn ring_size(m_bits: u8) -> u64 {
    1u64 << m_bits
}

/// Hash arbitrary bytes onto the ring.
///
/// SHA-1 of the input, interpreted as a big-endian integer, reduced modulo
/// `2^m_bits`. Every node and every client must derive the same id for the
/// same input, so this is the only hash function used anywhere in the system.
pub fn dht_hash(data: &[u8], m_bits: u8) -> u64 {
    let digest = Sha1::digest(data);
    // Reducing the 160-bit big-endian integer modulo a power of two only
    // depends on its trailing bytes.
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&digest[12..20]);
    u64::from_be_bytes(tail) % ring_size(m_bits)
}

/// True iff `key` lies in the open circular interval `(start, end)`.
///
/// When `start == end` the interval covers the whole ring except `start`.
pub fn in_open(start: u64, key: u64, end: u64) -> bool {
    if start < end {
        start < key && key < end
    } else if start > end {
        key > start || key < end
    } else {
        key != start
    }
}

/// True iff `key` lies in the half-open circular interval `(start, end]`.
///
/// When `start == end` the interval covers the whole ring.
pub fn in_half_open(start: u64, key: u64, end: u64) -> bool {
    if start < end {
        start < key && key <= end
    } else if start > end {
        key > start || key <= end
    } else {
        true
    }
}
