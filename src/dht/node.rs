use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use rand::Rng as _;

use super::error::DhtError;

/// Length in bytes of a compact node info entry: 20-byte ID, 4-byte IPv4
/// address, 2-byte port, both in network byte order.
pub const COMPACT_NODE_LEN: usize = 26;

/// A 160-bit Kademlia node identifier.
///
/// Infohashes live in the same identifier space, so a target for a lookup
/// can be either a node ID or an infohash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    /// Generates a random node ID from a cryptographically seeded generator.
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        rand::rng().fill(&mut id);
        Self(id)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DhtError> {
        if bytes.len() != 20 {
            return Err(DhtError::InvalidNodeId);
        }
        let mut id = [0u8; 20];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// XOR distance to another ID. Comparing distances as byte arrays gives
    /// unsigned lexicographic order, most-significant octet first.
    pub fn distance(&self, other: &NodeId) -> [u8; 20] {
        let mut dist = [0u8; 20];
        for (i, d) in dist.iter_mut().enumerate() {
            *d = self.0[i] ^ other.0[i];
        }
        dist
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A known DHT node: identifier plus UDP endpoint.
///
/// Contacts are immutable; equality is over the full (id, ip, port) triple.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub id: NodeId,
    pub addr: SocketAddrV4,
}

impl Contact {
    pub fn new(id: NodeId, addr: SocketAddrV4) -> Self {
        Self { id, addr }
    }

    /// Parses one 26-byte compact node info entry.
    pub fn from_compact(data: &[u8]) -> Option<Self> {
        if data.len() != COMPACT_NODE_LEN {
            return None;
        }

        let id = NodeId::from_bytes(&data[..20]).ok()?;
        let ip = Ipv4Addr::new(data[20], data[21], data[22], data[23]);
        let port = u16::from_be_bytes([data[24], data[25]]);

        Some(Self::new(id, SocketAddrV4::new(ip, port)))
    }

    pub fn to_compact(&self) -> [u8; COMPACT_NODE_LEN] {
        let mut compact = [0u8; COMPACT_NODE_LEN];
        compact[..20].copy_from_slice(&self.id.0);
        compact[20..24].copy_from_slice(&self.addr.ip().octets());
        compact[24..26].copy_from_slice(&self.addr.port().to_be_bytes());
        compact
    }

    /// Splits a concatenated compact node blob into contacts. Any trailing
    /// partial entry is discarded.
    pub fn parse_compact_list(blob: &[u8]) -> Vec<Contact> {
        blob.chunks_exact(COMPACT_NODE_LEN)
            .filter_map(Contact::from_compact)
            .collect()
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contact({:?} @ {})", self.id, self.addr)
    }
}
