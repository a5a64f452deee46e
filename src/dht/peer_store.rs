use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

/// Retention policy for announced peers.
///
/// The protocol core does not mandate one, so the policy is data handed to
/// the store rather than constants baked into it.
#[derive(Debug, Clone, Copy)]
pub struct Retention {
    /// How long an announce stays valid without being refreshed.
    pub lifetime: Duration,
    /// Upper bound on peers tracked per infohash.
    pub capacity: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(30 * 60),
            capacity: 1000,
        }
    }
}

/// Peers announced for each infohash.
///
/// Each swarm is keyed by peer address, so a re-announce refreshes the
/// existing entry in place. Expired announces are swept whenever a swarm is
/// touched, and a swarm at capacity displaces its stalest announce rather
/// than turning newcomers away. Swarms that sweep down to nothing are
/// dropped entirely, so dead infohashes do not pin map entries.
#[derive(Default)]
pub struct PeerStore {
    retention: Retention,
    swarms: HashMap<[u8; 20], BTreeMap<SocketAddrV4, Instant>>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::with_retention(Retention::default())
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            retention,
            swarms: HashMap::new(),
        }
    }

    pub fn insert(&mut self, info_hash: [u8; 20], addr: SocketAddrV4) {
        let now = Instant::now();
        let lifetime = self.retention.lifetime;
        let swarm = self.swarms.entry(info_hash).or_default();

        swarm.retain(|_, announced| now.duration_since(*announced) < lifetime);

        if swarm.len() >= self.retention.capacity && !swarm.contains_key(&addr) {
            let stalest = swarm
                .iter()
                .min_by_key(|(_, announced)| **announced)
                .map(|(peer, _)| *peer);
            if let Some(stalest) = stalest {
                swarm.remove(&stalest);
            }
        }

        swarm.insert(addr, now);
    }

    pub fn get(&mut self, info_hash: &[u8; 20]) -> Vec<SocketAddrV4> {
        let now = Instant::now();
        let lifetime = self.retention.lifetime;

        let Some(swarm) = self.swarms.get_mut(info_hash) else {
            return Vec::new();
        };

        swarm.retain(|_, announced| now.duration_since(*announced) < lifetime);
        if swarm.is_empty() {
            self.swarms.remove(info_hash);
            return Vec::new();
        }

        swarm.keys().copied().collect()
    }
}
