use std::net::{SocketAddr, SocketAddrV4};

use bytes::Bytes;
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::error::DhtError;
use super::message::{Body, DhtMessage, DhtQuery, TransactionId};
use super::node::{Contact, NodeId};
use super::peer_store::{PeerStore, Retention};
use super::routing::{InsertOutcome, RoutingTable, K};
use super::transport::{Transport, MAX_DATAGRAM};

/// Default Mainline DHT listen port.
pub const DEFAULT_PORT: u16 = 6881;

/// A Mainline DHT node.
///
/// The node owns a single bound UDP socket for the passive dispatcher loop
/// ([`run`](Self::run)); outbound queries each use a dedicated ephemeral
/// socket and correlate request to reply by pairing the send with the next
/// receive on that socket. Dispatch is strictly serial: one
/// receive-decode-handle-reply cycle at a time, so routing table and peer
/// store mutations never interleave. Folding a query's sender into the
/// routing table happens after its reply is sent, so the eviction probe of
/// a full bucket delays the next receive but never the reply itself.
///
/// # Examples
///
/// ```no_run
/// use std::net::{Ipv4Addr, SocketAddrV4};
/// use mdht::dht::DhtNode;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let node = DhtNode::bind(6881).await?;
/// node.add_seed(SocketAddrV4::new(Ipv4Addr::new(67, 215, 246, 10), 6881));
/// node.bootstrap().await;
/// node.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct DhtNode {
    transport: Transport,
    local_id: NodeId,
    table: RwLock<RoutingTable>,
    peers: RwLock<PeerStore>,
    seeds: RwLock<Vec<Contact>>,
    port: u16,
}

impl DhtNode {
    /// Binds the dispatcher socket and generates a random node ID.
    ///
    /// Bind failure is fatal; there is no node without its socket.
    pub async fn bind(port: u16) -> Result<Self, DhtError> {
        Self::bind_with_id(port, NodeId::generate()).await
    }

    /// Binds the dispatcher socket with a caller-chosen node ID.
    pub async fn bind_with_id(port: u16, local_id: NodeId) -> Result<Self, DhtError> {
        let transport = Transport::bind(port).await?;
        let port = transport.local_port()?;

        info!("dht node bound to port {} with id {}", port, local_id);

        Ok(Self {
            transport,
            local_id,
            table: RwLock::new(RoutingTable::new(local_id)),
            peers: RwLock::new(PeerStore::new()),
            seeds: RwLock::new(Vec::new()),
            port,
        })
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Registers a seed node for bootstrapping. The seed's real ID is not
    /// known yet, so it carries a placeholder random ID until learned from
    /// a reply.
    pub fn add_seed(&self, addr: SocketAddrV4) {
        self.seeds.write().push(Contact::new(NodeId::generate(), addr));
    }

    /// Replaces the announce retention policy. Announces recorded so far
    /// are discarded; call this before [`run`](Self::run).
    pub fn set_retention(&self, retention: Retention) {
        *self.peers.write() = PeerStore::with_retention(retention);
    }

    /// Joins the overlay: asks every seed for the nodes closest to our own
    /// ID and folds the answers into the routing table.
    pub async fn bootstrap(&self) {
        let seeds = self.seeds.read().clone();

        for seed in seeds {
            debug!("contacting seed {}", seed.addr);
            let found = self.send_find_node(seed.addr, self.local_id).await;
            for contact in found {
                self.integrate(contact).await;
            }
        }

        info!(
            "bootstrap complete, {} contacts in routing table",
            self.table.read().len()
        );
    }

    /// Asks every seed for nodes close to `info_hash` and accumulates the
    /// answers. Failures contribute an empty answer; this never errors.
    pub async fn find_peers(&self, info_hash: [u8; 20]) -> Vec<Contact> {
        let target = NodeId(info_hash);
        let seeds = self.seeds.read().clone();

        let lookups = seeds
            .iter()
            .map(|seed| self.send_find_node(seed.addr, target));

        let mut found = Vec::new();
        for contacts in join_all(lookups).await {
            found.extend(contacts);
        }
        found
    }

    /// Pings a node; `true` if it sent back any well-formed response within
    /// the query timeout.
    pub async fn ping(&self, addr: SocketAddrV4) -> bool {
        let msg = DhtMessage::ping(self.new_transaction_id(), self.local_id);

        match self.query(addr, &msg).await {
            Ok(reply) => matches!(reply.body, Body::Response(_)),
            Err(e) => {
                debug!("ping to {} failed: {}", addr, e);
                false
            }
        }
    }

    /// All contacts currently in the routing table, a read-only snapshot.
    pub fn contacts(&self) -> Vec<Contact> {
        self.table.read().contacts()
    }

    pub fn node_count(&self) -> usize {
        self.table.read().len()
    }

    /// Runs the passive dispatcher loop: receive, decode, handle, reply.
    ///
    /// Malformed datagrams are logged and dropped. Responses arriving here
    /// are unsolicited (outbound queries listen on their own sockets) and
    /// are only logged. Unknown query names are ignored without an error
    /// reply.
    pub async fn run(&self) -> Result<(), DhtError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        info!("dht dispatcher listening on port {}", self.port);

        loop {
            let (n, from) = self.transport.recv(&mut buf).await?;

            let from = match from {
                SocketAddr::V4(v4) => v4,
                SocketAddr::V6(addr) => {
                    debug!("dropping datagram from non-ipv4 sender {}", addr);
                    continue;
                }
            };

            let msg = match DhtMessage::parse(&buf[..n]) {
                Ok(msg) => msg,
                Err(e) => {
                    debug!("dropping malformed datagram from {}: {}", from, e);
                    continue;
                }
            };

            match msg.body {
                Body::Query { sender, query } => {
                    let reply = self.dispatch(msg.transaction_id, from, query);
                    if let Err(e) = self.transport.send(&reply.encode(), SocketAddr::V4(from)).await
                    {
                        warn!("failed to send reply to {}: {}", from, e);
                    }

                    // The sender is folded in only after its reply is on
                    // the wire: a full-bucket probe can wait out the whole
                    // query timeout on an unrelated contact, and that wait
                    // must stall the loop, not this sender's reply.
                    self.integrate(Contact::new(sender, from)).await;
                }
                Body::Response(_) => {
                    debug!(
                        "unsolicited response from {} (t = {:02x?})",
                        from,
                        msg.transaction_id.as_ref()
                    );
                }
                Body::Error { code, message } => {
                    debug!("error message from {}: {} {}", from, code, message);
                }
            }
        }
    }

    /// Builds the reply for one inbound query. Pure with respect to the
    /// network: all I/O stays in [`run`](Self::run).
    pub(super) fn dispatch(
        &self,
        tid: TransactionId,
        from: SocketAddrV4,
        query: DhtQuery,
    ) -> DhtMessage {
        match query {
            DhtQuery::Ping => DhtMessage::pong(tid, self.local_id),
            DhtQuery::FindNode { target } => {
                let nodes = self.table.read().closest(&target, K);
                DhtMessage::nodes_reply(tid, self.local_id, nodes)
            }
            DhtQuery::GetPeers { info_hash } => {
                let known = self.peers.write().get(&info_hash);
                if known.is_empty() {
                    let nodes = self.table.read().closest(&NodeId(info_hash), K);
                    DhtMessage::nodes_reply(tid, self.local_id, nodes)
                } else {
                    DhtMessage::values_reply(tid, self.local_id, known)
                }
            }
            DhtQuery::AnnouncePeer { info_hash, port } => {
                // The announced port argument wins over the UDP source port.
                let peer = SocketAddrV4::new(*from.ip(), port);
                self.peers.write().insert(info_hash, peer);
                debug!(
                    "stored peer {} for info hash {:02x?}",
                    peer,
                    &info_hash[..4]
                );
                DhtMessage::pong(tid, self.local_id)
            }
        }
    }

    /// Folds a contact into the routing table, probing the bucket head with
    /// a ping when the bucket is full.
    pub(super) async fn integrate(&self, contact: Contact) {
        let outcome = self.table.write().insert(contact);

        if let InsertOutcome::BucketFull { oldest } = outcome {
            let alive = self.ping(oldest.addr).await;
            self.table.write().apply_probe(oldest, contact, alive);
        }
    }

    /// Sends `find_node` to one address and parses the compact node list
    /// from the reply. Any failure (send, timeout, malformed or mismatched
    /// reply) yields an empty list.
    async fn send_find_node(&self, addr: SocketAddrV4, target: NodeId) -> Vec<Contact> {
        let tid = self.new_transaction_id();
        let msg = DhtMessage::find_node(tid.clone(), self.local_id, target);

        match self.query(addr, &msg).await {
            Ok(reply) => {
                if reply.transaction_id != tid {
                    debug!("find_node reply from {} with foreign transaction id", addr);
                    return Vec::new();
                }
                match reply.body {
                    Body::Response(response) => response.nodes.unwrap_or_default(),
                    _ => Vec::new(),
                }
            }
            Err(e) => {
                debug!("find_node to {} failed: {}", addr, e);
                Vec::new()
            }
        }
    }

    /// One query/reply exchange over a dedicated ephemeral socket.
    async fn query(&self, addr: SocketAddrV4, msg: &DhtMessage) -> Result<DhtMessage, DhtError> {
        let socket = Transport::ephemeral().await?;
        let reply = socket.exchange(&msg.encode(), SocketAddr::V4(addr)).await?;
        DhtMessage::parse(&reply)
    }

    fn new_transaction_id(&self) -> TransactionId {
        Bytes::copy_from_slice(&rand::random::<[u8; 2]>())
    }
}
