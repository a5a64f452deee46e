//! Distributed Hash Table ([BEP-5]).
//!
//! This module implements a Kademlia-based DHT node speaking the BitTorrent
//! Mainline wire protocol. Nodes are identified by 160-bit IDs, torrents by
//! their 20-byte infohash, and closeness is the XOR distance between the
//! two.
//!
//! # Getting Started
//!
//! ```no_run
//! use std::net::{Ipv4Addr, SocketAddrV4};
//! use mdht::dht::DhtNode;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Bind to a UDP port
//! let node = DhtNode::bind(6881).await?;
//!
//! // Seed the overlay with a known node and bootstrap from it
//! node.add_seed(SocketAddrV4::new(Ipv4Addr::new(67, 215, 246, 10), 6881));
//! node.bootstrap().await;
//!
//! // Look up nodes close to a torrent's infohash
//! let contacts = node.find_peers([0u8; 20]).await;
//! for contact in contacts {
//!     println!("found {}", contact.addr);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`DhtNode`] - the protocol engine: serial UDP dispatcher, outbound
//!   queries, bootstrap driver and peer store
//! - [`RoutingTable`] - lazily grown k-buckets of [`Contact`]s with the
//!   ping-probe eviction rule
//! - [`DhtMessage`] - the bencoded query/response/error envelope
//! - [`Transport`] - thin UDP adapter (bound dispatcher socket, ephemeral
//!   query sockets, receive timeouts)
//!
//! [BEP-5]: http://bittorrent.org/beps/bep_0005.html

mod error;
mod message;
mod node;
mod peer_store;
mod routing;
mod server;
mod transport;

pub use error::DhtError;
pub use message::{Body, DhtMessage, DhtQuery, DhtResponse, TransactionId};
pub use node::{Contact, NodeId};
pub use peer_store::{PeerStore, Retention};
pub use routing::{InsertOutcome, RoutingTable, K};
pub use server::{DhtNode, DEFAULT_PORT};
pub use transport::Transport;

#[cfg(test)]
mod tests;
