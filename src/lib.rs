//! mdht - a BitTorrent Mainline DHT node
//!
//! This library implements the core of a Kademlia-style DHT node speaking the
//! BitTorrent Mainline wire protocol ([BEP-5]), together with the pieces it
//! cannot exist without: the bencode codec ([BEP-3]) that defines the wire
//! format, and the torrent metainfo decoder that produces the infohash the
//! DHT is queried against.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`metainfo`] - Torrent metainfo parsing and infohash computation
//! - [`dht`] - BEP-5 node identifiers, routing table, wire messages and the
//!   UDP protocol engine
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-5]: http://bittorrent.org/beps/bep_0005.html

pub mod bencode;
pub mod dht;
pub mod metainfo;

pub use bencode::{decode, decode_prefix, encode, BencodeError, Dictionary, Value};
pub use dht::{
    Contact, DhtError, DhtMessage, DhtNode, DhtQuery, DhtResponse, NodeId, RoutingTable,
    TransactionId,
};
pub use metainfo::{File, Info, InfoHash, Metainfo, MetainfoError};
