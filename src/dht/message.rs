use std::net::{Ipv4Addr, SocketAddrV4};

use bytes::Bytes;

use super::error::DhtError;
use super::node::{Contact, NodeId};
use crate::bencode::{decode, encode, Dictionary, Value};

/// Opaque query-reply correlator chosen by the originator and echoed by the
/// responder.
pub type TransactionId = Bytes;

/// The four Mainline DHT queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhtQuery {
    Ping,
    FindNode {
        target: NodeId,
    },
    GetPeers {
        info_hash: [u8; 20],
    },
    AnnouncePeer {
        info_hash: [u8; 20],
        port: u16,
    },
}

impl DhtQuery {
    fn name(&self) -> &'static str {
        match self {
            DhtQuery::Ping => "ping",
            DhtQuery::FindNode { .. } => "find_node",
            DhtQuery::GetPeers { .. } => "get_peers",
            DhtQuery::AnnouncePeer { .. } => "announce_peer",
        }
    }
}

/// A response payload: the responder's ID plus whichever of the `nodes` and
/// `values` fields were present on the wire.
#[derive(Debug, Clone)]
pub struct DhtResponse {
    pub id: NodeId,
    /// Contacts from the compact `nodes` field, if present.
    pub nodes: Option<Vec<Contact>>,
    /// Peer endpoints from the compact `values` field, if present.
    pub values: Option<Vec<SocketAddrV4>>,
}

#[derive(Debug, Clone)]
pub enum Body {
    Query { sender: NodeId, query: DhtQuery },
    Response(DhtResponse),
    Error { code: i64, message: String },
}

/// One DHT datagram: a transaction ID and a query, response, or error body.
#[derive(Debug, Clone)]
pub struct DhtMessage {
    pub transaction_id: TransactionId,
    pub body: Body,
}

impl DhtMessage {
    pub fn ping(transaction_id: TransactionId, sender: NodeId) -> Self {
        Self::query(transaction_id, sender, DhtQuery::Ping)
    }

    pub fn find_node(transaction_id: TransactionId, sender: NodeId, target: NodeId) -> Self {
        Self::query(transaction_id, sender, DhtQuery::FindNode { target })
    }

    pub fn get_peers(transaction_id: TransactionId, sender: NodeId, info_hash: [u8; 20]) -> Self {
        Self::query(transaction_id, sender, DhtQuery::GetPeers { info_hash })
    }

    pub fn announce_peer(
        transaction_id: TransactionId,
        sender: NodeId,
        info_hash: [u8; 20],
        port: u16,
    ) -> Self {
        Self::query(
            transaction_id,
            sender,
            DhtQuery::AnnouncePeer { info_hash, port },
        )
    }

    fn query(transaction_id: TransactionId, sender: NodeId, query: DhtQuery) -> Self {
        Self {
            transaction_id,
            body: Body::Query { sender, query },
        }
    }

    /// A bare `{id}` reply, used to answer both `ping` and `announce_peer`.
    pub fn pong(transaction_id: TransactionId, id: NodeId) -> Self {
        Self {
            transaction_id,
            body: Body::Response(DhtResponse {
                id,
                nodes: None,
                values: None,
            }),
        }
    }

    /// A reply carrying compact node info, for `find_node` and for
    /// `get_peers` misses.
    pub fn nodes_reply(transaction_id: TransactionId, id: NodeId, nodes: Vec<Contact>) -> Self {
        Self {
            transaction_id,
            body: Body::Response(DhtResponse {
                id,
                nodes: Some(nodes),
                values: None,
            }),
        }
    }

    /// A reply carrying a compact peer list, for `get_peers` hits.
    pub fn values_reply(
        transaction_id: TransactionId,
        id: NodeId,
        values: Vec<SocketAddrV4>,
    ) -> Self {
        Self {
            transaction_id,
            body: Body::Response(DhtResponse {
                id,
                nodes: None,
                values: Some(values),
            }),
        }
    }

    /// Parses one datagram.
    pub fn parse(data: &[u8]) -> Result<Self, DhtError> {
        let root = decode(data)?;

        if root.as_dict().is_none() {
            return Err(DhtError::InvalidMessage("expected dict".into()));
        }

        let transaction_id = root
            .entry_bytes(b"t")
            .cloned()
            .ok_or_else(|| DhtError::InvalidMessage("missing transaction id".into()))?;

        let msg_type = root
            .entry_str(b"y")
            .ok_or_else(|| DhtError::InvalidMessage("missing message type".into()))?;

        let body = match msg_type {
            "q" => parse_query(&root)?,
            "r" => parse_response(&root)?,
            "e" => parse_error(&root)?,
            _ => {
                return Err(DhtError::InvalidMessage(format!(
                    "unknown message type: {}",
                    msg_type
                )))
            }
        };

        Ok(Self {
            transaction_id,
            body,
        })
    }

    /// Encodes the message into one bencoded datagram.
    pub fn encode(&self) -> Vec<u8> {
        let mut root = Dictionary::new();

        root.insert(
            Bytes::from_static(b"t"),
            Value::Bytes(self.transaction_id.clone()),
        );

        match &self.body {
            Body::Query { sender, query } => {
                root.insert(Bytes::from_static(b"y"), Value::string("q"));
                root.insert(Bytes::from_static(b"q"), Value::string(query.name()));

                let mut args = Dictionary::new();
                args.insert(Bytes::from_static(b"id"), Value::binary(sender.as_bytes()));

                match query {
                    DhtQuery::Ping => {}
                    DhtQuery::FindNode { target } => {
                        args.insert(
                            Bytes::from_static(b"target"),
                            Value::binary(target.as_bytes()),
                        );
                    }
                    DhtQuery::GetPeers { info_hash } => {
                        args.insert(Bytes::from_static(b"info_hash"), Value::binary(info_hash));
                    }
                    DhtQuery::AnnouncePeer { info_hash, port } => {
                        args.insert(Bytes::from_static(b"info_hash"), Value::binary(info_hash));
                        args.insert(Bytes::from_static(b"port"), Value::Integer(*port as i64));
                    }
                }

                root.insert(Bytes::from_static(b"a"), Value::Dict(args));
            }
            Body::Response(response) => {
                root.insert(Bytes::from_static(b"y"), Value::string("r"));

                let mut result = Dictionary::new();
                result.insert(Bytes::from_static(b"id"), Value::binary(response.id.as_bytes()));

                if let Some(nodes) = &response.nodes {
                    let compact: Vec<u8> =
                        nodes.iter().flat_map(|c| c.to_compact()).collect();
                    result.insert(
                        Bytes::from_static(b"nodes"),
                        Value::Bytes(Bytes::from(compact)),
                    );
                }

                if let Some(values) = &response.values {
                    let peers: Vec<Value> = values
                        .iter()
                        .map(|addr| {
                            let mut entry = [0u8; 6];
                            entry[..4].copy_from_slice(&addr.ip().octets());
                            entry[4..6].copy_from_slice(&addr.port().to_be_bytes());
                            Value::binary(&entry)
                        })
                        .collect();
                    result.insert(Bytes::from_static(b"values"), Value::List(peers));
                }

                root.insert(Bytes::from_static(b"r"), Value::Dict(result));
            }
            Body::Error { code, message } => {
                root.insert(Bytes::from_static(b"y"), Value::string("e"));
                root.insert(
                    Bytes::from_static(b"e"),
                    Value::List(vec![Value::Integer(*code), Value::string(message)]),
                );
            }
        }

        encode(&Value::Dict(root))
    }
}

fn parse_query(root: &Value) -> Result<Body, DhtError> {
    let name = root
        .entry_str(b"q")
        .ok_or_else(|| DhtError::InvalidMessage("missing query name".into()))?;

    let args = root
        .entry(b"a")
        .ok_or_else(|| DhtError::InvalidMessage("missing query args".into()))?;

    let sender = args
        .entry_bytes(b"id")
        .and_then(|b| NodeId::from_bytes(b).ok())
        .ok_or_else(|| DhtError::InvalidMessage("missing sender id".into()))?;

    let query = match name {
        "ping" => DhtQuery::Ping,
        "find_node" => {
            let target = args
                .entry_bytes(b"target")
                .and_then(|b| NodeId::from_bytes(b).ok())
                .ok_or_else(|| DhtError::InvalidMessage("missing target".into()))?;
            DhtQuery::FindNode { target }
        }
        "get_peers" => DhtQuery::GetPeers {
            info_hash: parse_info_hash(args)?,
        },
        "announce_peer" => {
            let info_hash = parse_info_hash(args)?;
            let port = args
                .entry_integer(b"port")
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| DhtError::InvalidMessage("missing port".into()))?;
            DhtQuery::AnnouncePeer { info_hash, port }
        }
        _ => {
            return Err(DhtError::InvalidMessage(format!(
                "unknown query: {}",
                name
            )))
        }
    };

    Ok(Body::Query { sender, query })
}

fn parse_info_hash(args: &Value) -> Result<[u8; 20], DhtError> {
    args.entry_bytes(b"info_hash")
        .filter(|b| b.len() == 20)
        .map(|b| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(b);
            hash
        })
        .ok_or_else(|| DhtError::InvalidMessage("missing info_hash".into()))
}

fn parse_response(root: &Value) -> Result<Body, DhtError> {
    let result = root
        .entry(b"r")
        .ok_or_else(|| DhtError::InvalidMessage("missing response dict".into()))?;

    let id = result
        .entry_bytes(b"id")
        .and_then(|b| NodeId::from_bytes(b).ok())
        .ok_or_else(|| DhtError::InvalidMessage("missing id in response".into()))?;

    let nodes = result
        .entry_bytes(b"nodes")
        .map(|blob| Contact::parse_compact_list(blob));

    let values = result.entry_list(b"values").map(|list| {
        list.iter()
            .filter_map(|v| v.as_bytes())
            .filter(|b| b.len() == 6)
            .map(|b| {
                let ip = Ipv4Addr::new(b[0], b[1], b[2], b[3]);
                let port = u16::from_be_bytes([b[4], b[5]]);
                SocketAddrV4::new(ip, port)
            })
            .collect()
    });

    Ok(Body::Response(DhtResponse { id, nodes, values }))
}

fn parse_error(root: &Value) -> Result<Body, DhtError> {
    let error = root
        .entry_list(b"e")
        .ok_or_else(|| DhtError::InvalidMessage("missing error list".into()))?;

    let code = error.first().and_then(|v| v.as_integer()).unwrap_or(0);

    let message = error
        .get(1)
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();

    Ok(Body::Error { code, message })
}
