use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use bytes::Bytes;

use super::*;

fn addr(last: u8) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, last), 6881)
}

/// A contact whose distance to an all-zero local ID has exactly one leading
/// 1-bit, so every one of these lands in bucket 1.
fn bucket_one_contact(i: u8) -> Contact {
    let mut id = [0u8; 20];
    id[0] = 0x80;
    id[19] = i;
    Contact::new(NodeId(id), addr(i))
}

#[test]
fn test_node_id_generate() {
    let id1 = NodeId::generate();
    let id2 = NodeId::generate();
    assert_ne!(id1.0, id2.0);
}

#[test]
fn test_node_id_from_bytes_invalid() {
    assert!(NodeId::from_bytes(&[1u8; 10]).is_err());
    assert!(NodeId::from_bytes(&[1u8; 21]).is_err());
}

#[test]
fn test_xor_metric() {
    let a = NodeId([0x0Fu8; 20]);
    let b = NodeId([0xF0u8; 20]);
    let c = NodeId::generate();

    // identity and symmetry
    assert_eq!(a.distance(&a), [0u8; 20]);
    assert_eq!(a.distance(&b), b.distance(&a));
    assert_eq!(a.distance(&b), [0xFFu8; 20]);

    // d(a, c) == d(a, b) xor d(b, c), bit for bit
    let ab = a.distance(&b);
    let bc = b.distance(&c);
    let ac = a.distance(&c);
    for i in 0..20 {
        assert_eq!(ac[i], ab[i] ^ bc[i]);
    }
}

#[test]
fn test_bucket_index_counts_leading_ones() {
    let table = RoutingTable::new(NodeId([0u8; 20]));

    // distance 0x7F.. starts with a 0 bit
    let mut id = [0u8; 20];
    id[0] = 0x7F;
    assert_eq!(table.bucket_index(&NodeId(id)), 0);

    // distance 0x80.. has one leading 1-bit
    id[0] = 0x80;
    assert_eq!(table.bucket_index(&NodeId(id)), 1);

    // 0xFF 0x80 .. has nine leading 1-bits
    id[0] = 0xFF;
    id[1] = 0x80;
    assert_eq!(table.bucket_index(&NodeId(id)), 9);
}

#[test]
fn test_compact_node_parse() {
    let mut data = [0xAAu8; 26];
    data[20..24].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    data[24..26].copy_from_slice(&[0x1A, 0xE1]);

    let contact = Contact::from_compact(&data).unwrap();
    assert_eq!(contact.id, NodeId([0xAA; 20]));
    assert_eq!(
        contact.addr,
        SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 6881)
    );

    assert_eq!(contact.to_compact(), data);
}

#[test]
fn test_compact_list_discards_trailing_partial() {
    let mut blob = vec![0xABu8; 26];
    blob.extend_from_slice(&[0u8; 10]);

    let contacts = Contact::parse_compact_list(&blob);
    assert_eq!(contacts.len(), 1);
}

#[test]
fn test_insert_rejects_local_id() {
    let local = NodeId::generate();
    let mut table = RoutingTable::new(local);

    assert_eq!(
        table.insert(Contact::new(local, addr(1))),
        InsertOutcome::RejectedSelf
    );
    assert!(table.is_empty());
}

#[test]
fn test_insert_refresh_moves_to_tail() {
    let mut table = RoutingTable::new(NodeId([0u8; 20]));
    let first = bucket_one_contact(1);
    let second = bucket_one_contact(2);

    assert_eq!(table.insert(first), InsertOutcome::Inserted);
    assert_eq!(table.insert(second), InsertOutcome::Inserted);
    assert_eq!(table.insert(first), InsertOutcome::Refreshed);

    assert_eq!(table.contacts(), vec![second, first]);
}

#[test]
fn test_full_bucket_probe_alive_keeps_oldest() {
    let mut table = RoutingTable::new(NodeId([0u8; 20]));
    for i in 0..K as u8 {
        assert_eq!(table.insert(bucket_one_contact(i)), InsertOutcome::Inserted);
    }

    let newcomer = bucket_one_contact(200);
    let outcome = table.insert(newcomer);
    assert_eq!(
        outcome,
        InsertOutcome::BucketFull {
            oldest: bucket_one_contact(0)
        }
    );

    table.apply_probe(bucket_one_contact(0), newcomer, true);

    let contacts = table.contacts();
    assert_eq!(contacts.len(), K);
    assert_eq!(contacts.last(), Some(&bucket_one_contact(0)));
    assert!(!contacts.contains(&newcomer));
}

#[test]
fn test_full_bucket_probe_dead_evicts_oldest() {
    let mut table = RoutingTable::new(NodeId([0u8; 20]));
    for i in 0..K as u8 {
        table.insert(bucket_one_contact(i));
    }

    let newcomer = bucket_one_contact(200);
    let InsertOutcome::BucketFull { oldest } = table.insert(newcomer) else {
        panic!("expected full bucket");
    };

    table.apply_probe(oldest, newcomer, false);

    let contacts = table.contacts();
    assert_eq!(contacts.len(), K);
    assert!(!contacts.contains(&oldest));
    assert_eq!(contacts.last(), Some(&newcomer));
}

#[test]
fn test_bucket_invariants_hold() {
    let local = NodeId::generate();
    let mut table = RoutingTable::new(local);

    for _ in 0..200 {
        let contact = Contact::new(NodeId::generate(), addr(1));
        // Full buckets are left alone; insertion alone must keep invariants.
        let _ = table.insert(contact);
    }

    let contacts = table.contacts();

    let mut seen = HashSet::new();
    let mut per_bucket: HashMap<usize, usize> = HashMap::new();
    for contact in &contacts {
        assert!(seen.insert(contact.id.0), "contact appears twice");
        *per_bucket.entry(table.bucket_index(&contact.id)).or_default() += 1;
    }
    assert!(per_bucket.values().all(|&n| n <= K));
}

#[test]
fn test_closest_returns_sorted_prefix() {
    let mut table = RoutingTable::new(NodeId([0u8; 20]));
    for i in 1..=20u8 {
        let mut id = [0u8; 20];
        id[0] = i;
        table.insert(Contact::new(NodeId(id), addr(i)));
    }

    let mut target_bytes = [0u8; 20];
    target_bytes[0] = 7;
    let target = NodeId(target_bytes);

    let closest = table.closest(&target, 8);
    assert_eq!(closest.len(), 8);

    let mut all = table.contacts();
    all.sort_by_key(|c| c.id.distance(&target));
    all.truncate(8);
    assert_eq!(closest, all);

    for pair in closest.windows(2) {
        assert!(pair[0].id.distance(&target) <= pair[1].id.distance(&target));
    }
}

#[test]
fn test_message_query_roundtrips() {
    let sender = NodeId::generate();
    let target = NodeId::generate();
    let info_hash = [0xABu8; 20];

    let cases = vec![
        DhtMessage::ping(Bytes::from_static(b"aa"), sender),
        DhtMessage::find_node(Bytes::from_static(b"bb"), sender, target),
        DhtMessage::get_peers(Bytes::from_static(b"cc"), sender, info_hash),
        DhtMessage::announce_peer(Bytes::from_static(b"dd"), sender, info_hash, 7070),
    ];

    for original in cases {
        let parsed = DhtMessage::parse(&original.encode()).unwrap();
        assert_eq!(parsed.transaction_id, original.transaction_id);

        let (Body::Query { sender: s1, query: q1 }, Body::Query { sender: s2, query: q2 }) =
            (parsed.body, original.body)
        else {
            panic!("expected queries");
        };
        assert_eq!(s1, s2);
        assert_eq!(q1, q2);
    }
}

#[test]
fn test_ping_wire_format() {
    let msg = DhtMessage::ping(Bytes::from_static(b"aa"), NodeId([0x11; 20]));

    let mut expected = Vec::new();
    expected.extend_from_slice(b"d1:ad2:id20:");
    expected.extend_from_slice(&[0x11; 20]);
    expected.extend_from_slice(b"e1:q4:ping1:t2:aa1:y1:qe");

    assert_eq!(msg.encode(), expected);
}

#[test]
fn test_nodes_reply_roundtrip() {
    let id = NodeId::generate();
    let nodes: Vec<Contact> = (1..=3).map(|i| Contact::new(NodeId([i; 20]), addr(i))).collect();

    let reply = DhtMessage::nodes_reply(Bytes::from_static(b"tx"), id, nodes.clone());
    let parsed = DhtMessage::parse(&reply.encode()).unwrap();

    let Body::Response(response) = parsed.body else {
        panic!("expected response");
    };
    assert_eq!(response.id, id);
    assert_eq!(response.nodes, Some(nodes));
    assert_eq!(response.values, None);
}

#[test]
fn test_values_reply_roundtrip() {
    let id = NodeId::generate();
    let values = vec![
        SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 6881),
        SocketAddrV4::new(Ipv4Addr::new(5, 6, 7, 8), 51413),
    ];

    let reply = DhtMessage::values_reply(Bytes::from_static(b"tx"), id, values.clone());
    let parsed = DhtMessage::parse(&reply.encode()).unwrap();

    let Body::Response(response) = parsed.body else {
        panic!("expected response");
    };
    assert_eq!(response.values, Some(values));
    assert_eq!(response.nodes, None);
}

#[test]
fn test_error_message_roundtrip() {
    let msg = DhtMessage {
        transaction_id: Bytes::from_static(b"ee"),
        body: Body::Error {
            code: 203,
            message: "protocol error".to_string(),
        },
    };

    let parsed = DhtMessage::parse(&msg.encode()).unwrap();
    let Body::Error { code, message } = parsed.body else {
        panic!("expected error");
    };
    assert_eq!(code, 203);
    assert_eq!(message, "protocol error");
}

#[test]
fn test_parse_rejects_unknown_query() {
    let sender = NodeId([0x22; 20]);
    let mut data = Vec::new();
    data.extend_from_slice(b"d1:ad2:id20:");
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(b"e1:q4:vote1:t2:aa1:y1:qe");

    assert!(matches!(
        DhtMessage::parse(&data),
        Err(DhtError::InvalidMessage(_))
    ));
}

#[test]
fn test_peer_store_insert_and_get() {
    let mut store = PeerStore::new();
    let hash = [0x55u8; 20];
    let peer = SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 9), 7000);

    assert!(store.get(&hash).is_empty());

    store.insert(hash, peer);
    store.insert(hash, peer); // re-announce must not duplicate
    assert_eq!(store.get(&hash), vec![peer]);

    assert!(store.get(&[0x66u8; 20]).is_empty());
}

#[test]
fn test_peer_store_capacity_displaces_stalest() {
    let mut store = PeerStore::with_retention(Retention {
        lifetime: std::time::Duration::from_secs(60),
        capacity: 2,
    });
    let hash = [0x55u8; 20];

    store.insert(hash, SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 1), 7000));
    store.insert(hash, SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 2), 7000));
    store.insert(hash, SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 3), 7000));

    let peers = store.get(&hash);
    assert_eq!(peers.len(), 2);
    assert!(peers.contains(&SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 3), 7000)));
}

#[test]
fn test_peer_store_expires_announces() {
    let mut store = PeerStore::with_retention(Retention {
        lifetime: std::time::Duration::ZERO,
        capacity: 2,
    });
    let hash = [0x55u8; 20];

    store.insert(hash, SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 1), 7000));
    assert!(store.get(&hash).is_empty());
}

#[tokio::test]
async fn test_find_node_reply_scenario() {
    let node = DhtNode::bind(0).await.unwrap();
    for i in 1..=3u8 {
        let mut id = [0u8; 20];
        id[19] = i;
        node.integrate(Contact::new(NodeId(id), addr(i))).await;
    }

    let sender = NodeId([0x5A; 20]);
    let target = NodeId([0x77; 20]);
    let mut datagram = Vec::new();
    datagram.extend_from_slice(b"d1:ad2:id20:");
    datagram.extend_from_slice(sender.as_bytes());
    datagram.extend_from_slice(b"6:target20:");
    datagram.extend_from_slice(target.as_bytes());
    datagram.extend_from_slice(b"e1:q9:find_node1:t2:aa1:y1:qe");

    let msg = DhtMessage::parse(&datagram).unwrap();
    assert_eq!(msg.transaction_id.as_ref(), b"aa");
    let Body::Query { sender: parsed_sender, query } = msg.body else {
        panic!("expected query");
    };
    assert_eq!(parsed_sender, sender);
    assert_eq!(query, DhtQuery::FindNode { target });

    let reply = node.dispatch(msg.transaction_id, addr(99), query);
    let reply = DhtMessage::parse(&reply.encode()).unwrap();

    assert_eq!(reply.transaction_id.as_ref(), b"aa");
    let Body::Response(response) = reply.body else {
        panic!("expected response");
    };
    assert_eq!(response.id, *node.local_id());
    let nodes = response.nodes.unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(nodes.len() <= K);
}

#[tokio::test]
async fn test_loopback_ping_and_lookup() {
    let server = Arc::new(DhtNode::bind(0).await.unwrap());
    let server_addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, server.port());
    let dispatcher = {
        let server = server.clone();
        tokio::spawn(async move {
            let _ = server.run().await;
        })
    };

    let client = DhtNode::bind(0).await.unwrap();
    assert!(client.ping(server_addr).await);

    // the sender is folded in after the reply; let the dispatcher finish
    tokio::task::yield_now().await;
    assert_eq!(server.node_count(), 1);

    client.add_seed(server_addr);
    let contacts = client.find_peers([0x21; 20]).await;
    assert!(!contacts.is_empty());
    assert!(contacts.iter().any(|c| c.id == *client.local_id()));

    dispatcher.abort();
}

#[tokio::test]
async fn test_loopback_announce_then_get_peers() {
    let server = Arc::new(DhtNode::bind(0).await.unwrap());
    let server_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, server.port()));
    let dispatcher = {
        let server = server.clone();
        tokio::spawn(async move {
            let _ = server.run().await;
        })
    };

    let info_hash = [0xCDu8; 20];
    let sender = NodeId::generate();

    // announce_peer stores the announced port, not the UDP source port
    let socket = Transport::ephemeral().await.unwrap();
    let announce =
        DhtMessage::announce_peer(Bytes::from_static(b"an"), sender, info_hash, 7777);
    let reply = socket.exchange(&announce.encode(), server_addr).await.unwrap();
    let reply = DhtMessage::parse(&reply).unwrap();
    assert_eq!(reply.transaction_id.as_ref(), b"an");
    assert!(matches!(reply.body, Body::Response(_)));

    let socket = Transport::ephemeral().await.unwrap();
    let get_peers = DhtMessage::get_peers(Bytes::from_static(b"gp"), sender, info_hash);
    let reply = socket.exchange(&get_peers.encode(), server_addr).await.unwrap();
    let reply = DhtMessage::parse(&reply).unwrap();

    let Body::Response(response) = reply.body else {
        panic!("expected response");
    };
    assert_eq!(
        response.values,
        Some(vec![SocketAddrV4::new(Ipv4Addr::LOCALHOST, 7777)])
    );

    dispatcher.abort();
}
