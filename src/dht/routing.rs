use std::collections::VecDeque;

use super::node::{Contact, NodeId};

/// Maximum contacts per bucket.
pub const K: usize = 8;

/// An ordered bucket of contacts: least-recently-seen at the front,
/// most-recently-seen at the back.
#[derive(Debug, Default)]
struct Bucket {
    contacts: VecDeque<Contact>,
}

/// What [`RoutingTable::insert`] did with a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Appended to a bucket with room.
    Inserted,
    /// Already present; moved to the most-recently-seen position.
    Refreshed,
    /// The contact carries the local node's own ID.
    RejectedSelf,
    /// The target bucket is full. The caller should ping `oldest` and
    /// report the result through [`RoutingTable::apply_probe`].
    BucketFull { oldest: Contact },
}

/// Kademlia routing table: a lazily grown sequence of k-buckets.
///
/// The bucket index of a contact is the number of leading 1-bits of the XOR
/// distance between the local ID and the contact's ID, walking from the
/// most-significant bit. The same rule is used for insert and lookup, and
/// buckets are appended the first time an index beyond the current length
/// is needed.
///
/// The table never contains the local node's own ID, and a contact lives in
/// exactly one bucket.
pub struct RoutingTable {
    local_id: NodeId,
    buckets: Vec<Bucket>,
}

impl RoutingTable {
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            buckets: vec![Bucket::default()],
        }
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Bucket index for an ID: leading 1-bits of the distance, MSB first.
    pub fn bucket_index(&self, id: &NodeId) -> usize {
        let dist = self.local_id.distance(id);
        let mut index = 0;

        for byte in dist {
            let ones = byte.leading_ones() as usize;
            index += ones;
            if ones < 8 {
                break;
            }
        }

        index
    }

    /// Inserts a contact, following the Kademlia recency rules.
    ///
    /// A contact already present moves to the most-recently-seen position.
    /// When the bucket is full the decision is deferred to the caller: the
    /// least-recently-seen contact must be probed with a ping, and the
    /// outcome reported via [`apply_probe`](Self::apply_probe).
    pub fn insert(&mut self, contact: Contact) -> InsertOutcome {
        if contact.id == self.local_id {
            return InsertOutcome::RejectedSelf;
        }

        let index = self.bucket_index(&contact.id);
        while self.buckets.len() <= index {
            self.buckets.push(Bucket::default());
        }

        let bucket = &mut self.buckets[index];

        if let Some(pos) = bucket.contacts.iter().position(|c| *c == contact) {
            if let Some(existing) = bucket.contacts.remove(pos) {
                bucket.contacts.push_back(existing);
            }
            return InsertOutcome::Refreshed;
        }

        if bucket.contacts.len() < K {
            bucket.contacts.push_back(contact);
            return InsertOutcome::Inserted;
        }

        match bucket.contacts.front() {
            Some(oldest) => InsertOutcome::BucketFull { oldest: *oldest },
            None => {
                bucket.contacts.push_back(contact);
                InsertOutcome::Inserted
            }
        }
    }

    /// Resolves a [`InsertOutcome::BucketFull`] after the oldest contact was
    /// probed. If it answered, it rotates to the most-recently-seen position
    /// and the candidate is dropped; if not, it is evicted and the candidate
    /// appended.
    ///
    /// The probe result is ignored if the bucket head changed in the
    /// meantime.
    pub fn apply_probe(&mut self, oldest: Contact, candidate: Contact, alive: bool) {
        let index = self.bucket_index(&candidate.id);
        let Some(bucket) = self.buckets.get_mut(index) else {
            return;
        };

        if bucket.contacts.front() != Some(&oldest) {
            return;
        }

        if let Some(head) = bucket.contacts.pop_front() {
            if alive {
                bucket.contacts.push_back(head);
            } else {
                bucket.contacts.push_back(candidate);
            }
        }
    }

    /// Up to `n` contacts sorted ascending by XOR distance to `target`.
    /// The sort is stable, so equidistant contacts keep their table order.
    pub fn closest(&self, target: &NodeId, n: usize) -> Vec<Contact> {
        let mut contacts = self.contacts();
        contacts.sort_by_key(|c| c.id.distance(target));
        contacts.truncate(n);
        contacts
    }

    /// All contacts, in bucket order.
    pub fn contacts(&self) -> Vec<Contact> {
        self.buckets
            .iter()
            .flat_map(|b| b.contacts.iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.contacts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.contacts.is_empty())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
