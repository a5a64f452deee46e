//! Torrent metainfo handling (BEP-3)
//!
//! Parses `.torrent` metainfo dictionaries and computes the infohash: the
//! SHA-1 digest of the bencoded `info` sub-dictionary. The infohash is what
//! the DHT is queried against, so the digest must be taken over the exact
//! bytes the decoder saw; see [`Metainfo::from_bytes`] for how that byte
//! range is carried through decoding.

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{File, Info, Metainfo};

#[cfg(test)]
mod tests;
