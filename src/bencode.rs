//! Bencode encoding and decoding (BEP-3)
//!
//! Bencode is the byte-oriented format BitTorrent uses both on the wire and
//! in `.torrent` files. The decoder here is strict about canonical form:
//! dictionaries with duplicate or unsorted keys are rejected, as are
//! non-canonical integers. That strictness is what makes
//! `encode(decode(b)) == b` hold for any accepted input, which in turn is
//! what makes infohash computation over re-encoded data safe.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::encode;
pub use error::BencodeError;
pub use value::{Dictionary, Value};
