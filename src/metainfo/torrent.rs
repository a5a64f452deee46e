use std::ops::Range;

use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, decode_prefix, Value};

/// A parsed torrent metainfo dictionary.
///
/// # Examples
///
/// ```no_run
/// use mdht::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("example.torrent")?;
/// let metainfo = Metainfo::from_bytes(&data)?;
///
/// println!("Torrent: {}", metainfo.info.name);
/// println!("Size: {} bytes", metainfo.info.total_length);
/// println!("Info hash: {}", metainfo.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// The info dictionary containing file and piece information.
    pub info: Info,
    /// The unique identifier for this torrent (SHA-1 of the bencoded `info`).
    pub info_hash: InfoHash,
    /// Primary tracker URL.
    pub announce: Option<String>,
    /// Optional comment about the torrent.
    pub comment: Option<String>,
    /// Unix timestamp when the torrent was created.
    pub creation_date: Option<i64>,
    raw_info: Bytes,
}

/// The info dictionary from a torrent file.
#[derive(Debug, Clone)]
pub struct Info {
    /// Suggested name for the file or directory.
    pub name: String,
    /// Number of bytes per piece.
    pub piece_length: u64,
    /// SHA-1 hash of each piece (20 bytes each).
    pub pieces: Vec<[u8; 20]>,
    /// Files in the torrent; single-file torrents have exactly one entry.
    pub files: Vec<File>,
    /// Total size of all files combined.
    pub total_length: u64,
}

/// A file within a torrent.
///
/// Multi-file paths are the `path` components joined with `/`. They are
/// plain labels relative to the torrent root, never resolved against the
/// filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Path of the file relative to the torrent root.
    pub path: String,
    /// Size of the file in bytes.
    pub length: u64,
}

impl Metainfo {
    /// Parses a torrent metainfo dictionary from raw bytes.
    ///
    /// The infohash is computed over the original byte range of the `info`
    /// value within `data`, not over a re-encoding, so no canonicalization
    /// step can disturb the digest. The decoder rejects non-canonical input
    /// up front, which makes the two strategies equivalent anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data is not valid canonical bencode
    /// - The root or `info` value is not a dictionary
    /// - Required fields are missing (`name`, `piece length`, `pieces`,
    ///   and `length` or `files`)
    /// - The `pieces` field length is not a multiple of 20
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        if root.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("root"));
        }

        let info_value = root
            .entry(b"info")
            .ok_or(MetainfoError::MissingField("info"))?;
        if info_value.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("info"));
        }

        let span = info_span(data)?;
        let raw_info = Bytes::copy_from_slice(&data[span]);
        let info_hash = InfoHash::digest(&raw_info);

        let info = parse_info(info_value)?;

        let announce = root.entry_str(b"announce").map(String::from);
        let comment = root.entry_str(b"comment").map(String::from);
        let creation_date = root.entry_integer(b"creation date");

        Ok(Self {
            info,
            info_hash,
            announce,
            comment,
            creation_date,
            raw_info,
        })
    }

    /// Returns the raw bencoded `info` dictionary, exactly as it appeared in
    /// the input buffer.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

impl Info {
    /// Number of pieces the content is split into,
    /// `ceil(total_length / piece_length)`.
    pub fn num_pieces(&self) -> u64 {
        self.total_length.div_ceil(self.piece_length)
    }
}

/// Locates the byte range of the `info` value inside a bencoded top-level
/// dictionary by walking its entries one value at a time.
fn info_span(data: &[u8]) -> Result<Range<usize>, MetainfoError> {
    if data.first() != Some(&b'd') {
        return Err(MetainfoError::InvalidField("root"));
    }

    let mut pos = 1;
    while pos < data.len() && data[pos] != b'e' {
        let (key, consumed) = decode_prefix(&data[pos..])?;
        pos += consumed;

        let start = pos;
        let (_, consumed) = decode_prefix(&data[pos..])?;
        pos += consumed;

        if key.as_bytes().map(|k| k.as_ref()) == Some(b"info".as_slice()) {
            return Ok(start..pos);
        }
    }

    Err(MetainfoError::MissingField("info"))
}

fn parse_info(value: &Value) -> Result<Info, MetainfoError> {
    let name = value
        .entry_str(b"name")
        .ok_or(MetainfoError::MissingField("name"))?
        .to_string();

    let piece_length = value
        .entry_integer(b"piece length")
        .ok_or(MetainfoError::MissingField("piece length"))?;
    if piece_length <= 0 {
        return Err(MetainfoError::InvalidField("piece length"));
    }
    let piece_length = piece_length as u64;

    let pieces_bytes = value
        .entry_bytes(b"pieces")
        .ok_or(MetainfoError::MissingField("pieces"))?;

    if pieces_bytes.len() % 20 != 0 {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    let pieces: Vec<[u8; 20]> = pieces_bytes
        .chunks_exact(20)
        .map(|chunk| {
            let mut arr = [0u8; 20];
            arr.copy_from_slice(chunk);
            arr
        })
        .collect();

    let (files, total_length) = if let Some(length) = value.entry_integer(b"length") {
        // Single-file mode: the torrent name is the file name.
        if length < 0 {
            return Err(MetainfoError::InvalidField("length"));
        }
        let length = length as u64;
        (
            vec![File {
                path: name.clone(),
                length,
            }],
            length,
        )
    } else if let Some(files_list) = value.entry_list(b"files") {
        let mut files = Vec::new();
        let mut total = 0u64;

        for file_value in files_list {
            if file_value.as_dict().is_none() {
                return Err(MetainfoError::InvalidField("files"));
            }

            let length = file_value
                .entry_integer(b"length")
                .ok_or(MetainfoError::MissingField("file length"))?;
            if length < 0 {
                return Err(MetainfoError::InvalidField("file length"));
            }
            let length = length as u64;

            let components = file_value
                .entry_list(b"path")
                .ok_or(MetainfoError::MissingField("file path"))?;
            if components.is_empty() {
                return Err(MetainfoError::InvalidField("file path"));
            }

            let mut path = String::new();
            for component in components {
                let part = component
                    .as_str()
                    .ok_or(MetainfoError::InvalidField("file path"))?;
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(part);
            }

            files.push(File { path, length });
            total += length;
        }

        (files, total)
    } else {
        return Err(MetainfoError::MissingField("length or files"));
    };

    Ok(Info {
        name,
        piece_length,
        pieces,
        files,
        total_length,
    })
}
