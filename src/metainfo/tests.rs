use super::*;

const SINGLE_INFO: &[u8] =
    b"d6:lengthi40e4:name8:demo.bin12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaae";

fn single_file_torrent() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"d8:announce19:http://tracker.test7:comment4:demo13:creation datei1700000000e4:info");
    data.extend_from_slice(SINGLE_INFO);
    data.extend_from_slice(b"e");
    data
}

fn multi_file_torrent() -> Vec<u8> {
    let mut info = Vec::new();
    info.extend_from_slice(b"d5:filesl");
    info.extend_from_slice(b"d6:lengthi10e4:pathl3:dir5:a.txtee");
    info.extend_from_slice(b"d6:lengthi30e4:pathl5:b.binee");
    info.extend_from_slice(b"e4:name4:demo12:piece lengthi16e6:pieces60:");
    info.extend(vec![b'x'; 60]);
    info.extend_from_slice(b"e");

    let mut data = Vec::new();
    data.extend_from_slice(b"d4:info");
    data.extend_from_slice(&info);
    data.extend_from_slice(b"e");
    data
}

#[test]
fn test_parse_single_file() {
    let metainfo = Metainfo::from_bytes(&single_file_torrent()).unwrap();

    assert_eq!(metainfo.announce.as_deref(), Some("http://tracker.test"));
    assert_eq!(metainfo.comment.as_deref(), Some("demo"));
    assert_eq!(metainfo.creation_date, Some(1_700_000_000));

    assert_eq!(metainfo.info.name, "demo.bin");
    assert_eq!(metainfo.info.piece_length, 16384);
    assert_eq!(metainfo.info.pieces.len(), 1);
    assert_eq!(metainfo.info.total_length, 40);
    assert_eq!(metainfo.info.num_pieces(), 1);
    assert_eq!(
        metainfo.info.files,
        vec![File {
            path: "demo.bin".to_string(),
            length: 40,
        }]
    );
}

#[test]
fn test_parse_multi_file() {
    let metainfo = Metainfo::from_bytes(&multi_file_torrent()).unwrap();

    assert_eq!(metainfo.announce, None);
    assert_eq!(metainfo.info.name, "demo");
    assert_eq!(metainfo.info.total_length, 40);
    assert_eq!(metainfo.info.piece_length, 16);
    assert_eq!(metainfo.info.num_pieces(), 3);
    assert_eq!(metainfo.info.pieces.len(), 3);
    assert_eq!(
        metainfo.info.files,
        vec![
            File {
                path: "dir/a.txt".to_string(),
                length: 10,
            },
            File {
                path: "b.bin".to_string(),
                length: 30,
            },
        ]
    );
}

#[test]
fn test_raw_info_is_original_byte_range() {
    let metainfo = Metainfo::from_bytes(&single_file_torrent()).unwrap();
    assert_eq!(metainfo.raw_info().as_ref(), SINGLE_INFO);
}

#[test]
fn test_info_hash_matches_digest_of_info_bytes() {
    let metainfo = Metainfo::from_bytes(&single_file_torrent()).unwrap();
    assert_eq!(metainfo.info_hash, InfoHash::digest(SINGLE_INFO));
}

#[test]
fn test_info_hash_stability() {
    let data = single_file_torrent();
    let first = Metainfo::from_bytes(&data).unwrap().info_hash;
    let second = Metainfo::from_bytes(&data).unwrap().info_hash;
    assert_eq!(first, second);
}

#[test]
fn test_root_not_a_dict() {
    assert!(matches!(
        Metainfo::from_bytes(b"i42e"),
        Err(MetainfoError::InvalidField("root"))
    ));
    assert!(matches!(
        Metainfo::from_bytes(b"le"),
        Err(MetainfoError::InvalidField("root"))
    ));
}

#[test]
fn test_missing_info() {
    assert!(matches!(
        Metainfo::from_bytes(b"d4:name4:teste"),
        Err(MetainfoError::MissingField("info"))
    ));
}

#[test]
fn test_info_not_a_dict() {
    assert!(matches!(
        Metainfo::from_bytes(b"d4:infoi1ee"),
        Err(MetainfoError::InvalidField("info"))
    ));
}

#[test]
fn test_pieces_length_not_multiple_of_20() {
    let data = b"d4:infod6:lengthi40e4:name4:test12:piece lengthi16384e6:pieces19:aaaaaaaaaaaaaaaaaaaee";
    assert!(matches!(
        Metainfo::from_bytes(data),
        Err(MetainfoError::InvalidField("pieces"))
    ));
}

#[test]
fn test_missing_name() {
    let data = b"d4:infod6:lengthi40e12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
    assert!(matches!(
        Metainfo::from_bytes(data),
        Err(MetainfoError::MissingField("name"))
    ));
}

#[test]
fn test_missing_length_and_files() {
    let data = b"d4:infod4:name4:test12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
    assert!(matches!(
        Metainfo::from_bytes(data),
        Err(MetainfoError::MissingField("length or files"))
    ));
}

#[test]
fn test_empty_path_rejected() {
    let data =
        b"d4:infod5:filesld6:lengthi10e4:pathleee4:name4:test12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
    assert!(matches!(
        Metainfo::from_bytes(data),
        Err(MetainfoError::InvalidField("file path"))
    ));
}

#[test]
fn test_zero_piece_length_rejected() {
    let data = b"d4:infod6:lengthi40e4:name4:test12:piece lengthi0e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
    assert!(matches!(
        Metainfo::from_bytes(data),
        Err(MetainfoError::InvalidField("piece length"))
    ));
}

#[test]
fn test_info_hash_hex() {
    let hash = InfoHash::from_bytes(&[0xab; 20]).unwrap();
    assert_eq!(hash.to_hex(), "abababababababababababababababababababab");
    assert_eq!(InfoHash::from_hex(&hash.to_hex()).unwrap(), hash);

    assert!(InfoHash::from_hex("abcd").is_err());
    assert!(InfoHash::from_bytes(&[0u8; 19]).is_err());
}
