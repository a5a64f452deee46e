use bytes::Bytes;

use super::error::BencodeError;
use super::value::{Dictionary, Value};

const MAX_DEPTH: usize = 64;

/// Decodes a single bencode value from a byte slice.
///
/// The input must contain exactly one complete value with no trailing data.
/// Dictionaries must be canonical: keys in strictly ascending byte order,
/// no duplicates.
///
/// # Errors
///
/// Returns an error if:
/// - The input is empty or truncated ([`BencodeError::UnexpectedEof`])
/// - The input contains invalid bencode syntax
/// - A dictionary repeats a key or orders keys incorrectly
///   ([`BencodeError::DuplicateKey`], [`BencodeError::UnsortedKeys`])
/// - The nesting depth exceeds 64 levels ([`BencodeError::NestingTooDeep`])
/// - There is data after the value ([`BencodeError::TrailingData`])
///
/// # Examples
///
/// ```
/// use mdht::bencode::decode;
///
/// let int = decode(b"i42e").unwrap();
/// assert_eq!(int.as_integer(), Some(42));
///
/// let list = decode(b"li1ei2ei3ee").unwrap();
/// assert_eq!(list.as_list().unwrap().len(), 3);
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;

    if consumed != data.len() {
        return Err(BencodeError::TrailingData);
    }

    Ok(value)
}

/// Decodes one bencode value from the front of a byte slice, returning the
/// value and the number of bytes consumed.
///
/// Unlike [`decode`], trailing data is not an error; the caller decides what
/// to do with the remainder. Useful for walking a buffer value by value.
///
/// # Examples
///
/// ```
/// use mdht::bencode::decode_prefix;
///
/// let (value, consumed) = decode_prefix(b"i42e5:hello").unwrap();
/// assert_eq!(value.as_integer(), Some(42));
/// assert_eq!(consumed, 4);
/// ```
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut pos = 0;
    let value = decode_value(data, &mut pos, 0)?;
    Ok((value, pos))
}

fn decode_value(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    if depth > MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    match data[*pos] {
        b'i' => decode_integer(data, pos),
        b'l' => decode_list(data, pos, depth),
        b'd' => decode_dict(data, pos, depth),
        b'0'..=b'9' => Ok(Value::Bytes(decode_bytes(data, pos)?)),
        c => Err(BencodeError::UnexpectedChar(c as char)),
    }
}

fn decode_integer(data: &[u8], pos: &mut usize) -> Result<Value, BencodeError> {
    *pos += 1;

    let start = *pos;
    while *pos < data.len() && data[*pos] != b'e' {
        *pos += 1;
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    let body = &data[start..*pos];
    let digits = match body {
        [] => return Err(BencodeError::InvalidInteger("empty".into())),
        [b'-', rest @ ..] => rest,
        _ => body,
    };

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(BencodeError::InvalidInteger(
            String::from_utf8_lossy(body).into_owned(),
        ));
    }

    // i-0e and zero-padded forms are not canonical.
    if digits[0] == b'0' && (digits.len() > 1 || body[0] == b'-') {
        return Err(BencodeError::InvalidInteger("leading zeros".into()));
    }

    let text = std::str::from_utf8(body).map_err(|_| BencodeError::InvalidInteger("utf8".into()))?;
    let value: i64 = text
        .parse()
        .map_err(|_| BencodeError::InvalidInteger(text.into()))?;

    *pos += 1;
    Ok(Value::Integer(value))
}

fn decode_bytes(data: &[u8], pos: &mut usize) -> Result<Bytes, BencodeError> {
    let start = *pos;
    while *pos < data.len() && data[*pos].is_ascii_digit() {
        *pos += 1;
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    if data[*pos] != b':' || *pos == start {
        return Err(BencodeError::InvalidStringLength);
    }

    let len_str =
        std::str::from_utf8(&data[start..*pos]).map_err(|_| BencodeError::InvalidStringLength)?;
    let len: usize = len_str
        .parse()
        .map_err(|_| BencodeError::InvalidStringLength)?;

    *pos += 1;

    if data.len() - *pos < len {
        return Err(BencodeError::UnexpectedEof);
    }

    let bytes = Bytes::copy_from_slice(&data[*pos..*pos + len]);
    *pos += len;

    Ok(bytes)
}

fn decode_list(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut list = Vec::new();

    while *pos < data.len() && data[*pos] != b'e' {
        list.push(decode_value(data, pos, depth + 1)?);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    *pos += 1;
    Ok(Value::List(list))
}

fn decode_dict(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut dict = Dictionary::new();
    let mut prev_key: Option<Bytes> = None;

    while *pos < data.len() && data[*pos] != b'e' {
        if !data[*pos].is_ascii_digit() {
            return Err(BencodeError::UnexpectedChar(data[*pos] as char));
        }

        let key = decode_bytes(data, pos)?;

        if let Some(prev) = &prev_key {
            match key.as_ref().cmp(prev.as_ref()) {
                std::cmp::Ordering::Less => return Err(BencodeError::UnsortedKeys),
                std::cmp::Ordering::Equal => return Err(BencodeError::DuplicateKey),
                std::cmp::Ordering::Greater => {}
            }
        }

        let value = decode_value(data, pos, depth + 1)?;
        prev_key = Some(key.clone());
        dict.insert(key, value);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    *pos += 1;
    Ok(Value::Dict(dict))
}
