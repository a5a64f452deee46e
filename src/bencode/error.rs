use thiserror::Error;

/// Errors that can occur while decoding bencode.
///
/// # Examples
///
/// ```
/// use mdht::bencode::{decode, BencodeError};
///
/// // Truncated input
/// assert!(matches!(decode(b"i42"), Err(BencodeError::UnexpectedEof)));
///
/// // Non-canonical integer
/// assert!(matches!(decode(b"i-0e"), Err(BencodeError::InvalidInteger(_))));
///
/// // Keys out of order on the wire
/// assert!(matches!(
///     decode(b"d1:bi2e1:ai1ee"),
///     Err(BencodeError::UnsortedKeys)
/// ));
/// ```
#[derive(Debug, Error)]
pub enum BencodeError {
    /// Input ended before a complete value was parsed.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Integer is malformed: empty, zero-padded, `-0`, or overflows i64.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Byte string length prefix is missing or not a valid number.
    #[error("invalid string length")]
    InvalidStringLength,

    /// Encountered an unexpected character while parsing.
    #[error("unexpected character: {0}")]
    UnexpectedChar(char),

    /// A dictionary contains the same key twice.
    #[error("duplicate dictionary key")]
    DuplicateKey,

    /// Dictionary keys are not in ascending byte order.
    #[error("dictionary keys out of order")]
    UnsortedKeys,

    /// Extra data exists after the bencode value.
    #[error("trailing data after value")]
    TrailingData,

    /// Recursion limit (64 levels) exceeded.
    #[error("nesting too deep")]
    NestingTooDeep,
}
