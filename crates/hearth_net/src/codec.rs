//! MessagePack framing for wire payloads.
//!
//! Structs are written with field names so a receiver built from a newer
//! definition still reads older payloads. A frame must hold exactly one
//! value: trailing bytes mean the sender and receiver disagree on the
//! layout, and decoding fails instead of silently ignoring them.

use std::io::Cursor;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::NetError;

/// Encode `value` as one named MessagePack frame.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a frame produced by [`encode`].
///
/// # Errors
///
/// Returns [`NetError::Decode`] for malformed bytes and
/// [`NetError::TrailingBytes`] if the frame holds more than one value.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, NetError> {
    let mut cursor = Cursor::new(frame);
    let value = rmp_serde::decode::from_read(&mut cursor)?;
    let consumed = usize::try_from(cursor.position()).unwrap_or(frame.len());
    match frame.len() - consumed.min(frame.len()) {
        0 => Ok(value),
        extra => Err(NetError::TrailingBytes(extra)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Ping {
        seq: u32,
        note: String,
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct PingV0 {
        seq: u32,
    }

    fn ping() -> Ping {
        Ping {
            seq: 42,
            note: "hello".to_string(),
        }
    }

    #[test]
    fn test_named_fields_tolerate_older_readers() {
        let bytes = encode(&ping()).unwrap();
        let old: PingV0 = decode(&bytes).unwrap();
        assert_eq!(old.seq, 42);
        assert_eq!(decode::<Ping>(&bytes).unwrap(), ping());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&ping()).unwrap();
        bytes.extend_from_slice(&[0x00, 0x01]);
        let err = decode::<Ping>(&bytes).unwrap_err();
        assert!(matches!(err, NetError::TrailingBytes(2)));
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(matches!(decode::<Ping>(&[0xc1]), Err(NetError::Decode(_))));
    }
}
