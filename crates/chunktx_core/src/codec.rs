//! CBOR wire codec for headers and payloads.
//!
//! Transports carry [`UploadHeader`](crate::UploadHeader) and
//! [`UploadPayload`](crate::UploadPayload) values as CBOR maps:
//!
//! ```text
//! header:  { "path": text, "size": uint, "mtime": uint }
//! payload: { "offset": uint, "data": bytes, "checksum": uint | null }
//! ```

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| CoreError::codec(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if the bytes are not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Outcome;
    use crate::upload::{UploadHeader, UploadPayload};

    #[test]
    fn header_drops_local_source() {
        let header = UploadHeader::new("reports/q1.csv", 42, 1_700_000_000_000);
        let decoded: UploadHeader = decode(&encode(&header).unwrap()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.source().is_none());
    }

    #[test]
    fn payload_keeps_checksum() {
        let payload = UploadPayload::new(8, b"89".to_vec());
        let decoded: UploadPayload = decode(&encode(&payload).unwrap()).unwrap();
        assert_eq!(decoded.checksum(), payload.checksum());
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn payload_data_is_a_byte_string() {
        let bytes = encode(&UploadPayload::unchecked(0, b"abcd".to_vec())).unwrap();
        // major type 2, length 4, then the raw bytes
        assert!(bytes.windows(5).any(|w| w == [0x44, b'a', b'b', b'c', b'd']));
    }

    #[test]
    fn outcome_encodes() {
        let decoded: Outcome = decode(&encode(&Outcome::Skip).unwrap()).unwrap();
        assert_eq!(decoded, Outcome::Skip);
    }

    #[test]
    fn garbage_is_codec_error() {
        let result: CoreResult<UploadHeader> = decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CoreError::Codec { .. })));
    }

    #[test]
    fn truncated_is_codec_error() {
        let bytes = encode(&UploadHeader::new("a.bin", 1, 2)).unwrap();
        let result: CoreResult<UploadHeader> = decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(CoreError::Codec { .. })));
    }
}
