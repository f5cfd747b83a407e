// ABOUTME: Splits a hybrid request body into a leading JSON document and trailing raw bytes
// ABOUTME: Recovers the boundary from where JSON parsing stops, no length prefix needed

use bytes::Bytes;
use serde_json::{Deserializer, Value};

/// Result of decoding a hybrid body. `metadata` is `None` when no JSON value
/// could be recovered at all, in which case `remainder` is the whole buffer.
#[derive(Debug)]
pub struct HybridPayload {
    pub metadata: Option<Value>,
    pub remainder: Bytes,
}

/// Split a request body into its leading JSON value and whatever raw bytes
/// follow it. The upload body carries a metadata object immediately followed
/// by image bytes with no delimiter, so the split point is wherever standard
/// JSON parsing of the first value ends. Total parse failure is not an error
/// here; callers check `metadata` for `None`.
pub fn decode(buf: &[u8]) -> HybridPayload {
    let mut stream = Deserializer::from_slice(buf).into_iter::<Value>();

    match stream.next() {
        Some(Ok(metadata)) => {
            let split = stream.byte_offset();
            HybridPayload {
                metadata: Some(metadata),
                remainder: Bytes::copy_from_slice(&buf[split..]),
            }
        }
        // Malformed JSON prefix, or an empty buffer
        _ => HybridPayload {
            metadata: None,
            remainder: Bytes::copy_from_slice(buf),
        },
    }
}
