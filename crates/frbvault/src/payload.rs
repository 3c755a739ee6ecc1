//! Placeholder "FHE" payload codec.
//!
//! The payload is the draft as JSON, base64-encoded and tagged with `FHE-`.
//! It is reversible by anyone and gives no confidentiality. Callers must treat
//! it as opaque bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};
use crate::record::Draft;

/// Tag prepended to every encoded payload.
pub const PAYLOAD_PREFIX: &str = "FHE-";

/// Encode a draft into an opaque payload string.
///
/// # Errors
///
/// Returns an error if the draft cannot be serialized.
pub fn encode(draft: &Draft) -> Result<String> {
    let json = serde_json::to_vec(draft)?;
    Ok(format!("{PAYLOAD_PREFIX}{}", STANDARD.encode(json)))
}

/// Decode a payload produced by [`encode`].
///
/// # Errors
///
/// Returns [`Error::Payload`] if the tag, base64 or JSON is wrong.
pub fn decode(payload: &str) -> Result<Draft> {
    let body = payload
        .strip_prefix(PAYLOAD_PREFIX)
        .ok_or_else(|| Error::payload(format!("missing '{PAYLOAD_PREFIX}' prefix")))?;
    let bytes = STANDARD
        .decode(body)
        .map_err(|e| Error::payload(format!("bad base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::payload(format!("bad draft JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_has_prefix() {
        let encoded = encode(&Draft::default()).unwrap();
        assert!(encoded.starts_with(PAYLOAD_PREFIX));
    }

    #[test]
    fn test_decode_recovers_draft() {
        let draft = Draft {
            observatory: "ASKAP".to_string(),
            frequency: "1320".to_string(),
            signal_strength: "12".to_string(),
            location: "Dec −30° ünïcode".to_string(),
        };
        assert_eq!(decode(&encode(&draft).unwrap()).unwrap(), draft);
    }

    #[test]
    fn test_encoded_body_is_draft_json() {
        let draft = Draft {
            observatory: "FAST".to_string(),
            frequency: "1250".to_string(),
            signal_strength: "5".to_string(),
            location: String::new(),
        };
        let encoded = encode(&draft).unwrap();
        let json = STANDARD.decode(&encoded[PAYLOAD_PREFIX.len()..]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["signalStrength"], "5");
        assert_eq!(value["observatory"], "FAST");
    }

    #[test]
    fn test_decode_missing_prefix() {
        let err = decode("e30=").unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn test_decode_bad_base64() {
        let err = decode("FHE-!!!").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_decode_bad_json() {
        let payload = format!("{PAYLOAD_PREFIX}{}", STANDARD.encode(b"[1]"));
        let err = decode(&payload).unwrap_err();
        assert!(err.to_string().contains("JSON"));
    }
}
