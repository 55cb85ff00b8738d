//! Self-describing cached payload and its persisted blob format
//!
//! The key-value store only holds string values, so binary bodies are
//! base64-encoded and combined with their media type into a single blob:
//!
//! ```text
//! <mediaType>;base64,<encodedBytes>
//! ```
//!
//! Both halves are recoverable from the blob alone; no external metadata
//! is needed to serve a cached entry. Parsing is validated on read and
//! malformed blobs fail with an explicit error instead of being indexed
//! blindly. Media types may carry parameters with their own semicolons
//! (`image/svg+xml;charset=utf-8`), so the blob is split on the last
//! occurrence of the full `";base64,"` marker; base64 text cannot contain
//! either marker character.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;

use crate::{Error, Result};

/// Media type used when the origin does not report one
pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Encoding marker between the media type and the encoded bytes
const ENCODING_MARKER: &str = ";base64,";

/// Encode raw bytes into text safe for string-valued storage
pub fn encode_bytes(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode text produced by [`encode_bytes`] back into the original bytes.
///
/// Non-alphabet input or broken padding fails with [`Error::Decode`].
pub fn decode_bytes(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// A cached asset body together with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    media_type: String,
    bytes: Bytes,
}

impl CachedPayload {
    /// Create a payload from raw bytes and an optional media type.
    ///
    /// A missing or empty media type falls back to [`DEFAULT_MEDIA_TYPE`].
    pub fn new(bytes: impl Into<Bytes>, media_type: Option<String>) -> Self {
        let media_type = media_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

        Self {
            media_type,
            bytes: bytes.into(),
        }
    }

    /// The payload's media type
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The raw asset bytes
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Split the payload into its media type and bytes
    pub fn into_parts(self) -> (String, Bytes) {
        (self.media_type, self.bytes)
    }

    /// Serialize into the persisted blob format
    pub fn to_blob(&self) -> String {
        format!(
            "{}{}{}",
            self.media_type,
            ENCODING_MARKER,
            encode_bytes(&self.bytes)
        )
    }

    /// Parse a persisted blob back into a payload.
    ///
    /// Fails with [`Error::MalformedPayload`] when the layout is wrong and
    /// [`Error::Decode`] when the encoded bytes are not valid base64.
    pub fn from_blob(blob: &str) -> Result<Self> {
        let (media_type, encoded) = blob
            .rsplit_once(ENCODING_MARKER)
            .ok_or_else(|| Error::malformed_payload("missing encoding marker"))?;

        if media_type.is_empty() {
            return Err(Error::malformed_payload("empty media type"));
        }

        let bytes = decode_bytes(encoded)?;

        Ok(Self {
            media_type: media_type.to_string(),
            bytes: bytes.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_encode_decode_round_trip() {
        // Lengths covering all three padding cases, plus empty input
        for data in [
            &b""[..],
            &b"a"[..],
            &b"ab"[..],
            &b"abc"[..],
            &b"abcd"[..],
            &[0u8, 255, 128, 7, 42][..],
        ] {
            let encoded = encode_bytes(data);
            assert_eq!(decode_bytes(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(matches!(
            decode_bytes("not base64!!"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_blob_layout() {
        let payload = CachedPayload::new(&b"hi"[..], Some("image/svg+xml".to_string()));
        assert_eq!(payload.to_blob(), "image/svg+xml;base64,aGk=");
    }

    #[test]
    fn test_blob_round_trip() {
        let payload = CachedPayload::new(&[1u8, 2, 3, 254][..], Some("image/webp".to_string()));
        let parsed = CachedPayload::from_blob(&payload.to_blob()).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_media_type_with_parameters_round_trips() {
        // shields.io reports parameterized content types; the parameter's
        // own semicolon must not be mistaken for the blob separator
        let payload = CachedPayload::new(
            &b"<svg/>"[..],
            Some("image/svg+xml;charset=utf-8".to_string()),
        );
        let parsed = CachedPayload::from_blob(&payload.to_blob()).unwrap();
        assert_eq!(parsed.media_type(), "image/svg+xml;charset=utf-8");
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_missing_media_type_defaults() {
        assert_eq!(
            CachedPayload::new(&b"x"[..], None).media_type(),
            DEFAULT_MEDIA_TYPE
        );
        assert_eq!(
            CachedPayload::new(&b"x"[..], Some(String::new())).media_type(),
            DEFAULT_MEDIA_TYPE
        );
    }

    #[test]
    fn test_from_blob_rejects_malformed_layouts() {
        for blob in [
            "no separators at all",
            "image/png;hex,deadbeef",
            ";base64,aGk=",
            "image/png;base64",
        ] {
            assert!(
                matches!(
                    CachedPayload::from_blob(blob),
                    Err(Error::MalformedPayload(_))
                ),
                "expected malformed payload for {blob:?}"
            );
        }

        // Correct layout, broken encoding
        assert!(matches!(
            CachedPayload::from_blob("image/png;base64,###"),
            Err(Error::Decode(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_bytes(&data);
            prop_assert_eq!(decode_bytes(&encoded).unwrap(), data.clone());

            let payload = CachedPayload::new(data, Some("image/png".to_string()));
            let parsed = CachedPayload::from_blob(&payload.to_blob()).unwrap();
            prop_assert_eq!(parsed, payload);
        }
    }
}
