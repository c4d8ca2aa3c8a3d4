//! Envelope (first decode phase).
//!
//! Only `version` and `type` are read here; the payload is left untouched
//! until the type tag has picked a decoder.

use serde::Deserialize;

use crate::error::{Result, SibsError};

use super::types::MessageType;

/// The single protocol version this crate speaks.
pub const PROTOCOL_VERSION: &str = "V_1";

/// Raw envelope fields. Other members of the frame are ignored.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Protocol version tag.
    #[serde(default)]
    pub version: Option<String>,
    /// Message kind (field name is `type` in JSON).
    #[serde(default, rename = "type")]
    pub msg_type: Option<String>,
}

/// Resolved envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: String,
    /// The raw tag as received (`None` when the frame had no `type`).
    pub type_tag: Option<String>,
    /// Registry lookup of `type_tag`.
    pub kind: Option<MessageType>,
}

impl Header {
    /// True when the tag is missing or not in the registry.
    pub fn is_unrecognized(&self) -> bool {
        self.kind.is_none()
    }
}

/// Decode the envelope of a text frame.
///
/// A frame without `version` is read as `V_1`; any other version is rejected.
pub fn decode_envelope(raw: &str) -> Result<Header> {
    let env: Envelope = serde_json::from_str(raw)
        .map_err(|e| SibsError::Decode(format!("invalid envelope json: {e}")))?;

    let version = env.version.unwrap_or_else(|| PROTOCOL_VERSION.to_string());
    if version != PROTOCOL_VERSION {
        return Err(SibsError::UnsupportedVersion(version));
    }

    let kind = env.msg_type.as_deref().and_then(MessageType::from_tag);
    Ok(Header {
        version,
        type_tag: env.msg_type,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_and_unknown_tags() {
        let h = decode_envelope(r#"{"version":"V_1","type":"STATUS_RESPONSE","hasCredentials":true}"#);
        assert!(matches!(h, Ok(Header { kind: Some(MessageType::StatusResponse), .. })));

        let h = decode_envelope(r#"{"version":"V_1","type":"SOMETHING_NEW"}"#);
        assert!(matches!(h, Ok(ref h) if h.is_unrecognized() && h.type_tag.as_deref() == Some("SOMETHING_NEW")));

        let h = decode_envelope(r#"{"version":"V_1"}"#);
        assert!(matches!(h, Ok(ref h) if h.is_unrecognized() && h.type_tag.is_none()));
    }

    #[test]
    fn missing_version_defaults_but_foreign_version_fails() {
        let h = decode_envelope(r#"{"type":"TX_REQUEST"}"#);
        assert!(matches!(h, Ok(ref h) if h.version == PROTOCOL_VERSION));

        let e = decode_envelope(r#"{"version":"V_2","type":"TX_REQUEST"}"#);
        assert!(matches!(e, Err(SibsError::UnsupportedVersion(ref v)) if v == "V_2"));
    }

    #[test]
    fn non_object_is_a_decode_error() {
        assert!(matches!(decode_envelope("[1,2]"), Err(SibsError::Decode(_))));
        assert!(matches!(decode_envelope("not json"), Err(SibsError::Decode(_))));
    }
}
