//! Message content passed to and from the model.

use crate::agent::AgentError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One piece of a message: text or an inline binary blob.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Blob { mime_type: String, data: Vec<u8> },
}

/// A role-tagged message. Roles follow the chat convention: `user`,
/// `model`, or `system`.
#[derive(Debug, Clone)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Content {
        Content {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Content {
        Content::user(vec![Part::Text(text.into())])
    }
}

/// Parse a `data:<mime>;base64,<payload>` URL into a blob part.
pub fn part_from_data_url(url: &str) -> Result<Part, AgentError> {
    let Some((header, payload)) = url.split_once(',') else {
        return Err(AgentError::BadAttachment(
            "missing comma separator".to_string(),
        ));
    };
    let Some(rest) = header.strip_prefix("data:") else {
        return Err(AgentError::BadAttachment("expected a data: URL".to_string()));
    };
    let mime_type = match rest.split(';').next() {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => "application/octet-stream".to_string(),
    };
    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| AgentError::BadAttachment(format!("invalid base64 payload: {e}")))?;
    Ok(Part::Blob { mime_type, data })
}

/// Storage and wire form of a part: `{"text": ...}` or
/// `{"inlineData": {"mimeType": ..., "data": ...}}` with base64 payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl From<&Part> for StoredPart {
    fn from(part: &Part) -> StoredPart {
        match part {
            Part::Text(text) => StoredPart::Text { text: text.clone() },
            Part::Blob { mime_type, data } => StoredPart::Inline {
                inline_data: InlineData {
                    mime_type: mime_type.clone(),
                    data: STANDARD.encode(data),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_url_parses_mime_and_payload() {
        let part = part_from_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        match part {
            Part::Blob { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, b"hello");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn data_url_without_comma_is_rejected() {
        assert!(part_from_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn data_url_without_scheme_is_rejected() {
        assert!(part_from_data_url("image/png;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn data_url_with_bad_base64_is_rejected() {
        assert!(part_from_data_url("data:image/png;base64,not!!base64").is_err());
    }

    #[test]
    fn empty_mime_falls_back_to_octet_stream() {
        let part = part_from_data_url("data:;base64,aGVsbG8=").unwrap();
        assert!(matches!(
            part,
            Part::Blob { ref mime_type, .. } if mime_type == "application/octet-stream"
        ));
    }

    #[test]
    fn stored_parts_serialize_to_client_shapes() {
        let text = StoredPart::from(&Part::Text("hi".to_string()));
        assert_eq!(serde_json::to_value(&text).unwrap(), json!({"text": "hi"}));

        let blob = StoredPart::from(&Part::Blob {
            mime_type: "image/png".to_string(),
            data: b"hello".to_vec(),
        });
        assert_eq!(
            serde_json::to_value(&blob).unwrap(),
            json!({"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}})
        );
    }

    #[test]
    fn stored_parts_deserialize_from_either_shape() {
        let text: StoredPart = serde_json::from_value(json!({"text": "hi"})).unwrap();
        assert!(matches!(text, StoredPart::Text { .. }));

        let blob: StoredPart = serde_json::from_value(
            json!({"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}),
        )
        .unwrap();
        assert!(matches!(blob, StoredPart::Inline { .. }));
    }
}
