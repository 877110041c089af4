//! Wire types shared by the HTTP remote store and taskmaster-server.
//!
//! REST bodies are JSON. Listener frames on the WebSocket are CBOR-encoded
//! [`ProtocolMessage`]s whose snapshot payload is the JSON-encoded
//! collection (array of [`Document`]) or stats document (object or null).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Document, OrderBy, RemotePayload, RemoteTarget};

/// Listener protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProtocolMessage {
    /// Sent by the client once, right after connecting.
    #[serde(rename = "listen")]
    Listen {
        target: String,
        #[serde(rename = "orderBy", default, skip_serializing_if = "Option::is_none")]
        order_by: Option<OrderBy>,
    },
    /// Full snapshot pushed by the server.
    #[serde(rename = "snapshot")]
    Snapshot {
        target: String,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Listener failure; the server closes the socket afterwards.
    #[serde(rename = "error")]
    Error { message: String },
}

impl ProtocolMessage {
    /// Encode message as CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode message from CBOR bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }

    pub fn collection_snapshot(
        target: RemoteTarget,
        docs: &[Document],
    ) -> Result<Self, serde_json::Error> {
        Ok(ProtocolMessage::Snapshot {
            target: target.to_string(),
            data: serde_json::to_vec(docs)?,
        })
    }

    pub fn document_snapshot(
        target: RemoteTarget,
        doc: Option<&Value>,
    ) -> Result<Self, serde_json::Error> {
        Ok(ProtocolMessage::Snapshot {
            target: target.to_string(),
            data: serde_json::to_vec(&doc)?,
        })
    }
}

/// Decodes a snapshot frame body for the given target.
pub fn decode_snapshot(target: RemoteTarget, data: &[u8]) -> Result<RemotePayload, serde_json::Error> {
    match target {
        RemoteTarget::Collection(_) => {
            serde_json::from_slice::<Vec<Document>>(data).map(RemotePayload::Collection)
        }
        RemoteTarget::Stats => {
            serde_json::from_slice::<Option<Value>>(data).map(RemotePayload::Document)
        }
    }
}

/// Body of a batch write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub documents: Vec<Document>,
}

/// JSON error body returned by the server. `error` is a stable code such as
/// `wrong-password`; `message` is for humans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::CollectionKind;
    use serde_json::json;

    #[test]
    fn test_listen_message_encode_decode() {
        let msg = ProtocolMessage::Listen {
            target: "todos".to_string(),
            order_by: Some(OrderBy::desc("rank")),
        };

        let encoded = msg.encode().unwrap();
        let decoded = ProtocolMessage::decode(&encoded).unwrap();

        match decoded {
            ProtocolMessage::Listen { target, order_by } => {
                assert_eq!(target, "todos");
                assert_eq!(order_by, Some(OrderBy::desc("rank")));
            }
            _ => panic!("Expected Listen message"),
        }
    }

    #[test]
    fn test_collection_snapshot_payload() {
        let target = RemoteTarget::Collection(CollectionKind::Notes);
        let docs = vec![Document::new("1", json!({"title": "Ideas"}))];

        let msg = ProtocolMessage::collection_snapshot(target, &docs).unwrap();
        let decoded = ProtocolMessage::decode(&msg.encode().unwrap()).unwrap();

        match decoded {
            ProtocolMessage::Snapshot { target: name, data } => {
                assert_eq!(name, "notes");
                assert_eq!(
                    decode_snapshot(target, &data).unwrap(),
                    RemotePayload::Collection(docs)
                );
            }
            _ => panic!("Expected Snapshot message"),
        }
    }

    #[test]
    fn test_missing_stats_document_decodes_to_none() {
        let msg = ProtocolMessage::document_snapshot(RemoteTarget::Stats, None).unwrap();
        let ProtocolMessage::Snapshot { data, .. } = msg else {
            panic!("Expected Snapshot message");
        };
        assert_eq!(
            decode_snapshot(RemoteTarget::Stats, &data).unwrap(),
            RemotePayload::Document(None)
        );
    }
}
