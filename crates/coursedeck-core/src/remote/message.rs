//! Document protocol message types
//!
//! Messages exchanged with the document server using CBOR encoding, one
//! message per binary WebSocket frame.
//!
//! Documents travel as raw values and are turned into courses one at a time,
//! so a single malformed document does not invalidate the frame around it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::update::FieldUpdate;
use crate::models::Course;

/// Client identifier sent in the handshake
pub type ClientId = String;

/// Subscription identifier, chosen by the client
pub type SubId = u64;

/// Request identifier, chosen by the client
pub type ReqId = u64;

/// Protocol version
pub const PROTOCOL_V1: &str = "1";

/// Messages sent to the document server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Handshake
    #[serde(rename = "hello")]
    Hello {
        #[serde(rename = "clientId")]
        client_id: ClientId,
        collection: String,
        #[serde(rename = "protocolVersion")]
        protocol_version: String,
    },

    /// Start pushing snapshots (collection when `doc_id` is `None`)
    #[serde(rename = "watch")]
    Watch {
        #[serde(rename = "subId")]
        sub_id: SubId,
        #[serde(rename = "docId")]
        doc_id: Option<String>,
    },

    /// Stop pushing snapshots for a subscription
    #[serde(rename = "unwatch")]
    Unwatch {
        #[serde(rename = "subId")]
        sub_id: SubId,
    },

    /// One-shot read (collection when `doc_id` is `None`)
    #[serde(rename = "get")]
    Get {
        #[serde(rename = "reqId")]
        req_id: ReqId,
        #[serde(rename = "docId")]
        doc_id: Option<String>,
    },

    /// Atomic partial update of one document
    #[serde(rename = "update")]
    Update {
        #[serde(rename = "reqId")]
        req_id: ReqId,
        #[serde(rename = "docId")]
        doc_id: String,
        ops: Vec<FieldUpdate>,
    },
}

/// Messages received from the document server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake response
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(rename = "serverId")]
        server_id: String,
    },

    /// Collection snapshot for a collection subscription
    #[serde(rename = "snapshot")]
    Snapshot {
        #[serde(rename = "subId")]
        sub_id: SubId,
        docs: Vec<Value>,
    },

    /// Document snapshot for a document subscription (`None` = absent)
    #[serde(rename = "document")]
    Document {
        #[serde(rename = "subId")]
        sub_id: SubId,
        doc: Option<Value>,
    },

    /// Answer to a `get`
    #[serde(rename = "result")]
    Result {
        #[serde(rename = "reqId")]
        req_id: ReqId,
        docs: Vec<Value>,
    },

    /// Write accepted
    #[serde(rename = "ack")]
    Ack {
        #[serde(rename = "reqId")]
        req_id: ReqId,
    },

    /// Request or subscription failed
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "reqId", default)]
        req_id: Option<ReqId>,
        #[serde(rename = "subId", default)]
        sub_id: Option<SubId>,
        code: String,
        message: String,
    },
}

impl ClientMessage {
    /// Create a hello message for the courses collection
    pub fn hello(client_id: &str, collection: &str) -> Self {
        ClientMessage::Hello {
            client_id: client_id.to_string(),
            collection: collection.to_string(),
            protocol_version: PROTOCOL_V1.to_string(),
        }
    }

    /// Encode message to CBOR bytes
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)?;
        Ok(bytes)
    }
}

impl ServerMessage {
    /// Decode message from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(bytes)
    }
}

/// Convert one document, or `None` if it is not a valid course
pub fn decode_course(doc: Value) -> Option<Course> {
    match serde_json::from_value::<Course>(doc) {
        Ok(course) => Some(course),
        Err(e) => {
            warn!("Skipping undecodable course document: {}", e);
            None
        }
    }
}

/// Convert documents, skipping those that are not valid courses
pub fn decode_courses(docs: Vec<Value>) -> Vec<Course> {
    docs.into_iter().filter_map(decode_course).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::DocumentUpdate;
    use serde_json::json;

    #[test]
    fn test_hello_message_encoding() {
        let msg = ClientMessage::hello("client-123", "courses");
        let bytes = msg.encode().unwrap();

        // Should be non-empty CBOR
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_update_message_carries_ops() {
        let update = DocumentUpdate::new()
            .increment("likes", 1)
            .array_union("likedBy", vec![json!("u1")]);
        let msg = ClientMessage::Update {
            req_id: 7,
            doc_id: "c1".to_string(),
            ops: update.fields,
        };

        let bytes = msg.encode().unwrap();
        let decoded: ClientMessage = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_server_message_decoding() {
        let msg = ServerMessage::Document {
            sub_id: 3,
            doc: Some(serde_json::to_value(Course::new("c1", "Algorithms")).unwrap()),
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&msg, &mut bytes).unwrap();
        let decoded = ServerMessage::decode(&bytes).unwrap();

        match decoded {
            ServerMessage::Document { sub_id, doc } => {
                assert_eq!(sub_id, 3);
                assert_eq!(decode_course(doc.unwrap()).unwrap().name, "Algorithms");
            }
            _ => panic!("Expected Document message"),
        }
    }

    #[test]
    fn test_malformed_document_does_not_poison_snapshot() {
        let frame = json!({
            "type": "snapshot",
            "subId": 1,
            "docs": [
                {"id": "c1", "name": "Algorithms"},
                {"id": "c2", "syllabus": [{"week": 1, "content": "cells"}]},
                {"id": "c3", "name": "Chemistry", "students": [{"id": "u1"}]},
            ],
        });
        let mut bytes = Vec::new();
        ciborium::into_writer(&frame, &mut bytes).unwrap();

        let ServerMessage::Snapshot { sub_id, docs } = ServerMessage::decode(&bytes).unwrap() else {
            panic!("Expected Snapshot message");
        };
        let courses = decode_courses(docs);

        assert_eq!(sub_id, 1);
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn test_error_message_optional_ids() {
        let msg = ServerMessage::Error {
            req_id: None,
            sub_id: Some(4),
            code: "permission-denied".to_string(),
            message: "revoked".to_string(),
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&msg, &mut bytes).unwrap();
        assert_eq!(ServerMessage::decode(&bytes).unwrap(), msg);
    }
}
