

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::core::models::{GraphLink, GraphNode};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Downward,
    Upward,
}

/// Nodes discovered by one expansion together with their links. A batch is
/// always sent whole, so a client never sees a link before its nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphBatch {
    pub phase: Phase,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum StatusMessage {
    #[serde(rename = "max depth reached")]
    MaxDepthReached,
    #[serde(rename = "error")]
    Error { message: String },
}

/// One message on the exploration stream.
///
/// Wire shapes:
/// `{"phase": "downward", "nodes": [...], "links": [...]}`,
/// `{"status": "max depth reached"}`,
/// `{"status": "error", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Batch(GraphBatch),
    Status(StatusMessage),
}

impl StreamMessage {
    pub fn batch(phase: Phase, nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> Self {
        Self::Batch(GraphBatch { phase, nodes, links })
    }

    pub fn max_depth_reached() -> Self {
        Self::Status(StatusMessage::MaxDepthReached)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Status(StatusMessage::Error {
            message: message.into(),
        })
    }

    pub fn as_batch(&self) -> Option<&GraphBatch> {
        match self {
            Self::Batch(batch) => Some(batch),
            Self::Status(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Status(StatusMessage::Error { .. }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_wire_shape() {
        let message = StreamMessage::batch(
            Phase::Downward,
            vec![GraphNode { id: "p0".into(), title: "Seed".into(), score: 1.0 }],
            vec![GraphLink::new("p1", "p0")],
        );
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "phase": "downward",
                "nodes": [{"id": "p0", "title": "Seed", "score": 1.0}],
                "links": [{"source": "p1", "target": "p0"}],
            })
        );
    }

    #[test]
    fn test_status_wire_shapes() {
        assert_eq!(
            serde_json::to_value(StreamMessage::max_depth_reached()).unwrap(),
            json!({"status": "max depth reached"})
        );
        assert_eq!(
            serde_json::to_value(StreamMessage::error("embedding service unavailable")).unwrap(),
            json!({"status": "error", "message": "embedding service unavailable"})
        );
    }

    #[test]
    fn test_messages_parse_back() {
        let status: StreamMessage = serde_json::from_str(r#"{"status":"max depth reached"}"#).unwrap();
        assert_eq!(status, StreamMessage::max_depth_reached());

        let batch: StreamMessage =
            serde_json::from_str(r#"{"phase":"upward","nodes":[],"links":[]}"#).unwrap();
        assert_eq!(batch.as_batch().map(|b| b.phase), Some(Phase::Upward));
        assert!(StreamMessage::error("x").is_error());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Upward.to_string(), "upward");
    }
}
