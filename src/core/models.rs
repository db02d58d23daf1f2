use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub section_title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(section_title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            section_title: section_title.into(),
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A stored paper. Immutable for the duration of an exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Paper {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            chunks: Vec::new(),
        }
    }

    pub fn with_chunk(mut self, chunk: Chunk) -> Self {
        self.chunks.push(chunk);
        self
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    Unset,
    Citation,
    Baseline,
}

/// Directed edge `source → target` carrying the cached relevance of `target`
/// to `source`. Once `relevance_score` is set it is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_id: String,
    pub target_id: String,
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relevance_score: None,
            relationship_type: RelationshipType::Unset,
            remarks: None,
            updated_at: Utc::now(),
        }
    }

    pub fn scored(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        score: f64,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            relevance_score: Some(score),
            relationship_type,
            ..Self::new(source_id, target_id)
        }
    }
}

/// Candidate waiting in a frontier. `depth` is the level it will be expanded at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub id: String,
    pub title: String,
    pub score: f64,
    pub depth: u32,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub score: f64,
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

impl GraphLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
