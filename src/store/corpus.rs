
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::memory::{InMemoryPaperStore, InMemoryRelationStore};
use super::{StoreError, StoreResult};
use crate::core::models::{Chunk, Paper, Relation};

/// One paper as it appears in a corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusPaper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub cited_by: Vec<String>,
}

/// Papers, their reference lists and any previously computed relations,
/// loaded from a single JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub papers: Vec<CorpusPaper>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Corpus {

    pub fn from_json(json: &str) -> StoreResult<Self> {
        let corpus: Self = serde_json::from_str(json)?;
        corpus.validate()?;
        Ok(corpus)
    }


    pub async fn load(path: &Path) -> StoreResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let corpus = Self::from_json(&json)?;
        info!(
            "Loaded corpus from {}: {} papers, {} relations",
            path.display(),
            corpus.papers.len(),
            corpus.relations.len()
        );
        Ok(corpus)
    }

    fn validate(&self) -> StoreResult<()> {
        let mut seen = std::collections::HashSet::new();
        for paper in &self.papers {
            if paper.id.trim().is_empty() {
                return Err(StoreError::Invalid(format!(
                    "paper '{}' has an empty id",
                    crate::safe_truncate_ellipsis(&paper.title, 40)
                )));
            }
            if !seen.insert(paper.id.as_str()) {
                return Err(StoreError::Invalid(format!("duplicate paper id {}", paper.id)));
            }
            let dims: Vec<usize> = paper
                .chunks
                .iter()
                .filter_map(|c| c.embedding.as_ref().map(Vec::len))
                .collect();
            if dims.windows(2).any(|w| w[0] != w[1]) {
                return Err(StoreError::Invalid(format!(
                    "paper {} mixes embedding dimensions",
                    paper.id
                )));
            }
        }
        Ok(())
    }

    /// Builds in-memory stores. Citation edges come from explicit `cited_by`
    /// lists plus every reference title that resolves above `title_match_threshold`.
    pub fn into_stores(self, title_match_threshold: f64) -> (InMemoryPaperStore, InMemoryRelationStore) {
        let papers = InMemoryPaperStore::new();
        let mut explicit = Vec::new();

        for entry in self.papers {
            for citer in &entry.cited_by {
                explicit.push((citer.clone(), entry.id.clone()));
            }
            let paper = Paper {
                id: entry.id,
                title: entry.title,
                chunks: entry.chunks,
            };
            papers.insert_paper(paper, entry.references);
        }

        for (citer, cited) in explicit {
            papers.add_citation(&citer, &cited);
        }
        papers.rebuild_citation_index(title_match_threshold);

        let relations = InMemoryRelationStore::new();
        for relation in self.relations {
            relations.insert(relation);
        }

        (papers, relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PaperStore, RelationStore};

    const CORPUS: &str = r#"{
        "papers": [
            {
                "id": "p0",
                "title": "Attention Is All You Need",
                "chunks": [{"section_title": "Abstract", "text": "transformers", "embedding": [1.0, 0.0]}],
                "references": ["Sequence to Sequence Learning with Neural Networks"]
            },
            {
                "id": "p1",
                "title": "Sequence to Sequence Learning with Neural Networks",
                "cited_by": ["p9"]
            },
            {"id": "p9", "title": "Some Later Survey"}
        ],
        "relations": [
            {"source_id": "p0", "target_id": "p1", "relevance_score": 0.91,
             "relationship_type": "citation", "updated_at": "2024-01-01T00:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn test_corpus_into_stores() {
        let corpus = Corpus::from_json(CORPUS).unwrap();
        let (papers, relations) = corpus.into_stores(0.5);

        assert_eq!(papers.len(), 3);
        let mut citers = papers.incoming_citers("p1").await.unwrap();
        citers.sort();
        assert_eq!(citers, vec!["p0".to_string(), "p9".to_string()]);

        let relation = relations.get("p0", "p1").await.unwrap().unwrap();
        assert_eq!(relation.relevance_score, Some(0.91));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"papers": [{"id": "a", "title": "x"}, {"id": "a", "title": "y"}]}"#;
        assert!(matches!(Corpus::from_json(json), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let json = r#"{"papers": [{"id": "a", "title": "x", "chunks": [
            {"section_title": "s1", "text": "t", "embedding": [1.0, 0.0]},
            {"section_title": "s2", "text": "t", "embedding": [1.0]}
        ]}]}"#;
        assert!(Corpus::from_json(json).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Corpus::load(Path::new("/definitely/not/here.json")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
