
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{PaperStore, RelationStore, StoreError, StoreResult};
use crate::core::models::{Paper, Relation, RelationshipType};
use crate::utils::title_similarity;


#[derive(Default)]
pub struct InMemoryPaperStore {
    papers: RwLock<HashMap<String, Paper>>,
    references: RwLock<HashMap<String, Vec<String>>>,
    citers: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn insert_paper(&self, paper: Paper, reference_titles: Vec<String>) {
        let id = paper.id.clone();
        self.references.write().insert(id.clone(), reference_titles);
        self.papers.write().insert(id, paper);
    }

    /// Records that `citer_id` cites `cited_id`. Duplicate edges are ignored.
    pub fn add_citation(&self, citer_id: &str, cited_id: &str) {
        let mut citers = self.citers.write();
        let entry = citers.entry(cited_id.to_string()).or_default();
        if !entry.iter().any(|c| c == citer_id) {
            entry.push(citer_id.to_string());
        }
    }

    /// Resolves every stored reference title and records the resulting
    /// citation edges so `incoming_citers` reflects the reference lists.
    pub fn rebuild_citation_index(&self, min_similarity: f64) -> usize {
        let references: Vec<(String, Vec<String>)> = self
            .references
            .read()
            .iter()
            .map(|(id, titles)| (id.clone(), titles.clone()))
            .collect();

        let mut edges = 0;
        for (citer_id, titles) in references {
            for title in titles {
                if let Some(cited_id) = self.best_title_match(&title, min_similarity) {
                    if cited_id != citer_id {
                        self.add_citation(&citer_id, &cited_id);
                        edges += 1;
                    }
                }
            }
        }
        info!("Citation index rebuilt: {} edges", edges);
        edges
    }

    pub fn len(&self) -> usize {
        self.papers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.read().is_empty()
    }

    fn best_title_match(&self, title: &str, min_similarity: f64) -> Option<String> {
        let papers = self.papers.read();
        let mut best: Option<(f64, &str)> = None;
        for paper in papers.values() {
            let similarity = title_similarity(title, &paper.title);
            if similarity <= min_similarity {
                continue;
            }
            let better = match best {
                None => true,
                Some((score, id)) => similarity > score || (similarity == score && paper.id.as_str() < id),
            };
            if better {
                best = Some((similarity, paper.id.as_str()));
            }
        }
        best.map(|(_, id)| id.to_string())
    }
}

#[async_trait]
impl PaperStore for InMemoryPaperStore {
    async fn get_paper(&self, id: &str) -> StoreResult<Option<Paper>> {
        Ok(self.papers.read().get(id).cloned())
    }

    async fn outgoing_reference_titles(&self, id: &str) -> StoreResult<Vec<String>> {
        if !self.papers.read().contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(self.references.read().get(id).cloned().unwrap_or_default())
    }

    async fn resolve_title_to_id(&self, title: &str, min_similarity: f64) -> StoreResult<Option<String>> {
        let resolved = self.best_title_match(title, min_similarity);
        debug!(
            "Resolved '{}' -> {:?}",
            crate::safe_truncate_ellipsis(title, 60),
            resolved
        );
        Ok(resolved)
    }

    async fn incoming_citers(&self, id: &str) -> StoreResult<Vec<String>> {
        Ok(self.citers.read().get(id).cloned().unwrap_or_default())
    }
}


#[derive(Default)]
pub struct InMemoryRelationStore {
    relations: RwLock<HashMap<(String, String), Relation>>,
    writes: AtomicU64,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a relation directly, bypassing write accounting.
    pub fn insert(&self, relation: Relation) {
        self.relations
            .write()
            .insert((relation.source_id.clone(), relation.target_id.clone()), relation);
    }

    pub fn len(&self) -> usize {
        self.relations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.read().is_empty()
    }

    /// Number of `upsert` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
    async fn get(&self, source_id: &str, target_id: &str) -> StoreResult<Option<Relation>> {
        Ok(self
            .relations
            .read()
            .get(&(source_id.to_string(), target_id.to_string()))
            .cloned())
    }

    async fn upsert(
        &self,
        source_id: &str,
        target_id: &str,
        score: f64,
        relationship_type: RelationshipType,
        remarks: Option<String>,
    ) -> StoreResult<()> {
        if !score.is_finite() {
            return Err(StoreError::Invalid(format!(
                "non-finite score for {} -> {}",
                source_id, target_id
            )));
        }

        let mut relations = self.relations.write();
        let relation = relations
            .entry((source_id.to_string(), target_id.to_string()))
            .or_insert_with(|| Relation::new(source_id, target_id));
        relation.relevance_score = Some(score);
        relation.relationship_type = relationship_type;
        relation.remarks = remarks;
        relation.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn store() -> InMemoryPaperStore {
        let store = InMemoryPaperStore::new();
        store.insert_paper(
            Paper::new("vaswani", "Attention Is All You Need"),
            vec![
                "Neural Machine Translation by Jointly Learning to Align and Translate".into(),
                "A paper nobody has ingested".into(),
            ],
        );
        store.insert_paper(
            Paper::new("bahdanau", "Neural machine translation by jointly learning to align and translate"),
            vec![],
        );
        store
    }

    #[tokio::test]
    async fn test_resolve_title_to_id() {
        let store = store();
        let hit = store
            .resolve_title_to_id("Neural Machine Translation by Jointly Learning to Align and Translate.", 0.5)
            .await
            .unwrap();
        assert_eq!(hit.as_deref(), Some("bahdanau"));

        let miss = store.resolve_title_to_id("A paper nobody has ingested", 0.5).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_reference_titles_for_missing_paper() {
        let store = store();
        assert_eq!(store.outgoing_reference_titles("vaswani").await.unwrap().len(), 2);
        assert!(matches!(
            store.outgoing_reference_titles("ghost").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_citation_index_from_references() {
        let store = store();
        assert_eq!(store.rebuild_citation_index(0.5), 1);
        assert_eq!(store.incoming_citers("bahdanau").await.unwrap(), vec!["vaswani".to_string()]);
        assert!(store.incoming_citers("vaswani").await.unwrap().is_empty());

        store.add_citation("vaswani", "bahdanau");
        assert_eq!(store.incoming_citers("bahdanau").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_relation_upsert_and_get() {
        let relations = InMemoryRelationStore::new();
        assert!(relations.get("root", "p1").await.unwrap().is_none());

        relations
            .upsert("root", "p1", 0.93, RelationshipType::Citation, None)
            .await
            .unwrap();
        let stored = relations.get("root", "p1").await.unwrap().unwrap();
        assert_eq!(stored.relevance_score, Some(0.93));
        assert_eq!(stored.relationship_type, RelationshipType::Citation);
        assert_eq!(relations.write_count(), 1);

        assert!(relations.get("p1", "root").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relation_rejects_nan() {
        let relations = InMemoryRelationStore::new();
        let err = assert_err!(relations.upsert("a", "b", f64::NAN, RelationshipType::Unset, None).await);
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(relations.is_empty());
        assert_ok!(relations.upsert("a", "b", 0.5, RelationshipType::Unset, None).await);
    }
}
