use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{RecommendationResult, VectorOwner};
use crate::models::{ItemId, UserId};
use crate::repository::{InteractionRepository, ItemRepository, UserRepository};
use crate::scoring::vector::{mean, validate};

/// Maintains user preference vectors from like events.
///
/// Every like triggers a full recomputation over all liked items, so
/// re-liking an item yields the same vector.
#[derive(Clone)]
pub struct EmbeddingAggregator {
    items: Arc<dyn ItemRepository>,
    users: Arc<dyn UserRepository>,
    interactions: Arc<dyn InteractionRepository>,
}

impl EmbeddingAggregator {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        users: Arc<dyn UserRepository>,
        interactions: Arc<dyn InteractionRepository>,
    ) -> Self {
        Self {
            items,
            users,
            interactions,
        }
    }

    /// Record the like and recompute the user's vector.
    ///
    /// Returns the new vector, or `None` when no liked item carries an
    /// embedding; the stored vector is left untouched in that case.
    #[instrument(skip(self))]
    pub async fn on_like(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> RecommendationResult<Option<Vec<f32>>> {
        self.interactions.mark_liked(user_id, item_id).await?;
        self.recompute(user_id).await
    }

    /// Mean of the embeddings of every liked item that has one.
    ///
    /// All of them must share the first one's dimension; a mismatching or
    /// malformed embedding fails the update and keeps the stored vector.
    pub async fn recompute(&self, user_id: UserId) -> RecommendationResult<Option<Vec<f32>>> {
        let liked = self.interactions.liked_item_ids(user_id).await?;
        let items = self.items.find_by_ids(&liked).await?;

        let mut embeddings: Vec<&[f32]> = Vec::with_capacity(items.len());
        for item in &items {
            let Some(embedding) = item.embedding.as_deref() else {
                continue;
            };
            let expected = embeddings.first().map(|first| first.len());
            embeddings.push(validate(Some(embedding), VectorOwner::Item(item.id), expected)?);
        }
        let Some(vector) = mean(embeddings.iter().copied()) else {
            debug!(liked = liked.len(), "No liked item with an embedding");
            return Ok(None);
        };

        self.users
            .set_preference_vector(user_id, vector.clone())
            .await?;
        debug!(liked = liked.len(), used = embeddings.len(), "Preference vector updated");
        Ok(Some(vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecommendationError, ScoringError};
    use crate::memory::InMemoryCatalog;
    use crate::models::{Item, User};
    use crate::repository::{MockInteractionRepository, MockItemRepository, MockUserRepository};
    use mockall::predicate::eq;

    async fn catalog() -> Arc<InMemoryCatalog> {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_user(User::new(1, "ada")).await;
        catalog
            .insert_item(Item::new(10, "A").with_embedding(vec![1.0, 0.0]))
            .await;
        catalog
            .insert_item(Item::new(11, "B").with_embedding(vec![0.0, 3.0]))
            .await;
        catalog.insert_item(Item::new(12, "C")).await;
        catalog
    }

    fn aggregator(catalog: &Arc<InMemoryCatalog>) -> EmbeddingAggregator {
        EmbeddingAggregator::new(catalog.clone(), catalog.clone(), catalog.clone())
    }

    async fn stored_vector(catalog: &InMemoryCatalog) -> Option<Vec<f32>> {
        catalog.get_user(1).await.unwrap().unwrap().preference_vector
    }

    #[tokio::test]
    async fn test_like_sequence() {
        let catalog = catalog().await;
        let aggregator = aggregator(&catalog);

        aggregator.on_like(1, 10).await.unwrap();
        assert_eq!(stored_vector(&catalog).await, Some(vec![1.0, 0.0]));

        aggregator.on_like(1, 11).await.unwrap();
        assert_eq!(stored_vector(&catalog).await, Some(vec![0.5, 1.5]));

        aggregator.on_like(1, 10).await.unwrap();
        assert_eq!(stored_vector(&catalog).await, Some(vec![0.5, 1.5]));
    }

    #[tokio::test]
    async fn test_items_without_embedding_are_ignored() {
        let catalog = catalog().await;
        let aggregator = aggregator(&catalog);

        assert_eq!(aggregator.on_like(1, 12).await.unwrap(), None);
        assert_eq!(stored_vector(&catalog).await, None);

        aggregator.on_like(1, 10).await.unwrap();
        assert_eq!(stored_vector(&catalog).await, Some(vec![1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_mixed_dimensions_fail_and_keep_stored_vector() {
        let catalog = catalog().await;
        catalog
            .insert_item(Item::new(13, "D").with_embedding(vec![1.0, 0.0, 0.0]))
            .await;
        let aggregator = aggregator(&catalog);

        aggregator.on_like(1, 10).await.unwrap();
        let err = aggregator.on_like(1, 13).await.unwrap_err();

        assert!(matches!(
            err,
            RecommendationError::Scoring(ScoringError::DimensionMismatch {
                owner: VectorOwner::Item(13),
                expected: 2,
                actual: 3,
            })
        ));
        assert_eq!(stored_vector(&catalog).await, Some(vec![1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_vector_not_written_without_embeddings() {
        let mut interactions = MockInteractionRepository::new();
        interactions
            .expect_mark_liked()
            .with(eq(1), eq(12))
            .returning(|_, _| Ok(()));
        interactions
            .expect_liked_item_ids()
            .with(eq(1))
            .returning(|_| Ok(vec![12]));

        let mut items = MockItemRepository::new();
        items
            .expect_find_by_ids()
            .returning(|_| Ok(vec![Item::new(12, "C")]));

        let mut users = MockUserRepository::new();
        users.expect_set_preference_vector().never();

        let aggregator =
            EmbeddingAggregator::new(Arc::new(items), Arc::new(users), Arc::new(interactions));
        assert_eq!(aggregator.on_like(1, 12).await.unwrap(), None);
    }
}
