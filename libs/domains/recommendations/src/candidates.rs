use crate::models::{Item, ItemId, TaskDescriptor};

/// How a task narrows the catalog down to candidates.
///
/// A query takes precedence over an explicit id list. Items without an
/// embedding are never candidates, whatever the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFilter {
    All,
    /// Case-insensitive substring of title or description, held lowercase
    Query(String),
    Ids(Vec<ItemId>),
}

impl CandidateFilter {
    pub fn query(query: &str) -> Self {
        CandidateFilter::Query(query.to_lowercase())
    }

    pub fn from_descriptor(descriptor: &TaskDescriptor) -> Self {
        if let Some(query) = descriptor.query() {
            CandidateFilter::query(query)
        } else if let Some(ids) = descriptor.item_ids() {
            CandidateFilter::Ids(ids.to_vec())
        } else {
            CandidateFilter::All
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        if !item.has_embedding() {
            return false;
        }

        match self {
            CandidateFilter::All => true,
            CandidateFilter::Query(query) => {
                item.title.to_lowercase().contains(query.as_str())
                    || item.description.to_lowercase().contains(query.as_str())
            }
            CandidateFilter::Ids(ids) => ids.contains(&item.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, title: &str, description: &str) -> Item {
        Item::new(id, title)
            .with_description(description)
            .with_embedding(vec![1.0, 0.0])
    }

    #[test]
    fn test_filter_precedence() {
        let descriptor = TaskDescriptor::new(1, 2, 5)
            .with_query("Jazz")
            .with_item_ids(vec![3]);
        assert_eq!(
            CandidateFilter::from_descriptor(&descriptor),
            CandidateFilter::Query("jazz".into())
        );

        let descriptor = TaskDescriptor::new(1, 2, 5)
            .with_query("")
            .with_item_ids(vec![3]);
        assert_eq!(
            CandidateFilter::from_descriptor(&descriptor),
            CandidateFilter::Ids(vec![3])
        );

        let descriptor = TaskDescriptor::new(1, 2, 5).with_item_ids(vec![]);
        assert_eq!(CandidateFilter::from_descriptor(&descriptor), CandidateFilter::All);
    }

    #[test]
    fn test_query_matches_title_or_description() {
        let filter = CandidateFilter::query("JaZz");
        assert_eq!(filter, CandidateFilter::Query("jazz".into()));
        assert!(filter.matches(&item(1, "Modern JAZZ", "")));
        assert!(filter.matches(&item(2, "Vinyl", "a jazzy record")));
        assert!(!filter.matches(&item(3, "Rock", "guitars")));
    }

    #[test]
    fn test_items_without_embedding_never_match() {
        let bare = Item::new(1, "Jazz");
        assert!(!CandidateFilter::All.matches(&bare));
        assert!(!CandidateFilter::Query("jazz".into()).matches(&bare));
        assert!(!CandidateFilter::Ids(vec![1]).matches(&bare));
    }
}
