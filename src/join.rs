//! Joins expenses and budgets to the categories they reference.
//!
//! The store does not enforce referential integrity, so a category may be
//! deleted while expenses or budgets still point at it. Such orphaned records
//! are left out of every joined view. They stay in the store and can still be
//! fetched by key.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;

use crate::{
    budget::Budget,
    category::{Category, CategoryId},
    expense::Expense,
    live::{Snapshot, SnapshotStream, combine_latest},
};

/// A record that references a category by key.
pub trait CategoryKeyed {
    /// The key of the referenced category.
    fn category_id(&self) -> &CategoryId;
}

impl CategoryKeyed for Expense {
    fn category_id(&self) -> &CategoryId {
        &self.category_id
    }
}

impl CategoryKeyed for Budget {
    fn category_id(&self) -> &CategoryId {
        &self.category_id
    }
}

/// A record paired with the category its key resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joined<T> {
    pub item: T,
    pub category: Category,
}

fn index_categories(categories: &[Category]) -> HashMap<&CategoryId, &Category> {
    categories
        .iter()
        .map(|category| (&category.id, category))
        .collect()
}

/// Pair every item with its category, dropping items whose category key does
/// not resolve. Item order is preserved.
pub fn join_by_category<T>(categories: &[Category], items: &[T]) -> Vec<Joined<T>>
where
    T: CategoryKeyed + Clone,
{
    let index = index_categories(categories);

    let joined: Vec<Joined<T>> = items
        .iter()
        .filter_map(|item| {
            index.get(item.category_id()).map(|category| Joined {
                item: item.clone(),
                category: (*category).clone(),
            })
        })
        .collect();

    let orphan_count = items.len() - joined.len();
    if orphan_count > 0 {
        tracing::debug!("left {orphan_count} record(s) with unknown categories out of the join");
    }

    joined
}

/// The items whose category key does not resolve.
pub fn orphans<'a, T>(categories: &[Category], items: &'a [T]) -> Vec<&'a T>
where
    T: CategoryKeyed,
{
    let index = index_categories(categories);

    items
        .iter()
        .filter(|item| !index.contains_key(item.category_id()))
        .collect()
}

/// Keep a joined view of `items` up to date with the latest categories.
///
/// A new joined snapshot is emitted whenever either input emits, once both
/// have emitted at least once.
pub fn joined_stream<T>(
    categories: SnapshotStream<Category>,
    items: SnapshotStream<T>,
) -> SnapshotStream<Joined<T>>
where
    T: CategoryKeyed + Clone + Send + Sync + 'static,
{
    combine_latest(categories, items).map(
        |(categories, items): (Snapshot<Category>, Snapshot<T>)| {
            Arc::from(join_by_category(&categories, &items))
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::{join_by_category, joined_stream, orphans};
    use crate::{
        UserId,
        category::{Category, CategoryName, Color},
        expense::{Amount, Expense},
        live::{Snapshot, channel},
    };

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.into(),
            name: CategoryName::new_unchecked(name),
            color: Color::from_argb(0xFFFF0000),
            owner: UserId::new("u1"),
        }
    }

    fn expense(id: &str, category_id: &str, amount: f64) -> Expense {
        Expense {
            id: id.into(),
            amount: Amount::new(amount).unwrap(),
            description: String::new(),
            occurred_at: datetime!(2024-01-10 12:00 UTC),
            category_id: category_id.into(),
            photo_ref: None,
            owner: UserId::new("u1"),
        }
    }

    #[test]
    fn join_pairs_items_with_categories() {
        let categories = vec![category("a", "Food"), category("b", "Transport")];
        let expenses = vec![expense("1", "b", 10.0), expense("2", "a", 20.0)];

        let joined = join_by_category(&categories, &expenses);

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].item.id.as_str(), "1");
        assert_eq!(joined[0].category.name.as_ref(), "Transport");
        assert_eq!(joined[1].category.name.as_ref(), "Food");
    }

    #[test]
    fn join_drops_orphans() {
        let categories = vec![category("a", "Food")];
        let expenses = vec![expense("1", "a", 10.0), expense("2", "missing", 999.0)];

        let joined = join_by_category(&categories, &expenses);
        let orphaned = orphans(&categories, &expenses);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].item.id.as_str(), "1");
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].id.as_str(), "2");
    }

    #[test]
    fn join_with_no_categories_is_empty() {
        let expenses = vec![expense("1", "a", 10.0)];

        assert!(join_by_category::<Expense>(&[], &expenses).is_empty());
    }

    #[tokio::test]
    async fn joined_stream_rejoins_when_categories_change() {
        let (categories_tx, categories_rx) = channel::<Snapshot<Category>>();
        let (expenses_tx, expenses_rx) = channel::<Snapshot<Expense>>();
        let mut joined = joined_stream(categories_rx, expenses_rx);

        expenses_tx.publish(Arc::from(vec![expense("1", "a", 10.0)]));
        categories_tx.publish(Arc::from(Vec::<Category>::new()));
        assert!(joined.next().await.unwrap().is_empty());

        // The expense only resolves once its category shows up.
        categories_tx.publish(Arc::from(vec![category("a", "Food")]));
        let snapshot = joined.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].category.name.as_ref(), "Food");

        // Deleting the category orphans the expense again.
        categories_tx.publish(Arc::from(Vec::<Category>::new()));
        assert!(joined.next().await.unwrap().is_empty());
    }
}
