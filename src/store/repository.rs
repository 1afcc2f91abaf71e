//! Maps categories, expenses and budgets onto a user's document collections.

use std::{fmt::Display, sync::Arc, time::Duration};

use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{
    Error, UserId,
    budget::{Budget, BudgetId, NewBudget},
    category::{Category, CategoryId, NewCategory},
    config::StoreConfig,
    document::{DocumentReader, FromDocument, OWNER, ToDocument, decode_all},
    expense::{Expense, ExpenseId, NewExpense},
    live::{Snapshot, SnapshotStream, Subscription},
    store::DocumentStore,
    window::DateWindow,
};

/// The kinds of entity a user owns, each kept in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Category,
    Expense,
    Budget,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Category => "categories",
            Self::Expense => "expenses",
            Self::Budget => "budgets",
        };

        f.write_str(name)
    }
}

/// A user's view of the document store.
///
/// Every collection is scoped to the user as `users/{user}/{kind}`, and every
/// document written records the user in its `owner` field.
///
/// Cloning is cheap and clones share the same store.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    user: UserId,
    config: StoreConfig,
}

impl Repository {
    /// Create a repository for `user` on top of `store`.
    pub fn new(store: Arc<dyn DocumentStore>, user: UserId, config: StoreConfig) -> Self {
        Self {
            store,
            user,
            config,
        }
    }

    /// The user whose data this repository reads and writes.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    fn collection(&self, kind: EntityKind) -> String {
        format!("users/{}/{kind}", self.user)
    }

    fn create<N: ToDocument>(&self, kind: EntityKind, new: &N) -> Result<String, Error> {
        let mut document = new.to_document();
        document.insert(OWNER.to_owned(), Value::from(self.user.as_str()));

        let collection = self.collection(kind);
        let key = self.store.insert(&collection, document)?;
        tracing::debug!("created document {key} in {collection}");

        Ok(key)
    }

    fn update<N: ToDocument>(&self, kind: EntityKind, key: &str, new: &N) -> Result<(), Error> {
        let mut document = new.to_document();
        document.insert(OWNER.to_owned(), Value::from(self.user.as_str()));

        let collection = self.collection(kind);
        self.store.replace(&collection, key, document)?;
        tracing::debug!("updated document {key} in {collection}");

        Ok(())
    }

    fn delete(&self, kind: EntityKind, key: &str) -> Result<(), Error> {
        let collection = self.collection(kind);
        self.store.remove(&collection, key)?;
        tracing::debug!("deleted document {key} in {collection}");

        Ok(())
    }

    fn get<T: FromDocument>(&self, kind: EntityKind, key: &str) -> Result<Option<T>, Error> {
        let collection = self.collection(kind);

        let Some(document) = self.store.get(&collection, key)? else {
            return Ok(None);
        };

        match T::from_document(&DocumentReader::new(&collection, key, &document)) {
            Ok(entity) => Ok(Some(entity)),
            Err(warning) => {
                tracing::warn!("{warning}");
                Ok(None)
            }
        }
    }

    fn subscribe<T>(&self, kind: EntityKind) -> SnapshotStream<T>
    where
        T: FromDocument + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let collection = self.collection(kind);
        let changes = store.watch(&collection);
        let retry_interval = self.config.retry_interval;

        Subscription::spawn(move |publisher| async move {
            let mut changes = changes;
            let mut failing = false;

            loop {
                changes.borrow_and_update();

                match store.list(&collection) {
                    Ok(documents) => {
                        if failing {
                            tracing::info!("reading {collection} again");
                            failing = false;
                        }

                        let entities: Vec<T> = decode_all(&collection, documents);
                        if !publisher.publish(Snapshot::from(entities)) {
                            break;
                        }

                        wait_for_change(&mut changes, retry_interval).await;
                    }
                    Err(error) => {
                        if failing {
                            tracing::debug!("still cannot read {collection}: {error}");
                        } else {
                            tracing::error!("cannot read {collection}: {error}");
                            failing = true;

                            if !publisher.publish(Snapshot::from(Vec::new())) {
                                break;
                            }
                        }

                        tokio::select! {
                            _ = tokio::time::sleep(retry_interval) => {}
                            _ = wait_for_change(&mut changes, retry_interval) => {}
                        }
                    }
                }
            }
        })
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn create_category(&self, category: NewCategory) -> Result<CategoryId, Error> {
        self.create(EntityKind::Category, &category)
            .map(CategoryId::new)
    }

    /// Overwrite the category stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no such category, or another
    /// error if the store cannot be reached or the write fails.
    pub fn update_category(&self, id: &CategoryId, category: NewCategory) -> Result<(), Error> {
        self.update(EntityKind::Category, id.as_str(), &category)
    }

    /// Delete the category stored under `id`.
    ///
    /// Expenses and budgets that reference the category are left alone. They
    /// drop out of joined views until a category with the same key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn delete_category(&self, id: &CategoryId) -> Result<(), Error> {
        self.delete(EntityKind::Category, id.as_str())
    }

    /// Read one category.
    ///
    /// A stored document that cannot be decoded reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the read fails.
    pub fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, Error> {
        self.get(EntityKind::Category, id.as_str())
    }

    /// Follow the user's categories.
    ///
    /// The current snapshot is delivered straight away and a fresh one after
    /// every change. While the store cannot be read the stream delivers one
    /// empty snapshot and keeps retrying.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn subscribe_categories(&self) -> SnapshotStream<Category> {
        self.subscribe(EntityKind::Category)
    }

    /// Create an expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn create_expense(&self, expense: NewExpense) -> Result<ExpenseId, Error> {
        self.create(EntityKind::Expense, &expense).map(ExpenseId::new)
    }

    /// Overwrite the expense stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no such expense, or another
    /// error if the store cannot be reached or the write fails.
    pub fn update_expense(&self, id: &ExpenseId, expense: NewExpense) -> Result<(), Error> {
        self.update(EntityKind::Expense, id.as_str(), &expense)
    }

    /// Delete the expense stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn delete_expense(&self, id: &ExpenseId) -> Result<(), Error> {
        self.delete(EntityKind::Expense, id.as_str())
    }

    /// Read one expense, whether or not its category still exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the read fails.
    pub fn get_expense(&self, id: &ExpenseId) -> Result<Option<Expense>, Error> {
        self.get(EntityKind::Expense, id.as_str())
    }

    /// Follow the user's expenses. See [Repository::subscribe_categories].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn subscribe_expenses(&self) -> SnapshotStream<Expense> {
        self.subscribe(EntityKind::Expense)
    }

    /// Follow the user's expenses that occurred between `start` and `end`,
    /// both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidWindow] if `end` is before `start`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn subscribe_expenses_in_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<SnapshotStream<Expense>, Error> {
        let window = DateWindow::new(start, end)?;

        Ok(self
            .subscribe_expenses()
            .map(move |expenses: Snapshot<Expense>| {
                expenses
                    .iter()
                    .filter(|expense| window.contains(expense.occurred_at))
                    .cloned()
                    .collect()
            }))
    }

    /// Follow the user's expenses in one category.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn subscribe_expenses_by_category(
        &self,
        category_id: CategoryId,
    ) -> SnapshotStream<Expense> {
        self.subscribe_expenses()
            .map(move |expenses: Snapshot<Expense>| {
                expenses
                    .iter()
                    .filter(|expense| expense.category_id == category_id)
                    .cloned()
                    .collect()
            })
    }

    /// Create a budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn create_budget(&self, budget: NewBudget) -> Result<BudgetId, Error> {
        self.create(EntityKind::Budget, &budget).map(BudgetId::new)
    }

    /// Overwrite the budget stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no such budget, or another
    /// error if the store cannot be reached or the write fails.
    pub fn update_budget(&self, id: &BudgetId, budget: NewBudget) -> Result<(), Error> {
        self.update(EntityKind::Budget, id.as_str(), &budget)
    }

    /// Delete the budget stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    pub fn delete_budget(&self, id: &BudgetId) -> Result<(), Error> {
        self.delete(EntityKind::Budget, id.as_str())
    }

    /// Read one budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the read fails.
    pub fn get_budget(&self, id: &BudgetId) -> Result<Option<Budget>, Error> {
        self.get(EntityKind::Budget, id.as_str())
    }

    /// Follow the user's budgets. See [Repository::subscribe_categories].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn subscribe_budgets(&self) -> SnapshotStream<Budget> {
        self.subscribe(EntityKind::Budget)
    }
}

/// Wait for the next change notification.
///
/// A store that has stopped sending notifications is polled instead.
async fn wait_for_change(changes: &mut watch::Receiver<u64>, fallback: Duration) {
    if changes.changed().await.is_err() {
        tokio::time::sleep(fallback).await;
    }
}
