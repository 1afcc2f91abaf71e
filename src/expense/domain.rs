//! Core expense domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserId, category::CategoryId};

/// Store key for an expense.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct ExpenseId(String);

impl ExpenseId {
    /// Wrap a store generated key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExpenseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A strictly positive, finite amount of money.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// Returns [Error::NonPositiveAmount] if `amount` is zero, negative or not finite.
    pub fn new(amount: f64) -> Result<Self, Error> {
        if amount.is_finite() && amount > 0.0 {
            Ok(Self(amount))
        } else {
            Err(Error::NonPositiveAmount(amount))
        }
    }

    /// The amount as a float.
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Money spent on something, filed under a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub amount: Amount,
    pub description: String,
    pub occurred_at: OffsetDateTime,
    /// The category this expense is filed under. May not resolve if the
    /// category was deleted.
    pub category_id: CategoryId,
    /// An opaque reference to an attached receipt photo.
    pub photo_ref: Option<String>,
    pub owner: UserId,
}

/// The fields needed to create or replace an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: Amount,
    pub description: String,
    pub occurred_at: OffsetDateTime,
    pub category_id: CategoryId,
    pub photo_ref: Option<String>,
}

impl NewExpense {
    /// Attach the store key and owner to the new expense.
    pub fn with_id(self, id: ExpenseId, owner: UserId) -> Expense {
        Expense {
            id,
            amount: self.amount,
            description: self.description,
            occurred_at: self.occurred_at,
            category_id: self.category_id,
            photo_ref: self.photo_ref,
            owner,
        }
    }
}
