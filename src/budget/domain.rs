//! Core budget domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserId, category::CategoryId, window::DateWindow};

/// Store key for a budget.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct BudgetId(String);

impl BudgetId {
    /// Wrap a store generated key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BudgetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Display for BudgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The spending range a budget allows: `0 <= minimum <= maximum`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimits {
    minimum: f64,
    maximum: f64,
}

impl BudgetLimits {
    /// Create a spending range.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBudgetAmounts] if either amount is negative or
    /// not finite, or if `maximum` is less than `minimum`.
    pub fn new(minimum: f64, maximum: f64) -> Result<Self, Error> {
        let valid = minimum.is_finite()
            && maximum.is_finite()
            && minimum >= 0.0
            && maximum >= minimum;

        if valid {
            Ok(Self { minimum, maximum })
        } else {
            Err(Error::InvalidBudgetAmounts(minimum, maximum))
        }
    }

    /// The amount that should at least be spent.
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    /// The most that may be spent.
    pub fn maximum(&self) -> f64 {
        self.maximum
    }
}

/// A spending range for one category over one date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub limits: BudgetLimits,
    pub category_id: CategoryId,
    /// The inclusive period the budget covers.
    pub window: DateWindow,
    pub owner: UserId,
}

impl Budget {
    /// Whether the budget's window contains `now`.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.window.contains(now)
    }
}

/// The fields needed to create or replace a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub limits: BudgetLimits,
    pub category_id: CategoryId,
    pub window: DateWindow,
}

impl NewBudget {
    /// Build a budget from raw values, validating amounts and dates.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBudgetAmounts] for a bad spending range and
    /// [Error::InvalidBudgetWindow] if `end_at` is before `start_at`.
    pub fn new(
        minimum_amount: f64,
        maximum_amount: f64,
        category_id: CategoryId,
        start_at: OffsetDateTime,
        end_at: OffsetDateTime,
    ) -> Result<Self, Error> {
        let limits = BudgetLimits::new(minimum_amount, maximum_amount)?;
        let window = DateWindow::new(start_at, end_at).map_err(|_| Error::InvalidBudgetWindow)?;

        Ok(Self {
            limits,
            category_id,
            window,
        })
    }

    /// Attach the store key and owner to the new budget.
    pub fn with_id(self, id: BudgetId, owner: UserId) -> Budget {
        Budget {
            id,
            limits: self.limits,
            category_id: self.category_id,
            window: self.window,
            owner,
        }
    }
}
