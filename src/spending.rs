//! Per-category spending totals.
//!
//! Sums joined expenses by category over an optional date window and works
//! out each category's share of the grand total.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    category::{Category, CategoryId},
    expense::Expense,
    join::Joined,
    window::{DateWindow, in_window},
};

/// The amount spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    /// Sum of the category's expense amounts.
    pub total: f64,
    /// Percentage of the grand total, from 0 to 100.
    pub share: f64,
    /// How many expenses contributed to the total.
    pub expense_count: usize,
}

/// Break spending down by category.
///
/// Expenses outside `window` are ignored; `None` means all time. The result
/// is sorted by descending total, with ties broken by category name so the
/// order is stable. Shares are zero when nothing was spent.
pub fn category_breakdown(
    expenses: &[Joined<Expense>],
    window: Option<&DateWindow>,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&CategoryId, CategoryTotal> = HashMap::new();

    for joined in expenses
        .iter()
        .filter(|joined| in_window(window, joined.item.occurred_at))
    {
        let entry = totals
            .entry(&joined.category.id)
            .or_insert_with(|| CategoryTotal {
                category: joined.category.clone(),
                total: 0.0,
                share: 0.0,
                expense_count: 0,
            });
        entry.total += joined.item.amount.value();
        entry.expense_count += 1;
    }

    let grand_total: f64 = totals.values().map(|total| total.total).sum();

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_values()
        .map(|mut total| {
            total.share = percentage_of(total.total, grand_total);
            total
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.name.cmp(&b.category.name))
            .then_with(|| a.category.id.cmp(&b.category.id))
    });

    breakdown
}

/// Sum the amounts of joined `expenses` that fall within `window`.
///
/// Orphaned expenses never make it into a join, so this always equals the sum
/// of the [category_breakdown] totals for the same window.
pub fn total_expenses(expenses: &[Joined<Expense>], window: Option<&DateWindow>) -> f64 {
    expenses
        .iter()
        .filter(|joined| in_window(window, joined.item.occurred_at))
        .map(|joined| joined.item.amount.value())
        .sum()
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub(crate) fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
