//! Works out how much has been spent against each budget.

use std::fmt::Display;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    budget::Budget, category::Category, expense::Expense, join::Joined,
    spending::percentage_of,
};

/// Where a budget's spending sits relative to its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    /// Spending has not gone past the minimum.
    UnderMinimum,
    /// Spending is above the minimum and no more than the maximum.
    WithinRange,
    /// Spending has gone past the maximum.
    Over,
}

impl BudgetStatus {
    /// Classify `spent` against a `minimum..=maximum` range.
    ///
    /// Spending exactly the minimum counts as under it, and spending exactly
    /// the maximum counts as within range.
    pub fn classify(spent: f64, minimum: f64, maximum: f64) -> Self {
        if spent > maximum {
            Self::Over
        } else if spent > minimum {
            Self::WithinRange
        } else {
            Self::UnderMinimum
        }
    }
}

impl Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::UnderMinimum => "under minimum",
            Self::WithinRange => "within range",
            Self::Over => "over",
        };

        f.write_str(label)
    }
}

/// A budget together with the spending recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    pub budget: Budget,
    pub category: Category,
    /// Sum of the category's expenses within the budget's window.
    pub spent: f64,
    /// `maximum - spent`, negative once the budget is over.
    pub remaining: f64,
    /// `spent / maximum * 100`, or zero for a zero maximum.
    pub percent_used: f64,
    pub status: BudgetStatus,
}

/// Build a report for every budget whose category resolved.
///
/// `expenses` are matched to budgets by category key, so expenses do not need
/// to be joined themselves.
pub fn budget_reports(budgets: &[Joined<Budget>], expenses: &[Expense]) -> Vec<BudgetReport> {
    budgets
        .iter()
        .map(|joined| budget_report(&joined.item, &joined.category, expenses))
        .collect()
}

/// Build the report for a single budget.
pub fn budget_report(budget: &Budget, category: &Category, expenses: &[Expense]) -> BudgetReport {
    let spent: f64 = expenses
        .iter()
        .filter(|expense| {
            expense.category_id == budget.category_id && budget.window.contains(expense.occurred_at)
        })
        .map(|expense| expense.amount.value())
        .sum();

    let maximum = budget.limits.maximum();

    BudgetReport {
        budget: budget.clone(),
        category: category.clone(),
        spent,
        remaining: maximum - spent,
        percent_used: percentage_of(spent, maximum),
        status: BudgetStatus::classify(spent, budget.limits.minimum(), maximum),
    }
}

/// Total maximum amount of the budgets active at `now`.
pub fn active_allocation<'a>(
    budgets: impl IntoIterator<Item = &'a Budget>,
    now: OffsetDateTime,
) -> f64 {
    budgets
        .into_iter()
        .filter(|budget| budget.is_active(now))
        .map(|budget| budget.limits.maximum())
        .sum()
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::datetime};

    use super::{BudgetStatus, active_allocation, budget_report, budget_reports};
    use crate::{
        UserId,
        budget::{Budget, NewBudget},
        category::{Category, CategoryName, Color},
        expense::{Amount, Expense},
        join::join_by_category,
    };

    fn category(id: &str) -> Category {
        Category {
            id: id.into(),
            name: CategoryName::new_unchecked(id),
            color: Color::from_argb(0xFF00FF00),
            owner: UserId::new("u1"),
        }
    }

    fn budget(id: &str, category_id: &str, minimum: f64, maximum: f64) -> Budget {
        NewBudget::new(
            minimum,
            maximum,
            category_id.into(),
            datetime!(2024-01-01 00:00 UTC),
            datetime!(2024-01-31 23:59:59 UTC),
        )
        .unwrap()
        .with_id(id.into(), UserId::new("u1"))
    }

    fn expense(category_id: &str, amount: f64, occurred_at: OffsetDateTime) -> Expense {
        Expense {
            id: "e".into(),
            amount: Amount::new(amount).unwrap(),
            description: String::new(),
            occurred_at,
            category_id: category_id.into(),
            photo_ref: None,
            owner: UserId::new("u1"),
        }
    }

    #[test]
    fn classify_follows_thresholds() {
        assert_eq!(BudgetStatus::classify(0.0, 100.0, 500.0), BudgetStatus::UnderMinimum);
        assert_eq!(BudgetStatus::classify(100.0, 100.0, 500.0), BudgetStatus::UnderMinimum);
        assert_eq!(BudgetStatus::classify(100.01, 100.0, 500.0), BudgetStatus::WithinRange);
        assert_eq!(BudgetStatus::classify(500.0, 100.0, 500.0), BudgetStatus::WithinRange);
        assert_eq!(BudgetStatus::classify(500.01, 100.0, 500.0), BudgetStatus::Over);
    }

    #[test]
    fn zero_range_budget_is_over_once_anything_is_spent() {
        assert_eq!(BudgetStatus::classify(0.0, 0.0, 0.0), BudgetStatus::UnderMinimum);
        assert_eq!(BudgetStatus::classify(0.01, 0.0, 0.0), BudgetStatus::Over);
    }

    #[test]
    fn overspent_budget_reports_negative_remaining() {
        let budget = budget("b1", "A", 100.0, 500.0);
        let expenses = vec![
            expense("A", 400.0, datetime!(2024-01-05 00:00 UTC)),
            expense("A", 200.0, datetime!(2024-01-20 00:00 UTC)),
        ];

        let report = budget_report(&budget, &category("A"), &expenses);

        assert_eq!(report.spent, 600.0);
        assert_eq!(report.remaining, -100.0);
        assert_eq!(report.status, BudgetStatus::Over);
        assert_eq!(report.percent_used, 120.0);
    }

    #[test]
    fn only_matching_category_and_window_count() {
        let budget = budget("b1", "A", 0.0, 100.0);
        let expenses = vec![
            expense("A", 10.0, datetime!(2024-01-01 00:00 UTC)),
            expense("A", 20.0, datetime!(2024-01-31 23:59:59 UTC)),
            expense("A", 40.0, datetime!(2024-02-01 00:00 UTC)),
            expense("B", 80.0, datetime!(2024-01-15 00:00 UTC)),
        ];

        let report = budget_report(&budget, &category("A"), &expenses);

        assert_eq!(report.spent, 30.0);
        assert_eq!(report.remaining, 70.0);
        assert_eq!(report.status, BudgetStatus::WithinRange);
    }

    #[test]
    fn remaining_is_maximum_minus_spent() {
        let budgets = vec![
            budget("b1", "A", 10.0, 50.0),
            budget("b2", "B", 0.0, 75.5),
            budget("b3", "C", 5.0, 5.0),
        ];
        let categories = vec![category("A"), category("B"), category("C")];
        let expenses = vec![
            expense("A", 12.25, datetime!(2024-01-02 00:00 UTC)),
            expense("B", 80.0, datetime!(2024-01-03 00:00 UTC)),
            expense("C", 1.0, datetime!(2024-01-04 00:00 UTC)),
        ];

        let reports = budget_reports(&join_by_category(&categories, &budgets), &expenses);

        assert_eq!(reports.len(), 3);
        for report in reports {
            assert_eq!(report.remaining, report.budget.limits.maximum() - report.spent);
            assert_eq!(
                report.status,
                BudgetStatus::classify(
                    report.spent,
                    report.budget.limits.minimum(),
                    report.budget.limits.maximum()
                )
            );
        }
    }

    #[test]
    fn budgets_with_unknown_category_are_dropped() {
        let budgets = vec![budget("b1", "A", 0.0, 50.0), budget("b2", "gone", 0.0, 50.0)];

        let reports = budget_reports(&join_by_category(&[category("A")], &budgets), &[]);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].budget.id.as_str(), "b1");
    }

    #[test]
    fn active_allocation_only_counts_active_budgets() {
        let january = budget("b1", "A", 0.0, 400.0);
        let february = NewBudget::new(
            0.0,
            250.0,
            "A".into(),
            datetime!(2024-02-01 00:00 UTC),
            datetime!(2024-02-29 23:59:59 UTC),
        )
        .unwrap()
        .with_id("b2".into(), UserId::new("u1"));
        let budgets = vec![january, february];

        assert_eq!(
            active_allocation(&budgets, datetime!(2024-01-15 00:00 UTC)),
            400.0
        );
        assert_eq!(
            active_allocation(&budgets, datetime!(2024-02-01 00:00 UTC)),
            250.0
        );
        assert_eq!(
            active_allocation(&budgets, datetime!(2024-03-01 00:00 UTC)),
            0.0
        );
    }
}
