//! Budgets set a spending range for one category over one period.

mod codec;
mod domain;
mod status;

pub use domain::{Budget, BudgetId, BudgetLimits, NewBudget};
pub use status::{BudgetReport, BudgetStatus, active_allocation, budget_report, budget_reports};
