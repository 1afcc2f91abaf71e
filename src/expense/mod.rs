//! Expenses record money spent against a category.

mod codec;
mod domain;

pub use domain::{Amount, Expense, ExpenseId, NewExpense};
