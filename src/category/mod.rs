//! Categories group expenses and budgets.

mod codec;
mod domain;

pub use domain::{Category, CategoryId, CategoryName, Color, NewCategory};
