//! Pocketbook tracks personal spending against categories and budgets.
//!
//! Categories, expenses and budgets are kept as JSON documents in a
//! [store::DocumentStore]. A [Repository] scopes those documents to one user
//! and turns each collection into a live stream of complete snapshots. The
//! aggregation functions in [spending], [budget] and [pocket] are pure and
//! work on those snapshots, and [dashboard::Dashboard] ties the streams and
//! aggregations together into a view that is recomputed on every change.

pub mod budget;
pub mod category;
pub mod config;
pub mod dashboard;
pub mod document;
mod error;
pub mod expense;
pub mod format;
pub mod join;
pub mod live;
pub mod logging;
pub mod pocket;
pub mod spending;
pub mod store;
mod user;
pub mod window;

pub use error::{DecodeWarning, Error};
pub use store::Repository;
pub use user::UserId;
