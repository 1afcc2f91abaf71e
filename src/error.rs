//! Defines the crate level error type and the non-fatal decode warning.

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The document store could not be reached.
    ///
    /// This is a transient condition. Writes surface it to the caller, while
    /// live subscriptions keep running and emit empty snapshots until the
    /// store comes back.
    #[error("the document store is unavailable: {0}")]
    StoreUnavailable(String),

    /// The requested resource was not found.
    ///
    /// Returned when an update targets a key that does not exist in the store.
    /// Internally, this error may also occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// An expense was given an amount that is zero, negative or not a number.
    #[error("{0} is not a valid expense amount, amounts must be greater than zero")]
    NonPositiveAmount(f64),

    /// A budget was given a negative minimum or a maximum below its minimum.
    #[error("budget amounts must satisfy 0 <= minimum ({0}) <= maximum ({1})")]
    InvalidBudgetAmounts(f64, f64),

    /// A budget was given an end date before its start date.
    #[error("a budget cannot end before it starts")]
    InvalidBudgetWindow,

    /// A date window was given an end before its start.
    #[error("a date window cannot end before it starts")]
    InvalidWindow,

    /// The declared monthly income must be greater than zero.
    #[error("{0} is not a valid monthly income, it must be greater than zero")]
    InvalidIncome(f64),

    /// The savings goal must not be negative.
    #[error("{0} is not a valid savings goal, it must be zero or more")]
    InvalidSavingsGoal(f64),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A document could not be serialized as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

/// A single stored document could not be decoded into an entity.
///
/// This is not an [Error]: the offending record is dropped from its snapshot
/// and the rest of the snapshot is processed as usual.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("dropped document {key} in {collection}: {reason}")]
pub struct DecodeWarning {
    /// The collection the document was read from.
    pub collection: String,
    /// The store key of the document.
    pub key: String,
    /// Why the document was rejected.
    pub reason: String,
}

impl DecodeWarning {
    /// Create a warning for the document `key` in `collection`.
    pub fn new(collection: &str, key: &str, reason: impl Into<String>) -> Self {
        Self {
            collection: collection.to_owned(),
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeWarning, Error};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn decode_warning_names_the_document() {
        let warning = DecodeWarning::new("users/1/expenses", "42", "missing field `amount`");

        assert_eq!(
            warning.to_string(),
            "dropped document 42 in users/1/expenses: missing field `amount`"
        );
    }
}
