//! Document encoding for budgets.

use serde_json::Value;

use crate::{
    DecodeWarning, Error, UserId,
    budget::{Budget, BudgetId, NewBudget},
    category::CategoryId,
    document::{
        Document, DocumentReader, FromDocument, OWNER, ToDocument, number_value,
        timestamp_to_millis,
    },
};

const MINIMUM_AMOUNT: &str = "minimumAmount";
const MAXIMUM_AMOUNT: &str = "maximumAmount";
const CATEGORY_ID: &str = "categoryId";
const START_AT: &str = "startAt";
const END_AT: &str = "endAt";

impl FromDocument for Budget {
    fn from_document(reader: &DocumentReader<'_>) -> Result<Self, DecodeWarning> {
        let new_budget = NewBudget::new(
            reader.number(MINIMUM_AMOUNT)?,
            reader.number(MAXIMUM_AMOUNT)?,
            CategoryId::new(reader.string(CATEGORY_ID)?),
            reader.timestamp(START_AT)?,
            reader.timestamp(END_AT)?,
        )
        .map_err(|error: Error| reader.warning(error.to_string()))?;
        let owner = UserId::new(reader.string(OWNER)?);

        Ok(new_budget.with_id(BudgetId::new(reader.key()), owner))
    }
}

impl ToDocument for NewBudget {
    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(MINIMUM_AMOUNT.to_owned(), number_value(self.limits.minimum()));
        document.insert(MAXIMUM_AMOUNT.to_owned(), number_value(self.limits.maximum()));
        document.insert(CATEGORY_ID.to_owned(), Value::from(self.category_id.as_str()));
        document.insert(
            START_AT.to_owned(),
            Value::from(timestamp_to_millis(self.window.start())),
        );
        document.insert(
            END_AT.to_owned(),
            Value::from(timestamp_to_millis(self.window.end())),
        );
        document
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use crate::{
        UserId,
        budget::{Budget, NewBudget},
        document::{DocumentReader, FromDocument, ToDocument},
    };

    #[test]
    fn encodes_and_decodes_budget() {
        let new_budget = NewBudget::new(
            100.0,
            500.0,
            "c1".into(),
            datetime!(2024-01-01 00:00 UTC),
            datetime!(2024-01-31 23:59:59.999 UTC),
        )
        .unwrap();
        let mut document = new_budget.to_document();
        document.insert("owner".to_owned(), "u1".into());

        let budget =
            Budget::from_document(&DocumentReader::new("users/u1/budgets", "b1", &document))
                .unwrap();

        assert_eq!(budget, new_budget.with_id("b1".into(), UserId::new("u1")));
    }

    #[test]
    fn rejects_maximum_below_minimum() {
        let document = json!({
            "minimumAmount": 500,
            "maximumAmount": 100,
            "categoryId": "c1",
            "startAt": 0,
            "endAt": 1000,
            "owner": "u1",
        })
        .as_object()
        .unwrap()
        .clone();

        let result =
            Budget::from_document(&DocumentReader::new("users/u1/budgets", "b1", &document));

        assert!(result.is_err());
    }
}
