//! Document encoding for expenses.

use serde_json::Value;

use crate::{
    DecodeWarning, UserId,
    category::CategoryId,
    document::{
        Document, DocumentReader, FromDocument, OWNER, ToDocument, number_value,
        timestamp_to_millis,
    },
    expense::{Amount, Expense, ExpenseId, NewExpense},
};

const AMOUNT: &str = "amount";
const DESCRIPTION: &str = "description";
const OCCURRED_AT: &str = "occurredAt";
const CATEGORY_ID: &str = "categoryId";
const PHOTO_REF: &str = "photoRef";

impl FromDocument for Expense {
    fn from_document(reader: &DocumentReader<'_>) -> Result<Self, DecodeWarning> {
        let amount =
            Amount::new(reader.number(AMOUNT)?).map_err(|error| reader.warning(error.to_string()))?;
        // Older documents may have been written without a description.
        let description = reader.optional_string(DESCRIPTION)?.unwrap_or_default();

        Ok(Expense {
            id: ExpenseId::new(reader.key()),
            amount,
            description: description.to_owned(),
            occurred_at: reader.timestamp(OCCURRED_AT)?,
            category_id: CategoryId::new(reader.string(CATEGORY_ID)?),
            photo_ref: reader.optional_string(PHOTO_REF)?.map(str::to_owned),
            owner: UserId::new(reader.string(OWNER)?),
        })
    }
}

impl ToDocument for NewExpense {
    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(AMOUNT.to_owned(), number_value(self.amount.value()));
        document.insert(DESCRIPTION.to_owned(), Value::from(self.description.as_str()));
        document.insert(
            OCCURRED_AT.to_owned(),
            Value::from(timestamp_to_millis(self.occurred_at)),
        );
        document.insert(CATEGORY_ID.to_owned(), Value::from(self.category_id.as_str()));
        document.insert(
            PHOTO_REF.to_owned(),
            self.photo_ref.as_deref().map_or(Value::Null, Value::from),
        );
        document
    }
}
