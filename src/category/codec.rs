//! Document encoding for categories.

use serde_json::Value;

use crate::{
    DecodeWarning, UserId,
    category::{Category, CategoryId, CategoryName, Color, NewCategory},
    document::{Document, DocumentReader, FromDocument, OWNER, ToDocument},
};

const NAME: &str = "name";
const COLOR: &str = "color";

impl FromDocument for Category {
    fn from_document(reader: &DocumentReader<'_>) -> Result<Self, DecodeWarning> {
        let name = CategoryName::new(reader.string(NAME)?)
            .map_err(|error| reader.warning(error.to_string()))?;
        let color = Color::from_argb(reader.packed_u32(COLOR)?);
        let owner = UserId::new(reader.string(OWNER)?);

        Ok(Category {
            id: CategoryId::new(reader.key()),
            name,
            color,
            owner,
        })
    }
}

impl ToDocument for NewCategory {
    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(NAME.to_owned(), Value::from(self.name.as_ref()));
        document.insert(COLOR.to_owned(), Value::from(self.color.argb()));
        document
    }
}
