//! Strict decoding of loosely typed store documents into domain entities.
//!
//! The document store holds JSON objects whose fields are only checked at
//! runtime. Each record is decoded on its own into a
//! `Result<Entity, DecodeWarning>` and the results are folded into a snapshot,
//! so one malformed record never takes the rest of a batch down with it.

use serde_json::{Map, Number, Value};
use time::OffsetDateTime;

use crate::DecodeWarning;

/// A raw document as held by the store.
pub type Document = Map<String, Value>;

/// The store assigned key of a document.
pub type DocumentKey = String;

/// The field every entity document uses to record its owning user.
pub const OWNER: &str = "owner";

/// Conversion from a raw store document into an entity.
pub trait FromDocument: Sized {
    /// Decode the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [DecodeWarning] if a required field is missing, a field has
    /// an unexpected type, or the decoded values break an entity invariant.
    fn from_document(reader: &DocumentReader<'_>) -> Result<Self, DecodeWarning>;
}

/// Conversion from an entity (or its creation form) into a store document.
pub trait ToDocument {
    /// Encode the entity's fields. Keys are not part of the document body.
    fn to_document(&self) -> Document;
}

/// Typed, field-by-field access to one document.
///
/// All accessors fail with a [DecodeWarning] naming the collection, the key
/// and the offending field.
pub struct DocumentReader<'a> {
    collection: &'a str,
    key: &'a str,
    document: &'a Document,
}

impl<'a> DocumentReader<'a> {
    /// Wrap `document`, which was read from `collection` under `key`.
    pub fn new(collection: &'a str, key: &'a str, document: &'a Document) -> Self {
        Self {
            collection,
            key,
            document,
        }
    }

    /// The store key of the document being read.
    pub fn key(&self) -> &str {
        self.key
    }

    /// Create a warning about this document.
    pub fn warning(&self, reason: impl Into<String>) -> DecodeWarning {
        DecodeWarning::new(self.collection, self.key, reason)
    }

    fn field(&self, name: &str) -> Result<&'a Value, DecodeWarning> {
        match self.document.get(name) {
            None | Some(Value::Null) => Err(self.warning(format!("missing field `{name}`"))),
            Some(value) => Ok(value),
        }
    }

    fn type_mismatch(&self, name: &str, expected: &str, got: &Value) -> DecodeWarning {
        self.warning(format!(
            "field `{name}` should be {expected} but was {}",
            describe(got)
        ))
    }

    /// Read a required string field.
    pub fn string(&self, name: &str) -> Result<&'a str, DecodeWarning> {
        let value = self.field(name)?;
        value
            .as_str()
            .ok_or_else(|| self.type_mismatch(name, "a string", value))
    }

    /// Read an optional string field. Missing and `null` both read as `None`.
    pub fn optional_string(&self, name: &str) -> Result<Option<&'a str>, DecodeWarning> {
        match self.document.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(string)) => Ok(Some(string)),
            Some(value) => Err(self.type_mismatch(name, "a string", value)),
        }
    }

    /// Read a required numeric field as a finite float.
    pub fn number(&self, name: &str) -> Result<f64, DecodeWarning> {
        let value = self.field(name)?;
        value
            .as_f64()
            .filter(|number| number.is_finite())
            .ok_or_else(|| self.type_mismatch(name, "a number", value))
    }

    /// Read a required 32-bit field such as a packed colour.
    ///
    /// Writers disagree on signedness, so anything from `i32::MIN` to
    /// `u32::MAX` is accepted and negative values keep their bit pattern.
    pub fn packed_u32(&self, name: &str) -> Result<u32, DecodeWarning> {
        let value = self.field(name)?;
        value
            .as_i64()
            .filter(|number| (i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(number))
            .map(|number| number as u32)
            .ok_or_else(|| self.type_mismatch(name, "a 32-bit integer", value))
    }

    /// Read a required timestamp stored as epoch milliseconds.
    pub fn timestamp(&self, name: &str) -> Result<OffsetDateTime, DecodeWarning> {
        let value = self.field(name)?;
        value
            .as_i64()
            .and_then(millis_to_timestamp)
            .ok_or_else(|| self.type_mismatch(name, "epoch milliseconds", value))
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode every document in a batch, dropping and logging the ones that fail.
pub fn decode_all<T: FromDocument>(
    collection: &str,
    documents: Vec<(DocumentKey, Document)>,
) -> Vec<T> {
    let (entities, warnings) = decode_partitioned(collection, documents);

    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    entities
}

/// Decode every document in a batch, returning the successes and the warnings
/// separately.
pub fn decode_partitioned<T: FromDocument>(
    collection: &str,
    documents: Vec<(DocumentKey, Document)>,
) -> (Vec<T>, Vec<DecodeWarning>) {
    documents.iter().fold(
        (Vec::with_capacity(documents.len()), Vec::new()),
        |(mut entities, mut warnings), (key, document)| {
            match T::from_document(&DocumentReader::new(collection, key, document)) {
                Ok(entity) => entities.push(entity),
                Err(warning) => warnings.push(warning),
            }

            (entities, warnings)
        },
    )
}

/// Convert a timestamp to epoch milliseconds, truncating sub-millisecond precision.
pub fn timestamp_to_millis(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert epoch milliseconds to a UTC timestamp.
///
/// Returns `None` if the value is outside the range `time` can represent.
pub fn millis_to_timestamp(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Build a JSON number from a float, mapping non-finite values to `null`.
pub(crate) fn number_value(number: f64) -> Value {
    Number::from_f64(number).map_or(Value::Null, Value::Number)
}
