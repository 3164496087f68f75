//! Entity model shared by every store and repository
//!
//! An entity kind is described once by a static [`EntitySchema`]: its kind
//! name, backing table, and field definitions. Stores exchange untyped
//! [`Record`]s; typed entities such as [`Student`] convert to and from them
//! through the [`Entity`] trait.

mod employee;
mod person;
mod student;

pub use employee::Employee;
pub use student::Student;

use roster_common::{ValidationError, ValidationResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identity
// ============================================================================

/// Surrogate identifier assigned by a store on first save.
///
/// Always strictly positive. Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EntityId(i64);

impl EntityId {
    /// The first id a fresh store hands out
    pub const FIRST: EntityId = EntityId(1);

    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// The id allocated after this one, or `None` once the id space is used up
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

/// Failure to turn caller input into an [`EntityId`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("'{0}' is not a valid id: expected a positive integer")]
    Malformed(String),
    #[error("id {0} is out of range: ids start at 1")]
    OutOfRange(i64),
}

impl TryFrom<i64> for EntityId {
    type Error = IdParseError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(IdParseError::OutOfRange(raw))
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| IdParseError::Malformed(s.to_string()))?;
        Self::try_from(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
        }
    }
}

/// A single named field of an entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Name used in JSON payloads and predicates (camelCase)
    pub name: &'static str,
    /// Column name in the relational backend (snake_case)
    pub column: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

/// Static description of an entity kind.
///
/// Table and column names in generated SQL come from here and nowhere else.
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldDef],
}

impl EntitySchema {
    /// Resolve a field by its API name or its column name
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name || f.column == name)
    }

    /// Check a record against this schema.
    ///
    /// Rejects records of another kind, unknown fields, missing or blank
    /// required fields, and values of the wrong type.
    pub fn validate_record(&self, record: &Record) -> ValidationResult {
        if record.schema.kind != self.kind {
            return Err(ValidationError::KindMismatch {
                expected: self.kind.to_string(),
                actual: record.schema.kind.to_string(),
            });
        }

        if let Some(unknown) = record.fields.keys().find(|name| self.field(name).is_none()) {
            return Err(ValidationError::unknown_field(self.kind, unknown.as_str()));
        }

        for field in self.fields {
            match record.get(field.name) {
                None | Some(FieldValue::Null) if field.required => {
                    return Err(ValidationError::required(field.name));
                },
                Some(FieldValue::Text(text)) if field.required && text.trim().is_empty() => {
                    return Err(ValidationError::required(field.name));
                },
                Some(value) if !value.fits(field.ty) => {
                    return Err(ValidationError::type_mismatch(field.name, field.ty.to_string()));
                },
                _ => {},
            }
        }

        Ok(())
    }
}

// ============================================================================
// Values and records
// ============================================================================

/// A single field value as exchanged with a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Whether this value may be stored in a field of type `ty`
    pub fn fits(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (FieldValue::Null, _)
                | (FieldValue::Text(_), FieldType::Text)
                | (FieldValue::Integer(_), FieldType::Integer)
        )
    }

    /// Convert caller input to the field's type, e.g. the text "42" for an
    /// integer column. Returns `None` when no lossless conversion exists.
    pub fn coerce(self, ty: FieldType) -> Option<FieldValue> {
        match (self, ty) {
            (FieldValue::Text(text), FieldType::Integer) => {
                text.trim().parse().ok().map(FieldValue::Integer)
            },
            (FieldValue::Integer(n), FieldType::Text) => Some(FieldValue::Text(n.to_string())),
            (value, _) => Some(value),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Untyped record of one entity kind, keyed by API field name
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub schema: &'static EntitySchema,
    pub id: Option<EntityId>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            id: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: Option<EntityId>) -> Self {
        self.id = id;
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> &'static str {
        self.schema.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Remove a text field, treating a missing field or null as `None`
    pub fn take_text(&mut self, name: &str) -> ValidationResult<Option<String>> {
        match self.fields.remove(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(FieldValue::Integer(_)) => {
                Err(ValidationError::type_mismatch(name, FieldType::Text.to_string()))
            },
        }
    }

    /// Remove a text field that must be present
    pub fn require_text(&mut self, name: &str) -> ValidationResult<String> {
        self.take_text(name)?
            .ok_or_else(|| ValidationError::required(name))
    }
}

// ============================================================================
// Entity trait
// ============================================================================

/// A typed record kind that can be persisted through a repository.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    fn schema() -> &'static EntitySchema;

    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: EntityId);

    /// Entity-specific checks beyond what the schema enforces
    fn validate(&self) -> ValidationResult {
        Ok(())
    }

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> ValidationResult<Self>;
}
