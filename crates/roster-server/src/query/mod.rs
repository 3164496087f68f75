//! Declarative query descriptors
//!
//! [`QueryBuilder`] turns an entity kind plus an optional field/value pair into
//! a [`QueryDescriptor`]. Field names are resolved against the kind's static
//! schema, and values stay typed [`FieldValue`]s all the way to the backend:
//! the SQL store binds them as statement parameters, the memory store compares
//! them directly. Caller input never becomes query text.
//!
//! ```rust
//! use roster_server::entity::{Entity, Student};
//! use roster_server::query::QueryBuilder;
//!
//! let query = QueryBuilder::delete_where_equals(Student::schema(), "lastName", "Dev").unwrap();
//! assert_eq!(query.to_sql(), "DELETE FROM student WHERE last_name = ?");
//! ```

use crate::entity::{EntitySchema, FieldDef, FieldValue, Record};
use roster_common::{ValidationError, ValidationResult};

/// What a descriptor does with the rows it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Select,
    Delete,
}

/// Equality condition on one schema field
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: &'static FieldDef,
    pub value: FieldValue,
}

impl Predicate {
    /// Evaluate against an in-memory record.
    ///
    /// A null value matches a missing or null field, the same rows
    /// `IS NULL` selects in SQL.
    pub fn matches(&self, record: &Record) -> bool {
        match (&self.value, record.get(self.field.name)) {
            (FieldValue::Null, None) => true,
            (value, Some(actual)) => value == actual,
            (_, None) => false,
        }
    }
}

/// A parameterized query against one entity kind
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    schema: &'static EntitySchema,
    op: QueryOp,
    predicate: Option<Predicate>,
}

impl QueryDescriptor {
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn op(&self) -> QueryOp {
        self.op
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Whether a record falls inside this query's scope
    pub fn matches(&self, record: &Record) -> bool {
        record.kind() == self.schema.kind
            && self.predicate.as_ref().map_or(true, |p| p.matches(record))
    }

    /// SQL text with `?` placeholders, for logging and diagnostics.
    ///
    /// The bound value is never part of the text.
    pub fn to_sql(&self) -> String {
        let mut sql = match self.op {
            QueryOp::Select => {
                let columns: Vec<&str> = std::iter::once("id")
                    .chain(self.schema.fields.iter().map(|f| f.column))
                    .collect();
                format!("SELECT {} FROM {}", columns.join(", "), self.schema.table)
            },
            QueryOp::Delete => format!("DELETE FROM {}", self.schema.table),
        };

        if let Some(predicate) = &self.predicate {
            if predicate.value.is_null() {
                sql.push_str(&format!(" WHERE {} IS NULL", predicate.field.column));
            } else {
                sql.push_str(&format!(" WHERE {} = ?", predicate.field.column));
            }
        }

        if self.op == QueryOp::Select {
            sql.push_str(" ORDER BY id");
        }

        sql
    }
}

/// Builds [`QueryDescriptor`]s from declarative input
pub struct QueryBuilder;

impl QueryBuilder {
    /// Full scan of one kind, ordered by id
    pub fn select_all(schema: &'static EntitySchema) -> QueryDescriptor {
        QueryDescriptor {
            schema,
            op: QueryOp::Select,
            predicate: None,
        }
    }

    /// Rows of one kind whose `field` equals `value`
    pub fn select_where_equals(
        schema: &'static EntitySchema,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> ValidationResult<QueryDescriptor> {
        Ok(QueryDescriptor {
            schema,
            op: QueryOp::Select,
            predicate: Some(Self::predicate(schema, field, value.into())?),
        })
    }

    /// Delete rows of one kind whose `field` equals `value`
    pub fn delete_where_equals(
        schema: &'static EntitySchema,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> ValidationResult<QueryDescriptor> {
        Ok(QueryDescriptor {
            schema,
            op: QueryOp::Delete,
            predicate: Some(Self::predicate(schema, field, value.into())?),
        })
    }

    fn predicate(
        schema: &'static EntitySchema,
        field: &str,
        value: FieldValue,
    ) -> ValidationResult<Predicate> {
        let field = schema
            .field(field)
            .ok_or_else(|| ValidationError::unknown_field(schema.kind, field))?;

        let value = value
            .coerce(field.ty)
            .ok_or_else(|| ValidationError::type_mismatch(field.name, field.ty.to_string()))?;

        Ok(Predicate { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Employee, Entity, FieldType, Student};

    static SCORES: EntitySchema = EntitySchema {
        kind: "score",
        table: "score",
        fields: &[FieldDef {
            name: "points",
            column: "points",
            ty: FieldType::Integer,
            required: true,
        }],
    };

    #[test]
    fn test_select_all_sql() {
        let query = QueryBuilder::select_all(Student::schema());
        assert_eq!(query.op(), QueryOp::Select);
        assert!(query.predicate().is_none());
        assert_eq!(
            query.to_sql(),
            "SELECT id, first_name, last_name, email FROM student ORDER BY id"
        );
    }

    #[test]
    fn test_delete_where_keeps_value_out_of_text() {
        let hostile = "Dev'; DROP TABLE student; --";
        let query =
            QueryBuilder::delete_where_equals(Student::schema(), "lastName", hostile).unwrap();

        assert_eq!(query.to_sql(), "DELETE FROM student WHERE last_name = ?");
        assert_eq!(query.predicate().unwrap().value, FieldValue::from(hostile));
    }

    #[test]
    fn test_field_resolves_by_column_name() {
        let query =
            QueryBuilder::delete_where_equals(Employee::schema(), "first_name", "Emma").unwrap();
        assert_eq!(query.predicate().unwrap().field.name, "firstName");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = QueryBuilder::delete_where_equals(Student::schema(), "1=1 OR lastName", "x")
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn test_value_coerced_to_field_type() {
        let query = QueryBuilder::select_where_equals(&SCORES, "points", "12").unwrap();
        assert_eq!(query.predicate().unwrap().value, FieldValue::Integer(12));

        let err = QueryBuilder::select_where_equals(&SCORES, "points", "twelve").unwrap_err();
        assert_eq!(err, ValidationError::type_mismatch("points", "integer"));
    }

    #[test]
    fn test_null_predicate_renders_is_null() {
        let query =
            QueryBuilder::select_where_equals(Student::schema(), "email", FieldValue::Null)
                .unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT id, first_name, last_name, email FROM student WHERE email IS NULL ORDER BY id"
        );
    }

    #[test]
    fn test_matches_records() {
        let query =
            QueryBuilder::delete_where_equals(Student::schema(), "lastName", "Dev").unwrap();

        let dev = Student::new("Arjun", "Dev").to_record();
        let singh = Student::new("Nikhil", "Singh").to_record();
        let employee_dev = Employee::new("Kabir", "Dev").to_record();

        assert!(query.matches(&dev));
        assert!(!query.matches(&singh));
        assert!(!query.matches(&employee_dev));
    }

    #[test]
    fn test_null_predicate_matches_missing_email() {
        let query =
            QueryBuilder::select_where_equals(Student::schema(), "email", FieldValue::Null)
                .unwrap();
        assert!(query.matches(&Student::new("Ritik", "Nandan").to_record()));
        assert!(!query.matches(
            &Student::new("Yash", "Agarwal")
                .with_email("yash@example.com")
                .to_record()
        ));
    }
}
