//! Field layout shared by the person-shaped kinds (students, employees)

use super::{EntityId, EntitySchema, FieldDef, FieldType, Record};
use roster_common::validation::{validate_name, validate_optional_email};
use roster_common::{ValidationError, ValidationResult};

pub(super) const NAME_MAX_LENGTH: usize = 45;
pub(super) const EMAIL_MAX_LENGTH: usize = 254;

pub(super) const PERSON_FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "firstName",
        column: "first_name",
        ty: FieldType::Text,
        required: true,
    },
    FieldDef {
        name: "lastName",
        column: "last_name",
        ty: FieldType::Text,
        required: true,
    },
    FieldDef {
        name: "email",
        column: "email",
        ty: FieldType::Text,
        required: false,
    },
];

/// Decoded person columns, in schema order
pub(super) struct PersonParts {
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

pub(super) fn validate(first_name: &str, last_name: &str, email: Option<&str>) -> ValidationResult {
    validate_name("firstName", first_name, NAME_MAX_LENGTH)?;
    validate_name("lastName", last_name, NAME_MAX_LENGTH)?;
    validate_optional_email("email", email)?;

    if email.is_some_and(|e| e.len() > EMAIL_MAX_LENGTH) {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: EMAIL_MAX_LENGTH,
        });
    }

    Ok(())
}

pub(super) fn to_record(
    schema: &'static EntitySchema,
    id: Option<EntityId>,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
) -> Record {
    Record::new(schema)
        .with_id(id)
        .with("firstName", first_name)
        .with("lastName", last_name)
        .with("email", email)
}

pub(super) fn from_record(mut record: Record) -> ValidationResult<PersonParts> {
    Ok(PersonParts {
        id: record.id,
        first_name: record.require_text("firstName")?,
        last_name: record.require_text("lastName")?,
        email: record.take_text("email")?,
    })
}
