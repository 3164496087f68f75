use super::person;
use super::{Entity, EntityId, EntitySchema, Record};
use roster_common::ValidationResult;
use serde::{Deserialize, Serialize};

static SCHEMA: EntitySchema = EntitySchema {
    kind: "student",
    table: "student",
    fields: person::PERSON_FIELDS,
};

/// Student record
///
/// ```json
/// { "id": 1, "firstName": "Nikhil", "lastName": "Singh", "email": "code.nikhil20@gmail.com" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Student {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl Entity for Student {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn validate(&self) -> ValidationResult {
        person::validate(&self.first_name, &self.last_name, self.email.as_deref())
    }

    fn to_record(&self) -> Record {
        person::to_record(
            &SCHEMA,
            self.id,
            &self.first_name,
            &self.last_name,
            self.email.as_deref(),
        )
    }

    fn from_record(record: Record) -> ValidationResult<Self> {
        let parts = person::from_record(record)?;
        Ok(Self {
            id: parts.id,
            first_name: parts.first_name,
            last_name: parts.last_name,
            email: parts.email,
        })
    }
}
