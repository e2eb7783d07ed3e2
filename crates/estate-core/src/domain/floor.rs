//! Floor domain entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: Uuid,
    pub building_id: Uuid,
    pub number: i32,
    pub name: String,
    pub total_units: i32,
    pub description: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FloorCreate {
    pub building_id: Uuid,
    #[validate(range(min = -10, max = 300, message = "Floor number must be between -10 and 300"))]
    pub number: i32,
    #[validate(length(min = 1, max = 100, message = "Floor name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "A floor holds at least one unit"))]
    pub total_units: i32,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct FloorUpdate {
    #[validate(range(min = -10, max = 300, message = "Floor number must be between -10 and 300"))]
    pub number: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "Floor name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "A floor holds at least one unit"))]
    pub total_units: Option<i32>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
}

impl Floor {
    pub fn new(input: FloorCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            building_id: input.building_id,
            number: input.number,
            name: input.name.trim().to_string(),
            total_units: input.total_units,
            description: clean(input.description),
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: FloorUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(number) = changes.number {
            self.number = number;
        }
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(total_units) = changes.total_units {
            self.total_units = total_units;
        }
        if changes.description.is_some() {
            self.description = clean(changes.description);
        }
        self.audit.touch(actor);
        Ok(())
    }
}

impl_entity!(Floor, "Floor");
