//! Building domain entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub total_floors: i32,
    pub year_built: Option<i32>,
    pub description: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BuildingCreate {
    #[validate(length(min = 2, max = 100, message = "Building name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 255, message = "Address too long"))]
    pub address: Option<String>,
    #[validate(range(min = 1, message = "A building has at least one floor"))]
    pub total_floors: i32,
    #[validate(range(min = 1800, max = 2100, message = "Year built must be between 1800 and 2100"))]
    pub year_built: Option<i32>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct BuildingUpdate {
    #[validate(length(min = 2, max = 100, message = "Building name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Address too long"))]
    pub address: Option<String>,
    #[validate(range(min = 1, message = "A building has at least one floor"))]
    pub total_floors: Option<i32>,
    #[validate(range(min = 1800, max = 2100, message = "Year built must be between 1800 and 2100"))]
    pub year_built: Option<i32>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
}

impl Building {
    pub fn new(input: BuildingCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            name: input.name.trim().to_string(),
            address: clean(input.address),
            total_floors: input.total_floors,
            year_built: input.year_built,
            description: clean(input.description),
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: BuildingUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if changes.address.is_some() {
            self.address = clean(changes.address);
        }
        if let Some(total_floors) = changes.total_floors {
            self.total_floors = total_floors;
        }
        if changes.year_built.is_some() {
            self.year_built = changes.year_built;
        }
        if changes.description.is_some() {
            self.description = clean(changes.description);
        }
        self.audit.touch(actor);
        Ok(())
    }
}

impl_entity!(Building, "Building");

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> BuildingCreate {
        BuildingCreate {
            name: "  Tower A ".into(),
            address: Some("1 Main St".into()),
            total_floors: 10,
            year_built: Some(1999),
            description: Some("   ".into()),
        }
    }

    #[test]
    fn test_new_trims_and_stamps_audit() {
        let building = Building::new(input(), "alice").unwrap();
        assert_eq!(building.name, "Tower A");
        assert_eq!(building.description, None);
        assert_eq!(building.audit.created_by.as_deref(), Some("alice"));
        assert!(!building.audit.is_deleted);
    }

    #[test]
    fn test_new_rejects_invalid_input() {
        let mut bad = input();
        bad.total_floors = 0;
        assert!(matches!(
            Building::new(bad, "alice"),
            Err(DomainError::ValidationError(_))
        ));

        let mut bad = input();
        bad.name = "A".into();
        assert!(Building::new(bad, "alice").is_err());
    }

    #[test]
    fn test_apply_only_changes_given_fields() {
        let mut building = Building::new(input(), "alice").unwrap();
        building
            .apply(
                BuildingUpdate {
                    total_floors: Some(12),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();
        assert_eq!(building.total_floors, 12);
        assert_eq!(building.name, "Tower A");
        assert_eq!(building.address.as_deref(), Some("1 Main St"));
        assert_eq!(building.audit.updated_by.as_deref(), Some("bob"));
    }
}
