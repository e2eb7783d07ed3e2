//! Owner domain entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use crate::error::DomainError;

string_enum! {
    pub enum OwnerType {
        Individual => "individual",
        Company => "company",
        Trust => "trust",
        Joint => "joint",
        Government => "government",
        Association => "association",
    }
    default = Individual
}

string_enum! {
    pub enum OwnerStatus {
        Active => "active",
        Inactive => "inactive",
        Pending => "pending",
        Suspended => "suspended",
        Blocked => "blocked",
        Archived => "archived",
    }
    default = Active
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub owner_type: OwnerType,
    pub status: OwnerStatus,
    pub name: String,
    pub phone: String,
    pub alternative_phone: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub email: Option<String>,
    pub identification_number: String,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    pub notes: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OwnerCreate {
    #[serde(default)]
    pub owner_type: OwnerType,
    #[serde(default)]
    pub status: OwnerStatus,
    #[validate(length(min = 2, max = 100, message = "Owner name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub phone: String,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub alternative_phone: Option<String>,
    #[validate(length(max = 100, message = "Emergency contact name too long"))]
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub emergency_contact_phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Identification number must be between 3 and 50 characters"))]
    pub identification_number: String,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct OwnerUpdate {
    pub owner_type: Option<OwnerType>,
    pub status: Option<OwnerStatus>,
    #[validate(length(min = 2, max = 100, message = "Owner name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub phone: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub alternative_phone: Option<String>,
    #[validate(length(max = 100, message = "Emergency contact name too long"))]
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub emergency_contact_phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Identification number must be between 3 and 50 characters"))]
    pub identification_number: Option<String>,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

impl Owner {
    pub fn new(input: OwnerCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            owner_type: input.owner_type,
            status: input.status,
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            alternative_phone: clean(input.alternative_phone),
            emergency_contact_name: clean(input.emergency_contact_name),
            emergency_contact_phone: clean(input.emergency_contact_phone),
            email: clean(input.email),
            identification_number: input.identification_number.trim().to_string(),
            whatsapp: clean(input.whatsapp),
            telegram: clean(input.telegram),
            notes: clean(input.notes),
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: OwnerUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(owner_type) = changes.owner_type {
            self.owner_type = owner_type;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = changes.phone {
            self.phone = phone.trim().to_string();
        }
        if changes.alternative_phone.is_some() {
            self.alternative_phone = clean(changes.alternative_phone);
        }
        if changes.emergency_contact_name.is_some() {
            self.emergency_contact_name = clean(changes.emergency_contact_name);
        }
        if changes.emergency_contact_phone.is_some() {
            self.emergency_contact_phone = clean(changes.emergency_contact_phone);
        }
        if changes.email.is_some() {
            self.email = clean(changes.email);
        }
        if let Some(identification_number) = changes.identification_number {
            self.identification_number = identification_number.trim().to_string();
        }
        if changes.whatsapp.is_some() {
            self.whatsapp = clean(changes.whatsapp);
        }
        if changes.telegram.is_some() {
            self.telegram = clean(changes.telegram);
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        self.audit.touch(actor);
        Ok(())
    }
}

impl_entity!(Owner, "Owner");

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> OwnerCreate {
        OwnerCreate {
            owner_type: OwnerType::Individual,
            status: OwnerStatus::Active,
            name: "Jane Doe".into(),
            phone: "+1 555 0100".into(),
            alternative_phone: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            email: Some("jane@example.com".into()),
            identification_number: "ID-1001".into(),
            whatsapp: None,
            telegram: None,
            notes: None,
        }
    }

    #[test]
    fn test_owner_validation() {
        assert!(Owner::new(input(), "alice").is_ok());

        let mut bad = input();
        bad.email = Some("not-an-email".into());
        assert!(Owner::new(bad, "alice").is_err());

        let mut bad = input();
        bad.phone = "phone".into();
        assert!(Owner::new(bad, "alice").is_err());
    }

    #[test]
    fn test_apply_clears_blank_optional_fields() {
        let mut owner = Owner::new(input(), "alice").unwrap();
        owner
            .apply(
                OwnerUpdate {
                    notes: Some("  ".into()),
                    status: Some(OwnerStatus::Suspended),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();
        assert_eq!(owner.notes, None);
        assert_eq!(owner.email.as_deref(), Some("jane@example.com"));
        assert_eq!(owner.status.to_string(), "suspended");
    }
}
