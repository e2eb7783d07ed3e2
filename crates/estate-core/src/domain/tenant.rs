//! Tenant domain entity

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use crate::error::DomainError;

string_enum! {
    pub enum TenantType {
        Individual => "individual",
        Family => "family",
        Company => "company",
        Student => "student",
        Government => "government",
        Organization => "organization",
    }
    default = Individual
}

string_enum! {
    pub enum TenantStatus {
        Active => "active",
        Inactive => "inactive",
        Pending => "pending",
        Suspended => "suspended",
        NoticeGiven => "notice_given",
        MovedOut => "moved_out",
        Evicted => "evicted",
        Blacklisted => "blacklisted",
    }
    default = Active
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub tenant_type: TenantType,
    pub status: TenantStatus,
    pub name: String,
    pub phone: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub email: Option<String>,
    pub identification_number: String,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    pub vehicle_info: Option<String>,
    pub occupant_count: i32,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub notes: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TenantCreate {
    pub unit_id: Uuid,
    #[serde(default)]
    pub tenant_type: TenantType,
    #[serde(default)]
    pub status: TenantStatus,
    #[validate(length(min = 2, max = 100, message = "Tenant name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub phone: String,
    #[validate(length(max = 100, message = "Emergency contact name too long"))]
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub emergency_contact_phone: Option<String>,
    #[validate(length(max = 50, message = "Emergency contact relation too long"))]
    pub emergency_contact_relation: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Identification number must be between 3 and 50 characters"))]
    pub identification_number: String,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    #[validate(length(max = 255, message = "Vehicle info too long"))]
    pub vehicle_info: Option<String>,
    #[serde(default = "default_occupants")]
    #[validate(range(min = 1, message = "Occupant count must be at least 1"))]
    pub occupant_count: i32,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

fn default_occupants() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct TenantUpdate {
    pub tenant_type: Option<TenantType>,
    pub status: Option<TenantStatus>,
    #[validate(length(min = 2, max = 100, message = "Tenant name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "Emergency contact name too long"))]
    pub emergency_contact_name: Option<String>,
    #[validate(custom(function = "crate::domain::validation::phone"))]
    pub emergency_contact_phone: Option<String>,
    #[validate(length(max = 50, message = "Emergency contact relation too long"))]
    pub emergency_contact_relation: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Identification number must be between 3 and 50 characters"))]
    pub identification_number: Option<String>,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    #[validate(length(max = 255, message = "Vehicle info too long"))]
    pub vehicle_info: Option<String>,
    #[validate(range(min = 1, message = "Occupant count must be at least 1"))]
    pub occupant_count: Option<i32>,
    pub lease_end_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

impl Tenant {
    pub fn new(input: TenantCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        if input.lease_end_date <= input.lease_start_date {
            return Err(DomainError::validation(
                "lease_end_date must be after lease_start_date",
            ));
        }
        Ok(Self {
            id: new_id(),
            unit_id: input.unit_id,
            tenant_type: input.tenant_type,
            status: input.status,
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            emergency_contact_name: clean(input.emergency_contact_name),
            emergency_contact_phone: clean(input.emergency_contact_phone),
            emergency_contact_relation: clean(input.emergency_contact_relation),
            email: clean(input.email),
            identification_number: input.identification_number.trim().to_string(),
            whatsapp: clean(input.whatsapp),
            telegram: clean(input.telegram),
            vehicle_info: clean(input.vehicle_info),
            occupant_count: input.occupant_count,
            lease_start_date: input.lease_start_date,
            lease_end_date: input.lease_end_date,
            notes: clean(input.notes),
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: TenantUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(end) = changes.lease_end_date {
            if end <= Utc::now().date_naive() {
                return Err(DomainError::validation("lease_end_date must be in the future"));
            }
            if end <= self.lease_start_date {
                return Err(DomainError::validation(
                    "lease_end_date must be after lease_start_date",
                ));
            }
            self.lease_end_date = end;
        }
        if let Some(tenant_type) = changes.tenant_type {
            self.tenant_type = tenant_type;
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
        if changes.emergency_contact_name.is_some() {
            self.emergency_contact_name = clean(changes.emergency_contact_name);
        }
        if changes.emergency_contact_phone.is_some() {
            self.emergency_contact_phone = clean(changes.emergency_contact_phone);
        }
        if changes.emergency_contact_relation.is_some() {
            self.emergency_contact_relation = clean(changes.emergency_contact_relation);
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
        if changes.vehicle_info.is_some() {
            self.vehicle_info = clean(changes.vehicle_info);
        }
        if let Some(occupant_count) = changes.occupant_count {
            self.occupant_count = occupant_count;
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        self.audit.touch(actor);
        Ok(())
    }

    /// Inclusive overlap of this lease with `[start, end]`. Boundary days count.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.lease_start_date <= end && start <= self.lease_end_date
    }

    /// Whether the tenant currently lives in the unit.
    pub fn is_resident(&self) -> bool {
        !self.audit.is_deleted
            && matches!(
                self.status,
                TenantStatus::Active | TenantStatus::NoticeGiven | TenantStatus::Pending
            )
    }
}

impl_entity!(Tenant, "Tenant");
