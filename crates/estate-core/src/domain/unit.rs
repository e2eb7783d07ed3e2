//! Unit domain entity

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use crate::error::DomainError;

string_enum! {
    pub enum UnitType {
        Residential => "residential",
        Commercial => "commercial",
        Office => "office",
        Retail => "retail",
        Parking => "parking",
    }
    default = Residential
}

string_enum! {
    pub enum UnitStatus {
        Vacant => "vacant",
        Occupied => "occupied",
        Maintenance => "maintenance",
        Reserved => "reserved",
    }
    default = Vacant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub floor_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub unit_number: String,
    pub unit_type: UnitType,
    pub status: UnitStatus,
    pub area: Decimal,
    pub has_parking: bool,
    pub parking_space_number: Option<String>,
    pub is_occupied: bool,
    pub resident_count: i32,
    pub constant_extra_charge: Decimal,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UnitCreate {
    pub floor_id: Uuid,
    pub owner_id: Option<Uuid>,
    #[validate(length(min = 1, max = 20, message = "Unit number must be between 1 and 20 characters"))]
    pub unit_number: String,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub status: UnitStatus,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub area: Decimal,
    #[serde(default)]
    pub has_parking: bool,
    #[validate(length(max = 20, message = "Parking space number too long"))]
    pub parking_space_number: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Resident count cannot be negative"))]
    pub resident_count: i32,
    #[serde(default)]
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub constant_extra_charge: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UnitUpdate {
    pub owner_id: Option<Uuid>,
    #[validate(length(min = 1, max = 20, message = "Unit number must be between 1 and 20 characters"))]
    pub unit_number: Option<String>,
    pub unit_type: Option<UnitType>,
    pub status: Option<UnitStatus>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub area: Option<Decimal>,
    pub has_parking: Option<bool>,
    #[validate(length(max = 20, message = "Parking space number too long"))]
    pub parking_space_number: Option<String>,
    #[validate(range(min = 0, message = "Resident count cannot be negative"))]
    pub resident_count: Option<i32>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub constant_extra_charge: Option<Decimal>,
}

impl Unit {
    pub fn new(input: UnitCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            floor_id: input.floor_id,
            owner_id: input.owner_id,
            unit_number: input.unit_number.trim().to_string(),
            unit_type: input.unit_type,
            status: input.status,
            area: input.area,
            has_parking: input.has_parking,
            parking_space_number: clean(input.parking_space_number),
            is_occupied: input.status == UnitStatus::Occupied,
            resident_count: input.resident_count,
            constant_extra_charge: input.constant_extra_charge,
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: UnitUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if changes.owner_id.is_some() {
            self.owner_id = changes.owner_id;
        }
        if let Some(unit_number) = changes.unit_number {
            self.unit_number = unit_number.trim().to_string();
        }
        if let Some(unit_type) = changes.unit_type {
            self.unit_type = unit_type;
        }
        if let Some(status) = changes.status {
            self.status = status;
            self.is_occupied = status == UnitStatus::Occupied;
        }
        if let Some(area) = changes.area {
            self.area = area;
        }
        if let Some(has_parking) = changes.has_parking {
            self.has_parking = has_parking;
        }
        if changes.parking_space_number.is_some() {
            self.parking_space_number = clean(changes.parking_space_number);
        }
        if let Some(resident_count) = changes.resident_count {
            self.resident_count = resident_count;
        }
        if let Some(extra) = changes.constant_extra_charge {
            self.constant_extra_charge = extra;
        }
        self.audit.touch(actor);
        Ok(())
    }

    /// Flip occupancy and keep `status` consistent with it.
    pub fn set_occupied(&mut self, occupied: bool, actor: &str) {
        self.is_occupied = occupied;
        self.status = if occupied {
            UnitStatus::Occupied
        } else {
            UnitStatus::Vacant
        };
        self.audit.touch(actor);
    }
}

impl_entity!(Unit, "Unit");

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> UnitCreate {
        UnitCreate {
            floor_id: Uuid::new_v4(),
            owner_id: None,
            unit_number: "101".into(),
            unit_type: UnitType::Residential,
            status: UnitStatus::Vacant,
            area: dec!(84.5),
            has_parking: false,
            parking_space_number: None,
            resident_count: 0,
            constant_extra_charge: Decimal::ZERO,
        }
    }

    #[test]
    fn test_unit_area_must_be_positive() {
        let mut bad = input();
        bad.area = Decimal::ZERO;
        assert!(Unit::new(bad, "alice").is_err());
        assert!(Unit::new(input(), "alice").is_ok());
    }

    #[test]
    fn test_status_drives_occupancy_flag() {
        let mut unit = Unit::new(input(), "alice").unwrap();
        assert!(!unit.is_occupied);

        unit.apply(
            UnitUpdate {
                status: Some(UnitStatus::Occupied),
                ..Default::default()
            },
            "alice",
        )
        .unwrap();
        assert!(unit.is_occupied);

        unit.set_occupied(false, "bob");
        assert_eq!(unit.status, UnitStatus::Vacant);
    }

    #[test]
    fn test_enum_text_round_trip() {
        for t in UnitType::ALL {
            assert_eq!(UnitType::parse(t.as_str()), Some(*t));
        }
        assert_eq!(UnitStatus::parse("bogus"), None);
    }
}
