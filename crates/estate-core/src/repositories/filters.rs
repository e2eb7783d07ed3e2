//! List filters, one per resource, deserialized straight from query strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    contains_ci, Building, Charge, ChargeStatus, ChargeType, Cost, CostPriority, CostStatus,
    CostType, EntityFilter, Floor, Fund, FundStatus, FundType, Owner, OwnerStatus, OwnerType,
    Tenant, TenantStatus, TenantType, Transaction, TransactionStatus, TransactionType, Unit, UnitStatus,
    UnitType,
};

/// Inclusive timestamp window used by statistics and ledger queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "start_date")]
    pub start: Option<DateTime<Utc>>,
    #[serde(rename = "end_date")]
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

fn eq<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
    wanted.as_ref().is_none_or(|w| w == actual)
}

fn eq_opt<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
    wanted.is_none() || wanted == actual
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BuildingFilter {
    /// Substring of name or address.
    pub search: Option<String>,
}

impl EntityFilter<Building> for BuildingFilter {
    fn matches(&self, b: &Building) -> bool {
        self.search.as_deref().is_none_or(|s| {
            contains_ci(&b.name, s) || b.address.as_deref().is_some_and(|a| contains_ci(a, s))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FloorFilter {
    pub building_id: Option<Uuid>,
    pub number: Option<i32>,
}

impl EntityFilter<Floor> for FloorFilter {
    fn matches(&self, f: &Floor) -> bool {
        eq(&self.building_id, &f.building_id) && eq(&self.number, &f.number)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnitFilter {
    pub floor_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub unit_number: Option<String>,
    pub unit_type: Option<UnitType>,
    pub status: Option<UnitStatus>,
    pub is_occupied: Option<bool>,
}

impl EntityFilter<Unit> for UnitFilter {
    fn matches(&self, u: &Unit) -> bool {
        eq(&self.floor_id, &u.floor_id)
            && eq_opt(&self.owner_id, &u.owner_id)
            && eq(&self.unit_number, &u.unit_number)
            && eq(&self.unit_type, &u.unit_type)
            && eq(&self.status, &u.status)
            && eq(&self.is_occupied, &u.is_occupied)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OwnerFilter {
    /// Substring of the name.
    pub name: Option<String>,
    pub identification_number: Option<String>,
    pub owner_type: Option<OwnerType>,
    pub status: Option<OwnerStatus>,
}

impl EntityFilter<Owner> for OwnerFilter {
    fn matches(&self, o: &Owner) -> bool {
        self.name.as_deref().is_none_or(|n| contains_ci(&o.name, n))
            && eq(&self.identification_number, &o.identification_number)
            && eq(&self.owner_type, &o.owner_type)
            && eq(&self.status, &o.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TenantFilter {
    pub unit_id: Option<Uuid>,
    /// Substring of the name.
    pub name: Option<String>,
    pub identification_number: Option<String>,
    pub tenant_type: Option<TenantType>,
    pub status: Option<TenantStatus>,
}

impl EntityFilter<Tenant> for TenantFilter {
    fn matches(&self, t: &Tenant) -> bool {
        eq(&self.unit_id, &t.unit_id)
            && self.name.as_deref().is_none_or(|n| contains_ci(&t.name, n))
            && eq(&self.identification_number, &t.identification_number)
            && eq(&self.tenant_type, &t.tenant_type)
            && eq(&self.status, &t.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChargeFilter {
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub charge_type: Option<ChargeType>,
    pub status: Option<ChargeStatus>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl EntityFilter<Charge> for ChargeFilter {
    fn matches(&self, c: &Charge) -> bool {
        eq(&self.building_id, &c.building_id)
            && eq_opt(&self.unit_id, &c.unit_id)
            && eq_opt(&self.owner_id, &c.owner_id)
            && eq_opt(&self.tenant_id, &c.tenant_id)
            && eq(&self.charge_type, &c.charge_type)
            && eq(&self.status, &c.status)
            && DateRange::new(self.due_from, self.due_to).contains(c.due_date)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CostFilter {
    pub building_id: Option<Uuid>,
    pub floor_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub cost_type: Option<CostType>,
    pub priority: Option<CostPriority>,
    pub status: Option<CostStatus>,
    pub planned_from: Option<DateTime<Utc>>,
    pub planned_to: Option<DateTime<Utc>>,
}

impl EntityFilter<Cost> for CostFilter {
    fn matches(&self, c: &Cost) -> bool {
        eq(&self.building_id, &c.building_id)
            && eq_opt(&self.floor_id, &c.floor_id)
            && eq_opt(&self.unit_id, &c.unit_id)
            && eq(&self.cost_type, &c.cost_type)
            && eq(&self.priority, &c.priority)
            && eq(&self.status, &c.status)
            && DateRange::new(self.planned_from, self.planned_to).contains(c.planned_date)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FundFilter {
    pub building_id: Option<Uuid>,
    /// Exact name, case-insensitive.
    pub name: Option<String>,
    pub fund_type: Option<FundType>,
    pub status: Option<FundStatus>,
}

impl EntityFilter<Fund> for FundFilter {
    fn matches(&self, f: &Fund) -> bool {
        eq(&self.building_id, &f.building_id)
            && self
                .name
                .as_deref()
                .is_none_or(|n| n.to_lowercase() == f.name.to_lowercase())
            && eq(&self.fund_type, &f.fund_type)
            && eq(&self.status, &f.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionFilter {
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl EntityFilter<Transaction> for TransactionFilter {
    fn matches(&self, t: &Transaction) -> bool {
        eq(&self.building_id, &t.building_id)
            && eq_opt(&self.unit_id, &t.unit_id)
            && eq_opt(&self.tenant_id, &t.tenant_id)
            && eq_opt(&self.fund_id, &t.fund_id)
            && eq(&self.transaction_type, &t.transaction_type)
            && eq(&self.status, &t.status)
            && DateRange::new(self.due_from, self.due_to).contains(t.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_date_range_is_inclusive_and_open_ended() {
        let now = Utc::now();
        assert!(DateRange::default().contains(now));
        assert!(DateRange::new(Some(now), Some(now)).contains(now));
        assert!(!DateRange::new(Some(now + Duration::seconds(1)), None).contains(now));
        assert!(!DateRange::new(None, Some(now - Duration::seconds(1))).contains(now));
    }
}
