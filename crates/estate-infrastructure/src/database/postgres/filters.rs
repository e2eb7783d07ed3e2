//! SQL rendering of the repository filters

use sqlx::{Encode, Postgres, QueryBuilder, Type};

use estate_core::repositories::{
    BuildingFilter, ChargeFilter, CostFilter, FloorFilter, FundFilter, OwnerFilter, TenantFilter,
    TransactionFilter, UnitFilter,
};

/// Appends ` AND ...` conditions for the populated fields of a filter.
pub trait SqlFilter: Send + Sync {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>);
}

fn eq<'a, V>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: Option<V>)
where
    V: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
{
    if let Some(value) = value {
        qb.push(" AND ").push(column).push(" = ").push_bind(value);
    }
}

fn ilike<'a>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, needle: Option<&'a String>) {
    if let Some(needle) = needle {
        qb.push(" AND ")
            .push(column)
            .push(" ILIKE '%' || ")
            .push_bind(needle)
            .push(" || '%'");
    }
}

fn between<'a, V>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, from: Option<V>, to: Option<V>)
where
    V: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
{
    if let Some(from) = from {
        qb.push(" AND ").push(column).push(" >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND ").push(column).push(" <= ").push_bind(to);
    }
}

impl SqlFilter for BuildingFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        if let Some(search) = &self.search {
            qb.push(" AND (name ILIKE '%' || ")
                .push_bind(search)
                .push(" || '%' OR address ILIKE '%' || ")
                .push_bind(search)
                .push(" || '%')");
        }
    }
}

impl SqlFilter for FloorFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "building_id", self.building_id);
        eq(qb, "number", self.number);
    }
}

impl SqlFilter for UnitFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "floor_id", self.floor_id);
        eq(qb, "owner_id", self.owner_id);
        eq(qb, "unit_number", self.unit_number.as_ref());
        eq(qb, "unit_type", self.unit_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
        eq(qb, "is_occupied", self.is_occupied);
    }
}

impl SqlFilter for OwnerFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        ilike(qb, "name", self.name.as_ref());
        eq(qb, "identification_number", self.identification_number.as_ref());
        eq(qb, "owner_type", self.owner_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
    }
}

impl SqlFilter for TenantFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "unit_id", self.unit_id);
        ilike(qb, "name", self.name.as_ref());
        eq(qb, "identification_number", self.identification_number.as_ref());
        eq(qb, "tenant_type", self.tenant_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
    }
}

impl SqlFilter for ChargeFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "building_id", self.building_id);
        eq(qb, "unit_id", self.unit_id);
        eq(qb, "owner_id", self.owner_id);
        eq(qb, "tenant_id", self.tenant_id);
        eq(qb, "charge_type", self.charge_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
        between(qb, "due_date", self.due_from, self.due_to);
    }
}

impl SqlFilter for CostFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "building_id", self.building_id);
        eq(qb, "floor_id", self.floor_id);
        eq(qb, "unit_id", self.unit_id);
        eq(qb, "cost_type", self.cost_type.map(|t| t.as_str()));
        eq(qb, "priority", self.priority.map(|p| p.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
        between(qb, "planned_date", self.planned_from, self.planned_to);
    }
}

impl SqlFilter for FundFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "building_id", self.building_id);
        if let Some(name) = &self.name {
            qb.push(" AND LOWER(name) = LOWER(").push_bind(name).push(")");
        }
        eq(qb, "fund_type", self.fund_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
    }
}

impl SqlFilter for TransactionFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        eq(qb, "building_id", self.building_id);
        eq(qb, "unit_id", self.unit_id);
        eq(qb, "tenant_id", self.tenant_id);
        eq(qb, "fund_id", self.fund_id);
        eq(qb, "transaction_type", self.transaction_type.map(|t| t.as_str()));
        eq(qb, "status", self.status.map(|s| s.as_str()));
        between(qb, "due_date", self.due_from, self.due_to);
    }
}
