//! Table mappings of the plain CRUD resources

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use estate_core::domain::{
    Building, Cost, CostPriority, CostStatus, CostType, Floor, Owner, OwnerStatus, OwnerType,
    PaymentMethod, Tenant, TenantStatus, TenantType, Transaction, TransactionStatus,
    TransactionType, Unit, UnitStatus, UnitType,
};
use estate_core::error::DomainError;

use super::record::{bind_audit, decode, with_audit, AuditRow, PgRecord};

#[derive(Debug, FromRow)]
pub struct BuildingRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    total_floors: i32,
    year_built: Option<i32>,
    description: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Building {
    const TABLE: &'static str = "buildings";
    const COLUMNS: &'static str =
        with_audit!("id, name, address, total_floors, year_built, description");
    type Row = BuildingRow;

    fn from_row(row: BuildingRow) -> Result<Self, DomainError> {
        Ok(Building {
            id: row.id,
            name: row.name,
            address: row.address,
            total_floors: row.total_floors,
            year_built: row.year_built,
            description: row.description,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(&self.name)
            .push_bind(&self.address)
            .push_bind(self.total_floors)
            .push_bind(self.year_built)
            .push_bind(&self.description);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct FloorRow {
    id: Uuid,
    building_id: Uuid,
    number: i32,
    name: String,
    total_units: i32,
    description: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Floor {
    const TABLE: &'static str = "floors";
    const COLUMNS: &'static str =
        with_audit!("id, building_id, number, name, total_units, description");
    type Row = FloorRow;

    fn from_row(row: FloorRow) -> Result<Self, DomainError> {
        Ok(Floor {
            id: row.id,
            building_id: row.building_id,
            number: row.number,
            name: row.name,
            total_units: row.total_units,
            description: row.description,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.building_id)
            .push_bind(self.number)
            .push_bind(&self.name)
            .push_bind(self.total_units)
            .push_bind(&self.description);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct UnitRow {
    id: Uuid,
    floor_id: Uuid,
    owner_id: Option<Uuid>,
    unit_number: String,
    unit_type: String,
    status: String,
    area: Decimal,
    has_parking: bool,
    parking_space_number: Option<String>,
    is_occupied: bool,
    resident_count: i32,
    constant_extra_charge: Decimal,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Unit {
    const TABLE: &'static str = "units";
    const COLUMNS: &'static str = with_audit!(
        "id, floor_id, owner_id, unit_number, unit_type, status, area, has_parking, \
         parking_space_number, is_occupied, resident_count, constant_extra_charge"
    );
    type Row = UnitRow;

    fn from_row(row: UnitRow) -> Result<Self, DomainError> {
        Ok(Unit {
            id: row.id,
            floor_id: row.floor_id,
            owner_id: row.owner_id,
            unit_number: row.unit_number,
            unit_type: decode(&row.unit_type, UnitType::parse, "units.unit_type")?,
            status: decode(&row.status, UnitStatus::parse, "units.status")?,
            area: row.area,
            has_parking: row.has_parking,
            parking_space_number: row.parking_space_number,
            is_occupied: row.is_occupied,
            resident_count: row.resident_count,
            constant_extra_charge: row.constant_extra_charge,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.floor_id)
            .push_bind(self.owner_id)
            .push_bind(&self.unit_number)
            .push_bind(self.unit_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.area)
            .push_bind(self.has_parking)
            .push_bind(&self.parking_space_number)
            .push_bind(self.is_occupied)
            .push_bind(self.resident_count)
            .push_bind(self.constant_extra_charge);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct OwnerRow {
    id: Uuid,
    owner_type: String,
    status: String,
    name: String,
    phone: String,
    alternative_phone: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    email: Option<String>,
    identification_number: String,
    whatsapp: Option<String>,
    telegram: Option<String>,
    notes: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Owner {
    const TABLE: &'static str = "owners";
    const COLUMNS: &'static str = with_audit!(
        "id, owner_type, status, name, phone, alternative_phone, emergency_contact_name, \
         emergency_contact_phone, email, identification_number, whatsapp, telegram, notes"
    );
    type Row = OwnerRow;

    fn from_row(row: OwnerRow) -> Result<Self, DomainError> {
        Ok(Owner {
            id: row.id,
            owner_type: decode(&row.owner_type, OwnerType::parse, "owners.owner_type")?,
            status: decode(&row.status, OwnerStatus::parse, "owners.status")?,
            name: row.name,
            phone: row.phone,
            alternative_phone: row.alternative_phone,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            email: row.email,
            identification_number: row.identification_number,
            whatsapp: row.whatsapp,
            telegram: row.telegram,
            notes: row.notes,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.owner_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(&self.name)
            .push_bind(&self.phone)
            .push_bind(&self.alternative_phone)
            .push_bind(&self.emergency_contact_name)
            .push_bind(&self.emergency_contact_phone)
            .push_bind(&self.email)
            .push_bind(&self.identification_number)
            .push_bind(&self.whatsapp)
            .push_bind(&self.telegram)
            .push_bind(&self.notes);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct TenantRow {
    id: Uuid,
    unit_id: Uuid,
    tenant_type: String,
    status: String,
    name: String,
    phone: String,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    emergency_contact_relation: Option<String>,
    email: Option<String>,
    identification_number: String,
    whatsapp: Option<String>,
    telegram: Option<String>,
    vehicle_info: Option<String>,
    occupant_count: i32,
    lease_start_date: NaiveDate,
    lease_end_date: NaiveDate,
    notes: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Tenant {
    const TABLE: &'static str = "tenants";
    const COLUMNS: &'static str = with_audit!(
        "id, unit_id, tenant_type, status, name, phone, emergency_contact_name, \
         emergency_contact_phone, emergency_contact_relation, email, identification_number, \
         whatsapp, telegram, vehicle_info, occupant_count, lease_start_date, lease_end_date, notes"
    );
    type Row = TenantRow;

    fn from_row(row: TenantRow) -> Result<Self, DomainError> {
        Ok(Tenant {
            id: row.id,
            unit_id: row.unit_id,
            tenant_type: decode(&row.tenant_type, TenantType::parse, "tenants.tenant_type")?,
            status: decode(&row.status, TenantStatus::parse, "tenants.status")?,
            name: row.name,
            phone: row.phone,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            emergency_contact_relation: row.emergency_contact_relation,
            email: row.email,
            identification_number: row.identification_number,
            whatsapp: row.whatsapp,
            telegram: row.telegram,
            vehicle_info: row.vehicle_info,
            occupant_count: row.occupant_count,
            lease_start_date: row.lease_start_date,
            lease_end_date: row.lease_end_date,
            notes: row.notes,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.unit_id)
            .push_bind(self.tenant_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(&self.name)
            .push_bind(&self.phone)
            .push_bind(&self.emergency_contact_name)
            .push_bind(&self.emergency_contact_phone)
            .push_bind(&self.emergency_contact_relation)
            .push_bind(&self.email)
            .push_bind(&self.identification_number)
            .push_bind(&self.whatsapp)
            .push_bind(&self.telegram)
            .push_bind(&self.vehicle_info)
            .push_bind(self.occupant_count)
            .push_bind(self.lease_start_date)
            .push_bind(self.lease_end_date)
            .push_bind(&self.notes);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct CostRow {
    id: Uuid,
    building_id: Uuid,
    floor_id: Option<Uuid>,
    unit_id: Option<Uuid>,
    title: String,
    description: String,
    cost_type: String,
    priority: String,
    status: String,
    planned_date: DateTime<Utc>,
    actual_date: Option<DateTime<Utc>>,
    completion_date: Option<DateTime<Utc>>,
    estimated_amount: Decimal,
    actual_amount: Option<Decimal>,
    variance_amount: Option<Decimal>,
    budget_code: Option<String>,
    is_recurring: bool,
    frequency_months: Option<i32>,
    invoice_number: Option<String>,
    notes: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Cost {
    const TABLE: &'static str = "costs";
    const COLUMNS: &'static str = with_audit!(
        "id, building_id, floor_id, unit_id, title, description, cost_type, priority, status, \
         planned_date, actual_date, completion_date, estimated_amount, actual_amount, \
         variance_amount, budget_code, is_recurring, frequency_months, invoice_number, notes"
    );
    type Row = CostRow;

    fn from_row(row: CostRow) -> Result<Self, DomainError> {
        Ok(Cost {
            id: row.id,
            building_id: row.building_id,
            floor_id: row.floor_id,
            unit_id: row.unit_id,
            title: row.title,
            description: row.description,
            cost_type: decode(&row.cost_type, CostType::parse, "costs.cost_type")?,
            priority: decode(&row.priority, CostPriority::parse, "costs.priority")?,
            status: decode(&row.status, CostStatus::parse, "costs.status")?,
            planned_date: row.planned_date,
            actual_date: row.actual_date,
            completion_date: row.completion_date,
            estimated_amount: row.estimated_amount,
            actual_amount: row.actual_amount,
            variance_amount: row.variance_amount,
            budget_code: row.budget_code,
            is_recurring: row.is_recurring,
            frequency_months: row.frequency_months,
            invoice_number: row.invoice_number,
            notes: row.notes,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.building_id)
            .push_bind(self.floor_id)
            .push_bind(self.unit_id)
            .push_bind(&self.title)
            .push_bind(&self.description)
            .push_bind(self.cost_type.as_str())
            .push_bind(self.priority.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.planned_date)
            .push_bind(self.actual_date)
            .push_bind(self.completion_date)
            .push_bind(self.estimated_amount)
            .push_bind(self.actual_amount)
            .push_bind(self.variance_amount)
            .push_bind(&self.budget_code)
            .push_bind(self.is_recurring)
            .push_bind(self.frequency_months)
            .push_bind(&self.invoice_number)
            .push_bind(&self.notes);
        bind_audit(&self.audit, values);
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    id: Uuid,
    building_id: Uuid,
    unit_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
    fund_id: Option<Uuid>,
    transaction_type: String,
    status: String,
    payment_method: String,
    amount: Decimal,
    description: Option<String>,
    reference_number: String,
    due_date: DateTime<Utc>,
    payment_date: Option<DateTime<Utc>>,
    late_fee: Option<Decimal>,
    discount: Option<Decimal>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    notes: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static str = with_audit!(
        "id, building_id, unit_id, tenant_id, fund_id, transaction_type, status, \
         payment_method, amount, description, reference_number, due_date, payment_date, \
         late_fee, discount, approved_at, approved_by, notes"
    );
    type Row = TransactionRow;

    fn from_row(row: TransactionRow) -> Result<Self, DomainError> {
        Ok(Transaction {
            id: row.id,
            building_id: row.building_id,
            unit_id: row.unit_id,
            tenant_id: row.tenant_id,
            fund_id: row.fund_id,
            transaction_type: decode(
                &row.transaction_type,
                TransactionType::parse,
                "transactions.transaction_type",
            )?,
            status: decode(&row.status, TransactionStatus::parse, "transactions.status")?,
            payment_method: decode(
                &row.payment_method,
                PaymentMethod::parse,
                "transactions.payment_method",
            )?,
            amount: row.amount,
            description: row.description,
            reference_number: row.reference_number,
            due_date: row.due_date,
            payment_date: row.payment_date,
            late_fee: row.late_fee,
            discount: row.discount,
            approved_at: row.approved_at,
            approved_by: row.approved_by,
            notes: row.notes,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.building_id)
            .push_bind(self.unit_id)
            .push_bind(self.tenant_id)
            .push_bind(self.fund_id)
            .push_bind(self.transaction_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.payment_method.as_str())
            .push_bind(self.amount)
            .push_bind(&self.description)
            .push_bind(&self.reference_number)
            .push_bind(self.due_date)
            .push_bind(self.payment_date)
            .push_bind(self.late_fee)
            .push_bind(self.discount)
            .push_bind(self.approved_at)
            .push_bind(&self.approved_by)
            .push_bind(&self.notes);
        bind_audit(&self.audit, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::domain::{BuildingCreate, Entity};
    use sqlx::QueryBuilder;

    use crate::database::postgres::repository::PgRepository;
    use estate_core::repositories::BuildingFilter;

    fn column_count<T: PgRecord>() -> usize {
        T::COLUMNS.split(',').count()
    }

    #[test]
    fn test_column_lists_include_audit_block() {
        for columns in [
            Building::COLUMNS,
            Floor::COLUMNS,
            Unit::COLUMNS,
            Owner::COLUMNS,
            Tenant::COLUMNS,
            Cost::COLUMNS,
            Transaction::COLUMNS,
        ] {
            assert!(columns.starts_with("id, "));
            assert!(columns.ends_with("deleted_at, deleted_by"));
        }
        assert_eq!(column_count::<Building>(), 13);
        assert_eq!(column_count::<Transaction>(), 25);
    }

    #[test]
    fn test_insert_binds_one_placeholder_per_column() {
        let building = Building::new(
            BuildingCreate {
                name: "Tower".into(),
                address: None,
                total_floors: 3,
                year_built: Some(1999),
                description: None,
            },
            "alice",
        )
        .unwrap();
        let qb: QueryBuilder<'_, Postgres> =
            PgRepository::<Building, BuildingFilter>::insert_query(&building);
        let sql = qb.sql();
        assert!(sql.starts_with("INSERT INTO buildings (id, name"));
        assert!(sql.contains("$13)"));
        assert!(!sql.contains("$14"));
        assert_eq!(Building::KIND, "Building");
        assert_eq!(building.id(), building.id);
    }
}
