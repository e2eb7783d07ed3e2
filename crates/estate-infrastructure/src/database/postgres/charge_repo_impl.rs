//! Charges and their payment ledger

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres};
use tracing::{info, warn};
use uuid::Uuid;

use estate_core::domain::{Charge, ChargeFrequency, ChargeStatus, ChargeType, Payment};
use estate_core::error::DomainError;
use estate_core::repositories::{ChargeFilter, ChargeRepository};

use super::record::{bind_audit, decode, map_db_error, with_audit, AuditRow, PgRecord};
use super::repository::PgRepository;

pub type PgChargeRepository = PgRepository<Charge, ChargeFilter>;

#[derive(Debug, FromRow)]
pub struct ChargeRow {
    id: Uuid,
    building_id: Uuid,
    unit_id: Option<Uuid>,
    owner_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
    title: String,
    description: String,
    amount: Decimal,
    charge_type: String,
    status: String,
    due_date: DateTime<Utc>,
    frequency: String,
    recurring: bool,
    amount_paid: Decimal,
    last_payment_date: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    generated_by: String,
    notes: Option<String>,
    tax_rate: Decimal,
    is_taxable: bool,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Charge {
    const TABLE: &'static str = "charges";
    const COLUMNS: &'static str = with_audit!(
        "id, building_id, unit_id, owner_id, tenant_id, title, description, amount, \
         charge_type, status, due_date, frequency, recurring, amount_paid, last_payment_date, \
         payment_reference, generated_by, notes, tax_rate, is_taxable"
    );
    type Row = ChargeRow;

    fn from_row(row: ChargeRow) -> Result<Self, DomainError> {
        Ok(Charge {
            id: row.id,
            building_id: row.building_id,
            unit_id: row.unit_id,
            owner_id: row.owner_id,
            tenant_id: row.tenant_id,
            title: row.title,
            description: row.description,
            amount: row.amount,
            charge_type: decode(&row.charge_type, ChargeType::parse, "charges.charge_type")?,
            status: decode(&row.status, ChargeStatus::parse, "charges.status")?,
            due_date: row.due_date,
            frequency: decode(&row.frequency, ChargeFrequency::parse, "charges.frequency")?,
            recurring: row.recurring,
            amount_paid: row.amount_paid,
            last_payment_date: row.last_payment_date,
            payment_reference: row.payment_reference,
            generated_by: row.generated_by,
            notes: row.notes,
            tax_rate: row.tax_rate,
            is_taxable: row.is_taxable,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.building_id)
            .push_bind(self.unit_id)
            .push_bind(self.owner_id)
            .push_bind(self.tenant_id)
            .push_bind(&self.title)
            .push_bind(&self.description)
            .push_bind(self.amount)
            .push_bind(self.charge_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.due_date)
            .push_bind(self.frequency.as_str())
            .push_bind(self.recurring)
            .push_bind(self.amount_paid)
            .push_bind(self.last_payment_date)
            .push_bind(&self.payment_reference)
            .push_bind(&self.generated_by)
            .push_bind(&self.notes)
            .push_bind(self.tax_rate)
            .push_bind(self.is_taxable);
        bind_audit(&self.audit, values);
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    charge_id: Uuid,
    amount: Decimal,
    payment_method: String,
    reference: String,
    payment_date: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            charge_id: row.charge_id,
            amount: row.amount,
            payment_method: row.payment_method,
            reference: row.reference,
            payment_date: row.payment_date,
            notes: row.notes,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

#[async_trait]
impl ChargeRepository for PgChargeRepository {
    async fn record_payment(
        &self,
        charge: &Charge,
        previous_paid: Decimal,
        payment: &Payment,
    ) -> Result<Charge, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("Charge", "starting payment for", e))?;

        let row: Option<ChargeRow> = Self::update_query(charge, Some(("amount_paid", previous_paid)))
            .build_query_as()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_db_error("Charge", "updating", e))?;
        let Some(row) = row else {
            warn!("Charge {} changed while recording payment {}", charge.id, payment.id);
            return Err(DomainError::Conflict(format!(
                "Charge {} was modified concurrently, retry the payment",
                charge.id
            )));
        };

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, charge_id, amount, payment_method, reference,
                payment_date, notes, created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.charge_id)
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(&payment.reference)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .bind(&payment.created_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("Payment", "creating", e))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error("Charge", "committing payment for", e))?;

        info!("Payment {} stored for charge {}", payment.id, charge.id);
        Charge::from_row(row)
    }

    async fn list_payments(&self, charge_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT
                id, charge_id, amount, payment_method, reference,
                payment_date, notes, created_at, created_by
            FROM payments
            WHERE charge_id = $1
            ORDER BY payment_date ASC, created_at ASC
            "#,
        )
        .bind(charge_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("Payment", "listing", e))?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::domain::ChargeCreate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_guarded_update_checks_previous_amount() {
        let charge = Charge::new(
            ChargeCreate {
                building_id: Uuid::new_v4(),
                unit_id: None,
                owner_id: None,
                tenant_id: None,
                title: "Water".into(),
                description: String::new(),
                amount: dec!(40),
                charge_type: ChargeType::Utility,
                status: ChargeStatus::Pending,
                due_date: Utc::now(),
                frequency: ChargeFrequency::Monthly,
                recurring: true,
                generated_by: None,
                notes: None,
                tax_rate: Decimal::ZERO,
                is_taxable: false,
            },
            "alice",
        )
        .unwrap();
        let qb = PgChargeRepository::update_query(&charge, Some(("amount_paid", Decimal::ZERO)));
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE charges SET (id, building_id"));
        assert!(sql.contains("WHERE id = $28 AND amount_paid = $29 RETURNING id"));
    }
}
