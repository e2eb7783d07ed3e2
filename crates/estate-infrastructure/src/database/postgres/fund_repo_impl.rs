//! Funds and their transaction ledger

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres};
use tracing::{info, warn};
use uuid::Uuid;

use estate_core::domain::{
    Fund, FundStatus, FundTransaction, FundTransactionStatus, FundTransactionType, FundType,
    PaymentMethod,
};
use estate_core::error::DomainError;
use estate_core::repositories::{DateRange, FundFilter, FundRepository};

use super::record::{bind_audit, decode, map_db_error, with_audit, AuditRow, PgRecord};
use super::repository::PgRepository;

pub type PgFundRepository = PgRepository<Fund, FundFilter>;

const TRANSACTION_COLUMNS: &str = "id, fund_id, transaction_type, status, payment_method, amount, \
     balance_after, reference_number, cost_id, charge_id, description, transaction_date, notes, \
     approved_at, approved_by, created_at, created_by";

#[derive(Debug, FromRow)]
pub struct FundRow {
    id: Uuid,
    building_id: Uuid,
    name: String,
    description: String,
    fund_type: String,
    status: String,
    current_balance: Decimal,
    target_amount: Option<Decimal>,
    minimum_balance: Decimal,
    manager: String,
    requires_approval: bool,
    approval_threshold: Option<Decimal>,
    withdrawal_limit: Option<Decimal>,
    last_audit_date: Option<DateTime<Utc>>,
    next_audit_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    #[sqlx(flatten)]
    audit: AuditRow,
}

impl PgRecord for Fund {
    const TABLE: &'static str = "funds";
    const COLUMNS: &'static str = with_audit!(
        "id, building_id, name, description, fund_type, status, current_balance, \
         target_amount, minimum_balance, manager, requires_approval, approval_threshold, \
         withdrawal_limit, last_audit_date, next_audit_date, notes"
    );
    type Row = FundRow;

    fn from_row(row: FundRow) -> Result<Self, DomainError> {
        Ok(Fund {
            id: row.id,
            building_id: row.building_id,
            name: row.name,
            description: row.description,
            fund_type: decode(&row.fund_type, FundType::parse, "funds.fund_type")?,
            status: decode(&row.status, FundStatus::parse, "funds.status")?,
            current_balance: row.current_balance,
            target_amount: row.target_amount,
            minimum_balance: row.minimum_balance,
            manager: row.manager,
            requires_approval: row.requires_approval,
            approval_threshold: row.approval_threshold,
            withdrawal_limit: row.withdrawal_limit,
            last_audit_date: row.last_audit_date,
            next_audit_date: row.next_audit_date,
            notes: row.notes,
            audit: row.audit.into(),
        })
    }

    fn bind_values<'a>(&'a self, values: &mut Separated<'_, 'a, Postgres, &'static str>) {
        values
            .push_bind(self.id)
            .push_bind(self.building_id)
            .push_bind(&self.name)
            .push_bind(&self.description)
            .push_bind(self.fund_type.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.current_balance)
            .push_bind(self.target_amount)
            .push_bind(self.minimum_balance)
            .push_bind(&self.manager)
            .push_bind(self.requires_approval)
            .push_bind(self.approval_threshold)
            .push_bind(self.withdrawal_limit)
            .push_bind(self.last_audit_date)
            .push_bind(self.next_audit_date)
            .push_bind(&self.notes);
        bind_audit(&self.audit, values);
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct FundTransactionRow {
    id: Uuid,
    fund_id: Uuid,
    transaction_type: String,
    status: String,
    payment_method: String,
    amount: Decimal,
    balance_after: Option<Decimal>,
    reference_number: String,
    cost_id: Option<Uuid>,
    charge_id: Option<Uuid>,
    description: String,
    transaction_date: DateTime<Utc>,
    notes: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl TryFrom<FundTransactionRow> for FundTransaction {
    type Error = DomainError;

    fn try_from(row: FundTransactionRow) -> Result<Self, Self::Error> {
        Ok(FundTransaction {
            id: row.id,
            fund_id: row.fund_id,
            transaction_type: decode(
                &row.transaction_type,
                FundTransactionType::parse,
                "fund_transactions.transaction_type",
            )?,
            status: decode(
                &row.status,
                FundTransactionStatus::parse,
                "fund_transactions.status",
            )?,
            payment_method: decode(
                &row.payment_method,
                PaymentMethod::parse,
                "fund_transactions.payment_method",
            )?,
            amount: row.amount,
            balance_after: row.balance_after,
            reference_number: row.reference_number,
            cost_id: row.cost_id,
            charge_id: row.charge_id,
            description: row.description,
            transaction_date: row.transaction_date,
            notes: row.notes,
            approved_at: row.approved_at,
            approved_by: row.approved_by,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

#[async_trait]
impl FundRepository for PgFundRepository {
    async fn save_transaction(
        &self,
        fund: &Fund,
        previous_balance: Decimal,
        tx: &FundTransaction,
    ) -> Result<(Fund, FundTransaction), DomainError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("Fund", "starting transaction for", e))?;

        let fund_row: Option<FundRow> =
            Self::update_query(fund, Some(("current_balance", previous_balance)))
                .build_query_as()
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(|e| map_db_error("Fund", "updating", e))?;
        let Some(fund_row) = fund_row else {
            warn!("Fund {} balance changed while saving transaction {}", fund.id, tx.id);
            return Err(DomainError::Conflict(format!(
                "Fund {} was modified concurrently, retry the transaction",
                fund.id
            )));
        };

        let sql = format!(
            r#"
            INSERT INTO fund_transactions ({TRANSACTION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                balance_after = EXCLUDED.balance_after,
                approved_at = EXCLUDED.approved_at,
                approved_by = EXCLUDED.approved_by
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );
        let tx_row: FundTransactionRow = sqlx::query_as(&sql)
            .bind(tx.id)
            .bind(tx.fund_id)
            .bind(tx.transaction_type.as_str())
            .bind(tx.status.as_str())
            .bind(tx.payment_method.as_str())
            .bind(tx.amount)
            .bind(tx.balance_after)
            .bind(&tx.reference_number)
            .bind(tx.cost_id)
            .bind(tx.charge_id)
            .bind(&tx.description)
            .bind(tx.transaction_date)
            .bind(&tx.notes)
            .bind(tx.approved_at)
            .bind(&tx.approved_by)
            .bind(tx.created_at)
            .bind(&tx.created_by)
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| map_db_error("FundTransaction", "saving", e))?;

        db_tx
            .commit()
            .await
            .map_err(|e| map_db_error("Fund", "committing transaction for", e))?;

        info!("Fund transaction {} stored ({})", tx.id, tx.status);
        Ok((Fund::from_row(fund_row)?, tx_row.try_into()?))
    }

    async fn find_transaction(
        &self,
        fund_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Option<FundTransaction>, DomainError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM fund_transactions WHERE fund_id = $1 AND id = $2"
        );
        let row: Option<FundTransactionRow> = sqlx::query_as(&sql)
            .bind(fund_id)
            .bind(tx_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("FundTransaction", "finding", e))?;
        row.map(FundTransaction::try_from).transpose()
    }

    async fn list_transactions(
        &self,
        fund_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<FundTransaction>, DomainError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM fund_transactions
            WHERE fund_id = $1
              AND ($2::timestamptz IS NULL OR transaction_date >= $2)
              AND ($3::timestamptz IS NULL OR transaction_date <= $3)
            ORDER BY transaction_date ASC, created_at ASC
            "#
        );
        let rows: Vec<FundTransactionRow> = sqlx::query_as(&sql)
            .bind(fund_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("FundTransaction", "listing", e))?;
        rows.into_iter().map(FundTransaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_columns_match_placeholders() {
        assert_eq!(TRANSACTION_COLUMNS.split(',').count(), 17);
        assert_eq!(Fund::COLUMNS.split(',').count(), 23);
    }
}
