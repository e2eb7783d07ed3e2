//! Transaction domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::money::round2;
use super::{clean, generate_reference};
use crate::error::DomainError;

string_enum! {
    pub enum TransactionType {
        Rent => "rent",
        Deposit => "deposit",
        Maintenance => "maintenance",
        Utility => "utility",
        Parking => "parking",
        Fine => "fine",
        Refund => "refund",
        Adjustment => "adjustment",
        Other => "other",
    }
    default = Rent
}

string_enum! {
    pub enum TransactionStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Refunded => "refunded",
        Partial => "partial",
        Overdue => "overdue",
        Disputed => "disputed",
    }
    default = Pending
}

string_enum! {
    pub enum PaymentMethod {
        Cash => "cash",
        BankTransfer => "bank_transfer",
        Check => "check",
        CreditCard => "credit_card",
        DebitCard => "debit_card",
        MobilePayment => "mobile_payment",
        OnlinePayment => "online_payment",
        Other => "other",
    }
    default = Cash
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference_number: String,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub late_fee: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub notes: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TransactionCreate {
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    #[serde(default)]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub amount: Decimal,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Reference number must be between 1 and 100 characters"))]
    pub reference_number: Option<String>,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub late_fee: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub discount: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct TransactionUpdate {
    pub unit_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub amount: Option<Decimal>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub late_fee: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub discount: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

impl Transaction {
    pub fn new(input: TransactionCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        let mut tx = Self {
            id: new_id(),
            building_id: input.building_id,
            unit_id: input.unit_id,
            tenant_id: input.tenant_id,
            fund_id: input.fund_id,
            transaction_type: input.transaction_type,
            status: TransactionStatus::Pending,
            payment_method: input.payment_method,
            amount: round2(input.amount),
            description: clean(input.description),
            reference_number: clean(input.reference_number)
                .unwrap_or_else(|| generate_reference("TXN")),
            due_date: input.due_date,
            payment_date: input.payment_date,
            late_fee: input.late_fee.map(round2),
            discount: input.discount.map(round2),
            approved_at: None,
            approved_by: None,
            notes: clean(input.notes),
            audit: AuditFields::new(actor),
        };
        tx.transition(input.status, actor);
        Ok(tx)
    }

    pub fn apply(&mut self, changes: TransactionUpdate, actor: &str) -> Result<(), DomainError> {
        if self.status == TransactionStatus::Completed {
            return Err(DomainError::rule(
                "COMPLETED_TRANSACTION",
                format!("Transaction {} is completed and cannot be changed", self.id),
            ));
        }
        changes.validate()?;
        if changes.unit_id.is_some() {
            self.unit_id = changes.unit_id;
        }
        if changes.tenant_id.is_some() {
            self.tenant_id = changes.tenant_id;
        }
        if changes.fund_id.is_some() {
            self.fund_id = changes.fund_id;
        }
        if let Some(kind) = changes.transaction_type {
            self.transaction_type = kind;
        }
        if let Some(method) = changes.payment_method {
            self.payment_method = method;
        }
        if let Some(amount) = changes.amount {
            self.amount = round2(amount);
        }
        if changes.description.is_some() {
            self.description = clean(changes.description);
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if changes.payment_date.is_some() {
            self.payment_date = changes.payment_date;
        }
        if let Some(late_fee) = changes.late_fee {
            self.late_fee = Some(round2(late_fee));
        }
        if let Some(discount) = changes.discount {
            self.discount = Some(round2(discount));
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        if let Some(status) = changes.status {
            self.transition(status, actor);
        }
        self.audit.touch(actor);
        Ok(())
    }

    pub fn net_amount(&self) -> Decimal {
        round2(
            self.amount + self.late_fee.unwrap_or_default() - self.discount.unwrap_or_default(),
        )
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    fn transition(&mut self, status: TransactionStatus, actor: &str) {
        if status == TransactionStatus::Completed && self.status != status {
            let now = Utc::now();
            self.approved_at = Some(now);
            self.approved_by = Some(actor.to_string());
            self.payment_date.get_or_insert(now);
        }
        self.status = status;
    }
}

impl_entity!(Transaction, "Transaction");

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> TransactionCreate {
        TransactionCreate {
            building_id: Uuid::new_v4(),
            unit_id: None,
            tenant_id: None,
            fund_id: None,
            transaction_type: TransactionType::Rent,
            status: TransactionStatus::Pending,
            payment_method: PaymentMethod::BankTransfer,
            amount: dec!(1200),
            description: None,
            reference_number: None,
            due_date: Utc::now(),
            payment_date: None,
            late_fee: Some(dec!(25.5)),
            discount: Some(dec!(100)),
            notes: None,
        }
    }

    #[test]
    fn test_reference_generated_when_absent() {
        let tx = Transaction::new(input(), "alice").unwrap();
        assert!(tx.reference_number.starts_with("TXN-"));
        assert_eq!(tx.reference_number.len(), "TXN-20250101120000-ABCD".len());

        let mut given = input();
        given.reference_number = Some("BANK-42".into());
        let tx = Transaction::new(given, "alice").unwrap();
        assert_eq!(tx.reference_number, "BANK-42");
    }

    #[test]
    fn test_net_amount() {
        let tx = Transaction::new(input(), "alice").unwrap();
        assert_eq!(tx.net_amount(), dec!(1125.50));
    }

    #[test]
    fn test_completion_stamps_approval_and_locks() {
        let mut tx = Transaction::new(input(), "alice").unwrap();
        assert!(tx.approved_at.is_none());

        tx.apply(
            TransactionUpdate {
                status: Some(TransactionStatus::Completed),
                ..Default::default()
            },
            "bob",
        )
        .unwrap();
        assert!(tx.is_completed());
        assert_eq!(tx.approved_by.as_deref(), Some("bob"));
        assert!(tx.payment_date.is_some());

        let err = tx
            .apply(
                TransactionUpdate {
                    amount: Some(dec!(1)),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap_err();
        assert_eq!(err.code(), "COMPLETED_TRANSACTION");
    }
}
