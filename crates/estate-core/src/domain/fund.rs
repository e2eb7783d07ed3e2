//! Fund domain entity and its transaction ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::money::round2;
use super::transaction::PaymentMethod;
use super::{clean, generate_reference};
use crate::error::DomainError;

string_enum! {
    pub enum FundType {
        Maintenance => "maintenance",
        Reserve => "reserve",
        Operational => "operational",
        Renovation => "renovation",
        SpecialProject => "special_project",
        Emergency => "emergency",
        Sinking => "sinking",
        Other => "other",
    }
    default = Maintenance
}

string_enum! {
    pub enum FundStatus {
        Active => "active",
        Inactive => "inactive",
        Depleted => "depleted",
        Frozen => "frozen",
        PendingApproval => "pending_approval",
        Closed => "closed",
    }
    default = Active
}

string_enum! {
    pub enum FundTransactionType {
        Contribution => "contribution",
        Withdrawal => "withdrawal",
        TransferIn => "transfer_in",
        TransferOut => "transfer_out",
        Interest => "interest",
        Adjustment => "adjustment",
        Refund => "refund",
        Fee => "fee",
    }
    default = Contribution
}

string_enum! {
    pub enum FundTransactionStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Reversed => "reversed",
        Processing => "processing",
    }
    default = Pending
}

impl FundTransactionType {
    pub fn is_outflow(&self) -> bool {
        matches!(
            self,
            FundTransactionType::Withdrawal
                | FundTransactionType::TransferOut
                | FundTransactionType::Fee
        )
    }

    /// Signed effect of `amount` on the fund balance.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        if self.is_outflow() {
            -amount
        } else {
            amount
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: Uuid,
    pub building_id: Uuid,
    pub name: String,
    pub description: String,
    pub fund_type: FundType,
    pub status: FundStatus,
    pub current_balance: Decimal,
    pub target_amount: Option<Decimal>,
    pub minimum_balance: Decimal,
    pub manager: String,
    pub requires_approval: bool,
    pub approval_threshold: Option<Decimal>,
    pub withdrawal_limit: Option<Decimal>,
    pub last_audit_date: Option<DateTime<Utc>>,
    pub next_audit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FundCreate {
    pub building_id: Uuid,
    #[validate(length(min = 2, max = 100, message = "Fund name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    #[serde(default)]
    pub fund_type: FundType,
    #[serde(default)]
    pub status: FundStatus,
    #[serde(default)]
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub current_balance: Decimal,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub target_amount: Option<Decimal>,
    #[serde(default)]
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub minimum_balance: Decimal,
    #[validate(length(min = 2, max = 100, message = "Manager must be between 2 and 100 characters"))]
    pub manager: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub approval_threshold: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub withdrawal_limit: Option<Decimal>,
    pub last_audit_date: Option<DateTime<Utc>>,
    pub next_audit_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct FundUpdate {
    #[validate(length(min = 2, max = 100, message = "Fund name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
    pub fund_type: Option<FundType>,
    pub status: Option<FundStatus>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub target_amount: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub minimum_balance: Option<Decimal>,
    #[validate(length(min = 2, max = 100, message = "Manager must be between 2 and 100 characters"))]
    pub manager: Option<String>,
    pub requires_approval: Option<bool>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub approval_threshold: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub withdrawal_limit: Option<Decimal>,
    pub last_audit_date: Option<DateTime<Utc>>,
    pub next_audit_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

/// A movement of money in or out of a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundTransaction {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub transaction_type: FundTransactionType,
    pub status: FundTransactionStatus,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub balance_after: Option<Decimal>,
    pub reference_number: String,
    pub cost_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FundTransactionCreate {
    pub transaction_type: FundTransactionType,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Positive for every type except `adjustment`, which may be negative.
    pub amount: Decimal,
    #[validate(length(min = 1, max = 100, message = "Reference number must be between 1 and 100 characters"))]
    pub reference_number: Option<String>,
    pub cost_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    pub transaction_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

/// A fund with its balance indicators, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct FundView {
    #[serde(flatten)]
    pub fund: Fund,
    pub available_balance: Decimal,
    pub is_low_balance: bool,
}

impl From<Fund> for FundView {
    fn from(fund: Fund) -> Self {
        Self {
            available_balance: fund.available_balance(),
            is_low_balance: fund.is_low_balance(),
            fund,
        }
    }
}

impl Fund {
    pub fn new(input: FundCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            building_id: input.building_id,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            fund_type: input.fund_type,
            status: input.status,
            current_balance: round2(input.current_balance),
            target_amount: input.target_amount.map(round2),
            minimum_balance: round2(input.minimum_balance),
            manager: input.manager.trim().to_string(),
            requires_approval: input.requires_approval,
            approval_threshold: input.approval_threshold.map(round2),
            withdrawal_limit: input.withdrawal_limit.map(round2),
            last_audit_date: input.last_audit_date,
            next_audit_date: input.next_audit_date,
            notes: clean(input.notes),
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: FundUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(fund_type) = changes.fund_type {
            self.fund_type = fund_type;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(target) = changes.target_amount {
            self.target_amount = Some(round2(target));
        }
        if let Some(minimum) = changes.minimum_balance {
            self.minimum_balance = round2(minimum);
        }
        if let Some(manager) = changes.manager {
            self.manager = manager.trim().to_string();
        }
        if let Some(requires_approval) = changes.requires_approval {
            self.requires_approval = requires_approval;
        }
        if let Some(threshold) = changes.approval_threshold {
            self.approval_threshold = Some(round2(threshold));
        }
        if let Some(limit) = changes.withdrawal_limit {
            self.withdrawal_limit = Some(round2(limit));
        }
        if changes.last_audit_date.is_some() {
            self.last_audit_date = changes.last_audit_date;
        }
        if changes.next_audit_date.is_some() {
            self.next_audit_date = changes.next_audit_date;
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        self.audit.touch(actor);
        Ok(())
    }

    /// Balance above the minimum that may be spent.
    pub fn available_balance(&self) -> Decimal {
        (self.current_balance - self.minimum_balance).max(Decimal::ZERO)
    }

    pub fn is_low_balance(&self) -> bool {
        self.current_balance <= round2(self.minimum_balance * Decimal::new(11, 1))
    }

    pub fn ensure_empty(&self) -> Result<(), DomainError> {
        if !self.current_balance.is_zero() {
            return Err(DomainError::rule(
                "FUND_NOT_EMPTY",
                format!(
                    "Fund {} still holds a balance of {}",
                    self.id, self.current_balance
                ),
            ));
        }
        Ok(())
    }

    /// Validate and book a new transaction. Outflows above the approval
    /// threshold are returned `pending` and leave the balance untouched.
    pub fn record_transaction(
        &mut self,
        input: FundTransactionCreate,
        actor: &str,
    ) -> Result<FundTransaction, DomainError> {
        self.ensure_accepts_transactions()?;
        input.validate()?;

        let kind = input.transaction_type;
        let amount = round2(input.amount);
        if amount.is_zero()
            || (amount.is_sign_negative() && kind != FundTransactionType::Adjustment)
        {
            return Err(DomainError::validation(
                "amount must be greater than zero",
            ));
        }
        self.check_outflow(kind, amount)?;

        let now = Utc::now();
        let mut tx = FundTransaction {
            id: new_id(),
            fund_id: self.id,
            transaction_type: kind,
            status: FundTransactionStatus::Pending,
            payment_method: input.payment_method,
            amount,
            balance_after: None,
            reference_number: clean(input.reference_number)
                .unwrap_or_else(|| generate_reference("FTX")),
            cost_id: input.cost_id,
            charge_id: input.charge_id,
            description: input.description.trim().to_string(),
            transaction_date: input.transaction_date.unwrap_or(now),
            notes: clean(input.notes),
            approved_at: None,
            approved_by: None,
            created_at: now,
            created_by: actor.to_string(),
        };

        if !self.needs_approval(kind, amount) {
            self.settle(&mut tx, actor);
        }
        Ok(tx)
    }

    /// Re-validate a pending transaction against the current balance and book it.
    pub fn approve_transaction(
        &mut self,
        tx: &mut FundTransaction,
        actor: &str,
    ) -> Result<(), DomainError> {
        if tx.fund_id != self.id {
            return Err(DomainError::not_found("FundTransaction", tx.id));
        }
        if tx.status != FundTransactionStatus::Pending {
            return Err(DomainError::rule(
                "TRANSACTION_NOT_PENDING",
                format!("Fund transaction {} is {}", tx.id, tx.status),
            ));
        }
        self.ensure_accepts_transactions()?;
        self.check_outflow(tx.transaction_type, tx.amount)?;

        self.settle(tx, actor);
        tx.approved_at = Some(Utc::now());
        tx.approved_by = Some(actor.to_string());
        Ok(())
    }

    fn ensure_accepts_transactions(&self) -> Result<(), DomainError> {
        match self.status {
            FundStatus::Active | FundStatus::Depleted => Ok(()),
            status => Err(DomainError::rule(
                "FUND_NOT_ACTIVE",
                format!("Fund {} is {status}", self.id),
            )),
        }
    }

    fn check_outflow(&self, kind: FundTransactionType, amount: Decimal) -> Result<(), DomainError> {
        let delta = kind.signed(amount);
        if delta >= Decimal::ZERO {
            return Ok(());
        }
        let required = -delta;
        // Negative adjustments may dip into the minimum but never below zero.
        let available = if kind.is_outflow() {
            self.available_balance()
        } else {
            self.current_balance
        };
        if required > available {
            return Err(DomainError::InsufficientFunds { required, available });
        }
        if let Some(limit) = self.withdrawal_limit {
            if kind.is_outflow() && required > limit {
                return Err(DomainError::rule(
                    "WITHDRAWAL_LIMIT_EXCEEDED",
                    format!("Withdrawal of {required} exceeds the limit of {limit}"),
                ));
            }
        }
        Ok(())
    }

    fn needs_approval(&self, kind: FundTransactionType, amount: Decimal) -> bool {
        kind.is_outflow()
            && self.requires_approval
            && self
                .approval_threshold
                .is_some_and(|threshold| amount > threshold)
    }

    fn settle(&mut self, tx: &mut FundTransaction, actor: &str) {
        let delta = tx.transaction_type.signed(tx.amount);
        self.current_balance = round2(self.current_balance + delta);
        if self.current_balance.is_zero() {
            self.status = FundStatus::Depleted;
        } else if self.status == FundStatus::Depleted && delta > Decimal::ZERO {
            self.status = FundStatus::Active;
        }
        self.audit.touch(actor);

        tx.status = FundTransactionStatus::Completed;
        tx.balance_after = Some(self.current_balance);
    }
}

impl_entity!(Fund, "Fund");

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fund(balance: Decimal) -> Fund {
        Fund::new(
            FundCreate {
                building_id: Uuid::new_v4(),
                name: "Reserve".into(),
                description: String::new(),
                fund_type: FundType::Reserve,
                status: FundStatus::Active,
                current_balance: balance,
                target_amount: None,
                minimum_balance: dec!(100),
                manager: "Treasurer".into(),
                requires_approval: false,
                approval_threshold: None,
                withdrawal_limit: None,
                last_audit_date: None,
                next_audit_date: None,
                notes: None,
            },
            "alice",
        )
        .unwrap()
    }

    fn tx(kind: FundTransactionType, amount: Decimal) -> FundTransactionCreate {
        FundTransactionCreate {
            transaction_type: kind,
            payment_method: PaymentMethod::BankTransfer,
            amount,
            reference_number: None,
            cost_id: None,
            charge_id: None,
            description: String::new(),
            transaction_date: None,
            notes: None,
        }
    }

    #[test]
    fn test_balance_indicators() {
        let f = fund(dec!(105));
        assert_eq!(f.available_balance(), dec!(5));
        assert!(f.is_low_balance());

        let f = fund(dec!(50));
        assert_eq!(f.available_balance(), Decimal::ZERO);

        let f = fund(dec!(500));
        assert!(!f.is_low_balance());
    }

    #[test]
    fn test_inflow_and_outflow() {
        let mut f = fund(dec!(1000));
        let t = f
            .record_transaction(tx(FundTransactionType::Contribution, dec!(250)), "bob")
            .unwrap();
        assert_eq!(t.status, FundTransactionStatus::Completed);
        assert_eq!(t.balance_after, Some(dec!(1250)));
        assert!(t.reference_number.starts_with("FTX-"));

        let t = f
            .record_transaction(tx(FundTransactionType::Fee, dec!(50)), "bob")
            .unwrap();
        assert_eq!(t.balance_after, Some(dec!(1200)));
        assert_eq!(f.current_balance, dec!(1200));
    }

    #[test]
    fn test_insufficient_funds_respects_minimum() {
        let mut f = fund(dec!(1000));
        let err = f
            .record_transaction(tx(FundTransactionType::Withdrawal, dec!(950)), "bob")
            .unwrap_err();
        match err {
            DomainError::InsufficientFunds { required, available } => {
                assert_eq!(required, dec!(950));
                assert_eq!(available, dec!(900));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.current_balance, dec!(1000));
    }

    #[test]
    fn test_withdrawal_limit() {
        let mut f = fund(dec!(1000));
        f.withdrawal_limit = Some(dec!(200));
        let err = f
            .record_transaction(tx(FundTransactionType::TransferOut, dec!(300)), "bob")
            .unwrap_err();
        assert_eq!(err.code(), "WITHDRAWAL_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_large_outflow_waits_for_approval() {
        let mut f = fund(dec!(1000));
        f.requires_approval = true;
        f.approval_threshold = Some(dec!(100));

        let mut pending = f
            .record_transaction(tx(FundTransactionType::Withdrawal, dec!(400)), "bob")
            .unwrap();
        assert_eq!(pending.status, FundTransactionStatus::Pending);
        assert_eq!(pending.balance_after, None);
        assert_eq!(f.current_balance, dec!(1000));

        f.approve_transaction(&mut pending, "carol").unwrap();
        assert_eq!(pending.status, FundTransactionStatus::Completed);
        assert_eq!(pending.balance_after, Some(dec!(600)));
        assert_eq!(pending.approved_by.as_deref(), Some("carol"));

        let err = f.approve_transaction(&mut pending, "carol").unwrap_err();
        assert_eq!(err.code(), "TRANSACTION_NOT_PENDING");
    }

    #[test]
    fn test_depletion_and_reactivation() {
        let mut f = fund(dec!(0));
        f.minimum_balance = Decimal::ZERO;
        f.record_transaction(tx(FundTransactionType::Contribution, dec!(10)), "bob")
            .unwrap();
        f.record_transaction(tx(FundTransactionType::Withdrawal, dec!(10)), "bob")
            .unwrap();
        assert_eq!(f.status, FundStatus::Depleted);
        assert!(f.ensure_empty().is_ok());

        f.record_transaction(tx(FundTransactionType::Interest, dec!(1.5)), "bob")
            .unwrap();
        assert_eq!(f.status, FundStatus::Active);
        assert_eq!(f.ensure_empty().unwrap_err().code(), "FUND_NOT_EMPTY");
    }

    #[test]
    fn test_frozen_fund_rejects_transactions() {
        let mut f = fund(dec!(1000));
        f.status = FundStatus::Frozen;
        let err = f
            .record_transaction(tx(FundTransactionType::Contribution, dec!(1)), "bob")
            .unwrap_err();
        assert_eq!(err.code(), "FUND_NOT_ACTIVE");
    }

    #[test]
    fn test_signed_adjustment() {
        let mut f = fund(dec!(150));
        f.record_transaction(tx(FundTransactionType::Adjustment, dec!(-120)), "bob")
            .unwrap();
        assert_eq!(f.current_balance, dec!(30));

        let err = f
            .record_transaction(tx(FundTransactionType::Adjustment, dec!(-31)), "bob")
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");

        let err = f
            .record_transaction(tx(FundTransactionType::Withdrawal, dec!(-5)), "bob")
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }
}
