//! Charge domain entity and its payment ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use super::money::round2;
use crate::error::DomainError;

string_enum! {
    pub enum ChargeType {
        Recurring => "recurring",
        Maintenance => "maintenance",
        Utility => "utility",
        Parking => "parking",
        Renovation => "renovation",
        Penalty => "penalty",
        Deposit => "deposit",
        Rent => "rent",
        Other => "other",
    }
    default = Maintenance
}

string_enum! {
    pub enum ChargeStatus {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
        PartiallyPaid => "partially_paid",
        Disputed => "disputed",
    }
    default = Pending
}

string_enum! {
    pub enum ChargeFrequency {
        Once => "once",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
    default = Once
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub charge_type: ChargeType,
    pub status: ChargeStatus,
    pub due_date: DateTime<Utc>,
    pub frequency: ChargeFrequency,
    pub recurring: bool,
    pub amount_paid: Decimal,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub generated_by: String,
    pub notes: Option<String>,
    pub tax_rate: Decimal,
    pub is_taxable: bool,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ChargeCreate {
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub amount: Decimal,
    #[serde(default)]
    pub charge_type: ChargeType,
    #[serde(default)]
    pub status: ChargeStatus,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub frequency: ChargeFrequency,
    #[serde(default)]
    pub recurring: bool,
    pub generated_by: Option<String>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "crate::domain::validation::percent"))]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub is_taxable: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ChargeUpdate {
    pub unit_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub amount: Option<Decimal>,
    pub charge_type: Option<ChargeType>,
    pub status: Option<ChargeStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub frequency: Option<ChargeFrequency>,
    pub recurring: Option<bool>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
    #[validate(custom(function = "crate::domain::validation::percent"))]
    pub tax_rate: Option<Decimal>,
    pub is_taxable: Option<bool>,
}

/// A payment recorded against a charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub charge_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub reference: String,
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PaymentCreate {
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 50, message = "Payment method must be between 1 and 50 characters"))]
    pub payment_method: String,
    #[validate(length(min = 1, max = 100, message = "Payment reference must be between 1 and 100 characters"))]
    pub reference: String,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

/// A charge together with its derived totals, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeView {
    #[serde(flatten)]
    pub charge: Charge,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub balance_due: Decimal,
    pub is_overdue: bool,
}

impl From<Charge> for ChargeView {
    fn from(charge: Charge) -> Self {
        Self {
            tax_amount: charge.tax_amount(),
            total_amount: charge.total_amount(),
            balance_due: charge.balance_due(),
            is_overdue: charge.is_overdue_at(Utc::now()),
            charge,
        }
    }
}

impl Charge {
    pub fn new(input: ChargeCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        Ok(Self {
            id: new_id(),
            building_id: input.building_id,
            unit_id: input.unit_id,
            owner_id: input.owner_id,
            tenant_id: input.tenant_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            amount: round2(input.amount),
            charge_type: input.charge_type,
            status: input.status,
            due_date: input.due_date,
            frequency: input.frequency,
            recurring: input.recurring,
            amount_paid: Decimal::ZERO,
            last_payment_date: None,
            payment_reference: None,
            generated_by: clean(input.generated_by).unwrap_or_else(|| actor.to_string()),
            notes: clean(input.notes),
            tax_rate: input.tax_rate,
            is_taxable: input.is_taxable,
            audit: AuditFields::new(actor),
        })
    }

    pub fn apply(&mut self, changes: ChargeUpdate, actor: &str) -> Result<(), DomainError> {
        self.ensure_not_paid()?;
        changes.validate()?;
        if changes.unit_id.is_some() {
            self.unit_id = changes.unit_id;
        }
        if changes.owner_id.is_some() {
            self.owner_id = changes.owner_id;
        }
        if changes.tenant_id.is_some() {
            self.tenant_id = changes.tenant_id;
        }
        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(amount) = changes.amount {
            self.amount = round2(amount);
        }
        if let Some(charge_type) = changes.charge_type {
            self.charge_type = charge_type;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if let Some(frequency) = changes.frequency {
            self.frequency = frequency;
        }
        if let Some(recurring) = changes.recurring {
            self.recurring = recurring;
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        if let Some(tax_rate) = changes.tax_rate {
            self.tax_rate = tax_rate;
        }
        if let Some(is_taxable) = changes.is_taxable {
            self.is_taxable = is_taxable;
        }
        match changes.status {
            Some(status) => self.status = status,
            None if self.amount_paid > Decimal::ZERO => self.settle_status(),
            None => {}
        }
        self.audit.touch(actor);
        Ok(())
    }

    pub fn tax_amount(&self) -> Decimal {
        if self.is_taxable && self.tax_rate > Decimal::ZERO {
            round2(self.amount * self.tax_rate / Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        }
    }

    pub fn total_amount(&self) -> Decimal {
        round2(self.amount + self.tax_amount())
    }

    pub fn balance_due(&self) -> Decimal {
        round2(self.total_amount() - self.amount_paid)
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, ChargeStatus::Paid | ChargeStatus::Cancelled)
            && self.due_date < now
            && self.balance_due() > Decimal::ZERO
    }

    pub fn ensure_not_paid(&self) -> Result<(), DomainError> {
        if self.status == ChargeStatus::Paid {
            return Err(DomainError::rule(
                "CHARGE_PAID",
                format!("Charge {} is already paid", self.id),
            ));
        }
        Ok(())
    }

    /// Apply a payment and return the ledger row to persist with it.
    pub fn record_payment(
        &mut self,
        input: PaymentCreate,
        actor: &str,
    ) -> Result<Payment, DomainError> {
        match self.status {
            ChargeStatus::Paid => return Err(self.payment_rejected("paid")),
            ChargeStatus::Cancelled => return Err(self.payment_rejected("cancelled")),
            _ => {}
        }
        input.validate()?;

        let amount = round2(input.amount);
        let balance = self.balance_due();
        if amount > balance {
            return Err(DomainError::rule(
                "OVERPAYMENT",
                format!("Payment of {amount} exceeds the balance due of {balance}"),
            ));
        }

        let now = Utc::now();
        let payment_date = input.payment_date.unwrap_or(now);
        let reference = input.reference.trim().to_string();

        self.amount_paid = round2(self.amount_paid + amount);
        self.last_payment_date = Some(payment_date);
        self.payment_reference = Some(reference.clone());
        self.settle_status();
        self.audit.touch(actor);

        Ok(Payment {
            id: new_id(),
            charge_id: self.id,
            amount,
            payment_method: input.payment_method.trim().to_string(),
            reference,
            payment_date,
            notes: clean(input.notes),
            created_at: now,
            created_by: actor.to_string(),
        })
    }

    /// `pending` → `overdue` once the due date has passed with money owed.
    pub fn mark_overdue(&mut self, now: DateTime<Utc>, actor: &str) -> bool {
        if self.status == ChargeStatus::Pending && self.is_overdue_at(now) {
            self.status = ChargeStatus::Overdue;
            self.audit.touch(actor);
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, actor: &str) {
        self.status = ChargeStatus::Cancelled;
        self.audit.touch(actor);
    }

    fn settle_status(&mut self) {
        self.status = if self.balance_due() <= Decimal::ZERO {
            ChargeStatus::Paid
        } else {
            ChargeStatus::PartiallyPaid
        };
    }

    fn payment_rejected(&self, state: &str) -> DomainError {
        DomainError::rule(
            "CHARGE_NOT_PAYABLE",
            format!("Cannot record a payment on a {state} charge"),
        )
    }
}

impl_entity!(Charge, "Charge");
