//! Cost domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use estate_shared::{new_id, AuditFields};

use super::clean;
use super::money::{percentage, round2};
use crate::error::DomainError;

string_enum! {
    pub enum CostType {
        Maintenance => "maintenance",
        Repair => "repair",
        Utility => "utility",
        Staff => "staff",
        Security => "security",
        Cleaning => "cleaning",
        Renovation => "renovation",
        Insurance => "insurance",
        Taxes => "taxes",
        Equipment => "equipment",
        Supplies => "supplies",
        Emergency => "emergency",
        Other => "other",
    }
    default = Maintenance
}

string_enum! {
    pub enum CostPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
    default = Medium
}

string_enum! {
    pub enum CostStatus {
        Planned => "planned",
        Approved => "approved",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        OnHold => "on_hold",
        Draft => "draft",
        Pending => "pending",
        Rejected => "rejected",
        Paid => "paid",
        Refunded => "refunded",
    }
    default = Planned
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub id: Uuid,
    pub building_id: Uuid,
    pub floor_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub cost_type: CostType,
    pub priority: CostPriority,
    pub status: CostStatus,
    pub planned_date: DateTime<Utc>,
    pub actual_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub estimated_amount: Decimal,
    pub actual_amount: Option<Decimal>,
    pub variance_amount: Option<Decimal>,
    pub budget_code: Option<String>,
    pub is_recurring: bool,
    pub frequency_months: Option<i32>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,

    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CostCreate {
    pub building_id: Uuid,
    pub floor_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    #[serde(default)]
    pub cost_type: CostType,
    #[serde(default)]
    pub priority: CostPriority,
    #[serde(default)]
    pub status: CostStatus,
    pub planned_date: DateTime<Utc>,
    pub actual_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub estimated_amount: Decimal,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub actual_amount: Option<Decimal>,
    #[validate(length(max = 50, message = "Budget code too long"))]
    pub budget_code: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[validate(range(min = 1, max = 120, message = "Frequency must be between 1 and 120 months"))]
    pub frequency_months: Option<i32>,
    #[validate(length(max = 100, message = "Invoice number too long"))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CostUpdate {
    pub floor_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
    pub cost_type: Option<CostType>,
    pub priority: Option<CostPriority>,
    pub status: Option<CostStatus>,
    pub planned_date: Option<DateTime<Utc>>,
    pub actual_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "crate::domain::validation::positive"))]
    pub estimated_amount: Option<Decimal>,
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub actual_amount: Option<Decimal>,
    #[validate(length(max = 50, message = "Budget code too long"))]
    pub budget_code: Option<String>,
    pub is_recurring: Option<bool>,
    #[validate(range(min = 1, max = 120, message = "Frequency must be between 1 and 120 months"))]
    pub frequency_months: Option<i32>,
    #[validate(length(max = 100, message = "Invoice number too long"))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

/// Body of `POST /costs/{id}/complete`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CostCompletion {
    #[validate(custom(function = "crate::domain::validation::non_negative"))]
    pub actual_amount: Decimal,
    pub completion_date: Option<DateTime<Utc>>,
}

/// A cost with its budget indicators, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct CostView {
    #[serde(flatten)]
    pub cost: Cost,
    pub is_over_budget: bool,
    pub variance_percentage: Option<Decimal>,
}

impl From<Cost> for CostView {
    fn from(cost: Cost) -> Self {
        Self {
            is_over_budget: cost.is_over_budget(),
            variance_percentage: cost.variance_percentage(),
            cost,
        }
    }
}

impl Cost {
    pub fn new(input: CostCreate, actor: &str) -> Result<Self, DomainError> {
        input.validate()?;
        let mut cost = Self {
            id: new_id(),
            building_id: input.building_id,
            floor_id: input.floor_id,
            unit_id: input.unit_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            cost_type: input.cost_type,
            priority: input.priority,
            status: input.status,
            planned_date: input.planned_date,
            actual_date: input.actual_date,
            completion_date: None,
            estimated_amount: round2(input.estimated_amount),
            actual_amount: input.actual_amount.map(round2),
            variance_amount: None,
            budget_code: clean(input.budget_code),
            is_recurring: input.is_recurring,
            frequency_months: input.frequency_months,
            invoice_number: clean(input.invoice_number),
            notes: clean(input.notes),
            audit: AuditFields::new(actor),
        };
        cost.update_variance();
        Ok(cost)
    }

    pub fn apply(&mut self, changes: CostUpdate, actor: &str) -> Result<(), DomainError> {
        changes.validate()?;
        if changes.floor_id.is_some() {
            self.floor_id = changes.floor_id;
        }
        if changes.unit_id.is_some() {
            self.unit_id = changes.unit_id;
        }
        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(cost_type) = changes.cost_type {
            self.cost_type = cost_type;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(planned_date) = changes.planned_date {
            self.planned_date = planned_date;
        }
        if changes.actual_date.is_some() {
            self.actual_date = changes.actual_date;
        }
        if let Some(estimated) = changes.estimated_amount {
            self.estimated_amount = round2(estimated);
        }
        if let Some(actual) = changes.actual_amount {
            self.actual_amount = Some(round2(actual));
        }
        if changes.budget_code.is_some() {
            self.budget_code = clean(changes.budget_code);
        }
        if let Some(is_recurring) = changes.is_recurring {
            self.is_recurring = is_recurring;
        }
        if changes.frequency_months.is_some() {
            self.frequency_months = changes.frequency_months;
        }
        if changes.invoice_number.is_some() {
            self.invoice_number = clean(changes.invoice_number);
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        self.update_variance();
        self.audit.touch(actor);
        Ok(())
    }

    pub fn is_over_budget(&self) -> bool {
        self.actual_amount
            .is_some_and(|actual| actual > self.estimated_amount)
    }

    pub fn variance_percentage(&self) -> Option<Decimal> {
        self.actual_amount
            .map(|actual| percentage(actual - self.estimated_amount, self.estimated_amount))
    }

    /// Amount used for expense reporting: actual when known, else the estimate.
    pub fn effective_amount(&self) -> Decimal {
        self.actual_amount.unwrap_or(self.estimated_amount)
    }

    pub fn complete(&mut self, completion: CostCompletion, actor: &str) -> Result<(), DomainError> {
        match self.status {
            CostStatus::Completed => {
                return Err(DomainError::rule(
                    "ALREADY_COMPLETED",
                    format!("Cost {} is already completed", self.id),
                ))
            }
            CostStatus::Cancelled => {
                return Err(DomainError::rule(
                    "COST_CANCELLED",
                    format!("Cost {} is cancelled", self.id),
                ))
            }
            _ => {}
        }
        completion.validate()?;

        let completed_at = completion.completion_date.unwrap_or_else(Utc::now);
        self.status = CostStatus::Completed;
        self.actual_amount = Some(round2(completion.actual_amount));
        self.completion_date = Some(completed_at);
        if self.actual_date.is_none() {
            self.actual_date = Some(completed_at);
        }
        self.update_variance();
        self.audit.touch(actor);
        Ok(())
    }

    fn update_variance(&mut self) {
        self.variance_amount = self
            .actual_amount
            .map(|actual| round2(actual - self.estimated_amount));
    }
}

impl_entity!(Cost, "Cost");

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cost(estimated: Decimal) -> Cost {
        Cost::new(
            CostCreate {
                building_id: Uuid::new_v4(),
                floor_id: None,
                unit_id: None,
                title: "Elevator service".into(),
                description: String::new(),
                cost_type: CostType::Maintenance,
                priority: CostPriority::High,
                status: CostStatus::Approved,
                planned_date: Utc::now(),
                actual_date: None,
                estimated_amount: estimated,
                actual_amount: None,
                budget_code: None,
                is_recurring: false,
                frequency_months: None,
                invoice_number: None,
                notes: None,
            },
            "alice",
        )
        .unwrap()
    }

    #[test]
    fn test_variance_tracks_actual_amount() {
        let mut c = cost(dec!(1000));
        assert_eq!(c.variance_amount, None);
        assert_eq!(c.variance_percentage(), None);
        assert!(!c.is_over_budget());

        c.apply(
            CostUpdate {
                actual_amount: Some(dec!(1150)),
                ..Default::default()
            },
            "bob",
        )
        .unwrap();
        assert_eq!(c.variance_amount, Some(dec!(150)));
        assert_eq!(c.variance_percentage(), Some(dec!(15)));
        assert!(c.is_over_budget());
    }

    #[test]
    fn test_complete_once() {
        let mut c = cost(dec!(300));
        c.complete(
            CostCompletion {
                actual_amount: dec!(250),
                completion_date: None,
            },
            "bob",
        )
        .unwrap();
        assert_eq!(c.status, CostStatus::Completed);
        assert_eq!(c.variance_amount, Some(dec!(-50)));
        assert_eq!(c.variance_percentage(), Some(dec!(-16.67)));
        assert!(c.completion_date.is_some());

        let err = c
            .complete(
                CostCompletion {
                    actual_amount: dec!(1),
                    completion_date: None,
                },
                "bob",
            )
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_COMPLETED");
    }

    #[test]
    fn test_cancelled_cost_cannot_complete() {
        let mut c = cost(dec!(300));
        c.status = CostStatus::Cancelled;
        let err = c
            .complete(
                CostCompletion {
                    actual_amount: dec!(1),
                    completion_date: None,
                },
                "bob",
            )
            .unwrap_err();
        assert_eq!(err.code(), "COST_CANCELLED");
    }
}
