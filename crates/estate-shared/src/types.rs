//! Common types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub type EntityId = Uuid;

pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

/// Offset pagination as accepted by every list endpoint (`?skip=&limit=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }.normalized()
    }

    /// Clamp `limit` into `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Everything, used by aggregations that need the full set.
    pub fn unbounded() -> Self {
        Self { skip: 0, limit: u32::MAX }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.skip)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Audit and soft-delete block carried by every persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl Default for AuditFields {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            created_by: None,
            updated_at: now,
            updated_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

impl AuditFields {
    pub fn new(actor: &str) -> Self {
        Self {
            created_by: Some(actor.to_string()),
            updated_by: Some(actor.to_string()),
            ..Self::default()
        }
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = Some(actor.to_string());
    }

    pub fn mark_deleted(&mut self, actor: &str) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = Some(actor.to_string());
        self.updated_at = now;
        self.updated_by = Some(actor.to_string());
    }

    pub fn restore(&mut self, actor: &str) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
        self.touch(actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps_limit() {
        assert_eq!(Pagination::new(5, 0).limit, 1);
        assert_eq!(Pagination::new(5, 50_000).limit, MAX_PAGE_SIZE);
        assert_eq!(Pagination::default().limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut audit = AuditFields::new("alice");
        assert!(!audit.is_deleted);

        audit.mark_deleted("bob");
        assert!(audit.is_deleted);
        assert!(audit.deleted_at.is_some());
        assert_eq!(audit.deleted_by.as_deref(), Some("bob"));

        audit.restore("carol");
        assert!(!audit.is_deleted);
        assert!(audit.deleted_at.is_none());
        assert!(audit.deleted_by.is_none());
        assert_eq!(audit.updated_by.as_deref(), Some("carol"));
        assert_eq!(audit.created_by.as_deref(), Some("alice"));
    }
}
