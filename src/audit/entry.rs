//! Audit entry data structures
//!
//! Defines the operations recorded when an import writes to the store and the
//! format of a single log line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EntityKind, TenantId};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Record was created
    Create,
    /// Record was overwritten
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_kind: EntityKind,

    /// Full identifier of the affected record
    pub entity_id: String,

    /// Owning tenant, when the record carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Record state before the operation (updates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    /// Record state after the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn create(
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        tenant_id: Option<TenantId>,
        after: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Create,
            entity_kind,
            entity_id: entity_id.into(),
            tenant_id,
            before: None,
            after: Some(after),
        }
    }

    pub fn update(
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        tenant_id: Option<TenantId>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Update,
            entity_kind,
            entity_id: entity_id.into(),
            tenant_id,
            before: Some(before),
            after: Some(after),
        }
    }

    /// One-line human-readable summary
    pub fn format_human_readable(&self) -> String {
        let tenant = self
            .tenant_id
            .map(|t| format!(" tenant={}", t))
            .unwrap_or_default();
        format!(
            "{} {} {} {}{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.entity_kind.entity_name(),
            self.entity_id,
            tenant
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_entry() {
        let entry = AuditEntry::create(
            EntityKind::DeploymentTarget,
            "550e8400-e29b-41d4-a716-446655440000",
            Some(TenantId(3)),
            json!({"name": "edge"}),
        );

        assert_eq!(entry.operation, Operation::Create);
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let entry = AuditEntry::update(
            EntityKind::DeploymentHistory,
            "42",
            None,
            json!({"message": "a"}),
            json!({"message": "b"}),
        );
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["operation"], "update");
        assert_eq!(value["entity_kind"], "deploymentHistory");
        assert!(value.get("tenant_id").is_none());
    }

    #[test]
    fn test_human_readable() {
        let entry = AuditEntry::create(
            EntityKind::DeploymentJob,
            "job-1",
            Some(TenantId(9)),
            json!({}),
        );
        let line = entry.format_human_readable();
        assert!(line.contains("CREATE DeploymentJob job-1 tenant=9"));
    }
}
