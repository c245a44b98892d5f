//! Strongly-typed ID wrappers for all entity types
//!
//! Using newtype wrappers prevents accidentally mixing up IDs from different
//! entity types at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate UUID-backed ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an ID from a string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return Ok(Self(uuid));
                }
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(DeploymentTargetId, "tgt-");
define_id!(TargetConfigurationId, "cfg-");
define_id!(DeploymentJobId, "job-");

/// Sequential identifier of a deployment history row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentHistoryId(pub u64);

impl fmt::Display for DeploymentHistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant identifier
///
/// Tenant `0` is the platform itself; on export it selects every tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TenantId(pub u32);

impl TenantId {
    /// The platform tenant
    pub const PLATFORM: TenantId = TenantId(0);

    pub fn is_platform(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TenantId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        let id = DeploymentTargetId::new();
        let display = format!("{}", id);
        assert!(display.starts_with("tgt-"));
        assert_eq!(display.len(), 12);
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = DeploymentJobId::parse(uuid_str).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid_str));
    }

    #[test]
    fn test_id_from_str_with_prefix() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: TargetConfigurationId = format!("cfg-{}", uuid_str).parse().unwrap();
        assert_eq!(id.as_uuid().to_string(), uuid_str);
    }

    #[test]
    fn test_tenant_id() {
        assert!(TenantId::PLATFORM.is_platform());
        assert!(!TenantId(7).is_platform());
        assert_eq!(serde_json::to_string(&TenantId(7)).unwrap(), "7");
    }

    #[test]
    fn test_history_id_is_numeric() {
        let id: DeploymentHistoryId = serde_json::from_str("42").unwrap();
        assert_eq!(id, DeploymentHistoryId(42));
        assert_eq!(id.to_string(), "42");
    }
}
