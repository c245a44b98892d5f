//! Restore authorization
//!
//! Runs once per import before any record is touched: decode, module and
//! version gating, full-backup permission, and the tenant the records land in.

use tracing::debug;

use crate::error::{DeployerError, DeployerResult};
use crate::models::TenantId;

use super::envelope::BackupEnvelope;
use super::{BACKUP_MODULE, BACKUP_VERSION};

/// Who is calling, as established by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub tenant_id: TenantId,
    pub platform_admin: bool,
}

impl CallerIdentity {
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            platform_admin: false,
        }
    }

    pub fn platform_admin(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            platform_admin: true,
        }
    }
}

/// Tenant that restored records are written under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreScope {
    /// Full restore: each record keeps the tenant embedded in it
    RecordTenants,
    /// Every record is forced into this tenant
    Tenant(TenantId),
}

impl RestoreScope {
    /// Tenant for a record whose embedded tenant is `embedded`
    ///
    /// Records without a tenant in a full restore fall back to the platform
    /// tenant.
    pub fn resolve_tenant(&self, embedded: Option<TenantId>) -> TenantId {
        match self {
            Self::RecordTenants => embedded.unwrap_or(TenantId::PLATFORM),
            Self::Tenant(tenant) => *tenant,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::RecordTenants)
    }
}

/// An envelope that passed every structural check
#[derive(Debug)]
pub struct AuthorizedRestore {
    pub envelope: BackupEnvelope,
    pub scope: RestoreScope,
}

pub struct RestoreAuthorizer {
    caller: CallerIdentity,
}

impl RestoreAuthorizer {
    pub fn new(caller: CallerIdentity) -> Self {
        Self { caller }
    }

    /// Decode and gate an envelope
    ///
    /// Every error returned here is structural: nothing has been written.
    pub fn authorize(&self, bytes: &[u8]) -> DeployerResult<AuthorizedRestore> {
        let envelope = BackupEnvelope::decode(bytes)?;

        if envelope.module != BACKUP_MODULE {
            return Err(DeployerError::ModuleMismatch {
                expected: BACKUP_MODULE.to_string(),
                found: envelope.module,
            });
        }
        if envelope.version != BACKUP_VERSION {
            return Err(DeployerError::VersionMismatch {
                expected: BACKUP_VERSION.to_string(),
                found: envelope.version,
            });
        }

        let scope = if envelope.full_backup {
            if !self.caller.platform_admin {
                return Err(DeployerError::Forbidden(
                    "only platform administrators can restore full backups".into(),
                ));
            }
            RestoreScope::RecordTenants
        } else {
            RestoreScope::Tenant(self.caller.tenant_id)
        };

        debug!(
            caller = %self.caller.tenant_id,
            envelope_tenant = %envelope.tenant_id,
            ?scope,
            "authorized restore"
        );
        Ok(AuthorizedRestore { envelope, scope })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::envelope::BackupEntities;

    fn encoded(module: &str, version: &str, tenant: u32, full: bool) -> Vec<u8> {
        let mut envelope = BackupEnvelope::new(TenantId(tenant), full, BackupEntities::default());
        envelope.module = module.into();
        envelope.version = version.into();
        envelope.encode(false).unwrap()
    }

    #[test]
    fn test_tenant_backup_forced_to_caller() {
        let authorizer = RestoreAuthorizer::new(CallerIdentity::tenant(TenantId(3)));
        let restore = authorizer
            .authorize(&encoded("deployer", "1.0", 8, false))
            .unwrap();

        assert_eq!(restore.scope, RestoreScope::Tenant(TenantId(3)));
        assert_eq!(restore.scope.resolve_tenant(Some(TenantId(8))), TenantId(3));
    }

    #[test]
    fn test_admin_tenant_backup_still_forced_to_caller() {
        let authorizer = RestoreAuthorizer::new(CallerIdentity::platform_admin(TenantId(1)));
        let restore = authorizer
            .authorize(&encoded("deployer", "1.0", 8, false))
            .unwrap();
        assert_eq!(restore.scope, RestoreScope::Tenant(TenantId(1)));
    }

    #[test]
    fn test_full_backup_requires_admin() {
        let bytes = encoded("deployer", "1.0", 0, true);

        let err = RestoreAuthorizer::new(CallerIdentity::tenant(TenantId(3)))
            .authorize(&bytes)
            .unwrap_err();
        assert!(matches!(err, DeployerError::Forbidden(_)));

        let restore = RestoreAuthorizer::new(CallerIdentity::platform_admin(TenantId(0)))
            .authorize(&bytes)
            .unwrap();
        assert!(restore.scope.is_full());
        assert_eq!(restore.scope.resolve_tenant(Some(TenantId(5))), TenantId(5));
        assert_eq!(restore.scope.resolve_tenant(None), TenantId(0));
    }

    #[test]
    fn test_module_checked_before_version() {
        let authorizer = RestoreAuthorizer::new(CallerIdentity::platform_admin(TenantId(0)));

        let err = authorizer
            .authorize(&encoded("lcm", "9.9", 0, true))
            .unwrap_err();
        assert!(matches!(err, DeployerError::ModuleMismatch { .. }));

        let err = authorizer
            .authorize(&encoded("deployer", "9.9", 0, true))
            .unwrap_err();
        match err {
            DeployerError::VersionMismatch { expected, found } => {
                assert_eq!(expected, "1.0");
                assert_eq!(found, "9.9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_version_checked_before_permission() {
        let err = RestoreAuthorizer::new(CallerIdentity::tenant(TenantId(3)))
            .authorize(&encoded("deployer", "0.9", 0, true))
            .unwrap_err();
        assert!(matches!(err, DeployerError::VersionMismatch { .. }));
    }

    #[test]
    fn test_malformed_envelope() {
        let err = RestoreAuthorizer::new(CallerIdentity::tenant(TenantId(3)))
            .authorize(b"[1, 2, 3]")
            .unwrap_err();
        assert!(matches!(err, DeployerError::MalformedEnvelope(_)));
        assert!(err.is_structural());
    }
}
