//! Audit log command

use clap::Args;

use crate::audit::AuditLogger;
use crate::backup::CallerIdentity;
use crate::error::DeployerResult;

/// Show restore operations recorded in the audit log
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Show only the most recent entries
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

/// Handle the audit command
///
/// Platform admins see every entry; other callers see their own tenant's.
pub fn handle_audit_command(
    logger: &AuditLogger,
    caller: &CallerIdentity,
    args: AuditArgs,
) -> DeployerResult<()> {
    let entries = if caller.platform_admin {
        logger.read_all()?
    } else {
        logger.read_for_tenant(caller.tenant_id)?
    };

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    let skip = args
        .limit
        .map_or(0, |limit| entries.len().saturating_sub(limit));
    for entry in entries.iter().skip(skip) {
        println!("{}", entry.format_human_readable());
    }

    Ok(())
}
