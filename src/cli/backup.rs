//! Backup CLI commands
//!
//! Implements the export, import and inspect commands.

use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::backup::{BackupService, CallerIdentity, MergeMode};
use crate::config::settings::Settings;
use crate::display::backup::{format_envelope_summary, format_export_summary, format_import_results};
use crate::error::{DeployerError, DeployerResult};
use crate::models::TenantId;
use crate::storage::{write_atomic, Storage};

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Export a backup of the caller's tenant (or, for platform admins, any tenant)
    Export {
        /// Tenant to export; 0 exports every tenant (platform admins only)
        #[arg(short, long)]
        tenant: Option<u32>,

        /// Output file path (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON instead of indented JSON
        #[arg(long)]
        compact: bool,
    },

    /// Restore a backup file
    Import {
        /// Backup file path
        file: PathBuf,

        /// How to handle records that already exist
        #[arg(short, long, value_enum)]
        mode: Option<MergeMode>,
    },

    /// Show what a backup file contains without restoring it
    Inspect {
        /// Backup file path
        file: PathBuf,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    caller: &CallerIdentity,
    cmd: BackupCommands,
) -> DeployerResult<()> {
    match cmd {
        BackupCommands::Export {
            tenant,
            output,
            compact,
        } => {
            let pretty = settings.pretty_export && !compact;
            let service = BackupService::new(storage).with_pretty(pretty);
            let outcome = service.export_backup(caller, tenant.map(TenantId))?;

            match output {
                Some(path) => {
                    write_atomic(&path, &outcome.data)?;
                    println!("Backup written to {}", path.display());
                    println!();
                    print!("{}", format_export_summary(&outcome));
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&outcome.data)?;
                    stdout.write_all(b"\n")?;
                    stdout.flush()?;
                }
            }
        }

        BackupCommands::Import { file, mode } => {
            let data = read_backup_file(&file)?;
            let mode = mode.unwrap_or(settings.default_merge_mode);

            let service = BackupService::new(storage);
            let outcome = service.import_backup(caller, &data, mode)?;

            println!("Restored {} (mode: {})", file.display(), mode);
            println!();
            print!("{}", format_import_results(&outcome));
        }

        BackupCommands::Inspect { file } => {
            let data = read_backup_file(&file)?;
            let summary = BackupService::new(storage).inspect_backup(&data)?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", file.display());
            print!("{}", format_envelope_summary(&summary));

            if !summary.compatible {
                println!();
                println!("This backup cannot be restored by this version.");
            }
        }
    }

    Ok(())
}

fn read_backup_file(path: &Path) -> DeployerResult<Vec<u8>> {
    if !path.exists() {
        return Err(DeployerError::not_found("Backup file", path.display().to_string()));
    }
    std::fs::read(path).map_err(|e| DeployerError::Io(format!("read {}: {}", path.display(), e)))
}
