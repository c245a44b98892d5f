use anyhow::Result;
use clap::{Parser, Subcommand};

use deployer_backup::backup::{CallerIdentity, BACKUP_MODULE, BACKUP_VERSION};
use deployer_backup::audit::AuditLogger;
use deployer_backup::cli::{handle_audit_command, handle_backup_command, AuditArgs, BackupCommands};
use deployer_backup::config::{paths::DeployerPaths, settings::Settings};
use deployer_backup::models::TenantId;
use deployer_backup::storage::Storage;

#[derive(Parser)]
#[command(
    name = "deployer-backup",
    version,
    about = "Tenant-aware backup and restore for certificate deployment configuration",
    long_about = "deployer-backup exports deployment targets, target configurations, \
                  deployment jobs and deployment history into a versioned backup file, \
                  and restores such files tenant by tenant or, for platform \
                  administrators, across every tenant."
)]
struct Cli {
    /// Tenant the caller acts as
    #[arg(long, global = true, env = "DEPLOYER_CALLER_TENANT", default_value_t = 0)]
    caller_tenant: u32,

    /// Act as a platform administrator
    #[arg(long, global = true)]
    platform_admin: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Show restore operations recorded in the audit log
    Audit(AuditArgs),

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = DeployerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let caller = CallerIdentity {
        tenant_id: TenantId(cli.caller_tenant),
        platform_admin: cli.platform_admin,
    };

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            let mut storage = Storage::new(paths)?;
            if settings.audit_imports {
                storage = storage.with_audit_log();
            }
            storage.load_all()?;

            handle_backup_command(&storage, &settings, &caller, cmd)?;
        }
        Some(Commands::Audit(args)) => {
            let logger = AuditLogger::new(paths.audit_log());
            handle_audit_command(&logger, &caller, args)?;
        }
        Some(Commands::Config) => {
            println!("deployer-backup Configuration");
            println!("=============================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Data directory: {}", paths.data_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Audit log:      {}", paths.audit_log().display());
            println!();
            println!("Backup format:  {} v{}", BACKUP_MODULE, BACKUP_VERSION);
            println!();
            println!("Settings:");
            println!("  Default merge mode: {}", settings.default_merge_mode);
            println!("  Pretty export:      {}", settings.pretty_export);
            println!("  Audit imports:      {}", settings.audit_imports);
            println!("  Log filter:         {}", settings.log_filter);
        }
        None => {
            println!("deployer-backup - Tenant-aware backup and restore");
            println!();
            println!("Run 'deployer-backup --help' for usage information.");
        }
    }

    Ok(())
}
