//! Backup display formatting
//!
//! Formats export, import and inspect results for terminal output.

use crate::backup::{EntityCounts, EnvelopeSummary, ExportOutcome, ImportOutcome};
use crate::models::EntityKind;

/// Format per-kind import counters as a table, followed by any warnings
pub fn format_import_results(outcome: &ImportOutcome) -> String {
    let mut output = String::new();

    if outcome.results.is_empty() {
        output.push_str("Backup contained no records.\n");
    } else {
        let kind_width = outcome
            .results
            .iter()
            .map(|r| r.entity_type.collection_name().len())
            .max()
            .unwrap_or(6)
            .max(6);

        output.push_str(&format!(
            "{:<kind_width$}  {:>7}  {:>7}  {:>7}  {:>7}  {:>7}\n",
            "Entity",
            "Total",
            "Created",
            "Updated",
            "Skipped",
            "Failed",
            kind_width = kind_width,
        ));
        output.push_str(&format!(
            "{:-<kind_width$}  {:->7}  {:->7}  {:->7}  {:->7}  {:->7}\n",
            "",
            "",
            "",
            "",
            "",
            "",
            kind_width = kind_width,
        ));

        for result in &outcome.results {
            output.push_str(&format!(
                "{:<kind_width$}  {:>7}  {:>7}  {:>7}  {:>7}  {:>7}\n",
                result.entity_type.collection_name(),
                result.total,
                result.created,
                result.updated,
                result.skipped,
                result.failed,
                kind_width = kind_width,
            ));
        }
    }

    if outcome.cancelled {
        output.push_str("\nImport was cancelled; records applied so far were kept.\n");
    }

    if !outcome.warnings.is_empty() {
        output.push_str(&format!("\nWarnings ({}):\n", outcome.warnings.len()));
        for warning in &outcome.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output
}

/// Format what an export wrote
pub fn format_export_summary(outcome: &ExportOutcome) -> String {
    let mut output = String::new();

    output.push_str(&format!("Module:   {} v{}\n", outcome.module, outcome.version));
    output.push_str(&format!(
        "Exported: {}\n",
        outcome.exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("Scope:    {}\n", scope_label(outcome)));
    output.push_str(&format!("Size:     {} bytes\n", outcome.data.len()));
    output.push('\n');
    output.push_str(&format_counts(&outcome.entity_counts));

    output
}

fn scope_label(outcome: &ExportOutcome) -> String {
    if outcome.full_backup {
        "all tenants (full backup)".to_string()
    } else {
        format!("tenant {}", outcome.tenant_id)
    }
}

/// Format the contents of an envelope
pub fn format_envelope_summary(summary: &EnvelopeSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Module:     {}\n", summary.module));
    output.push_str(&format!("Version:    {}\n", summary.version));
    output.push_str(&format!(
        "Exported:   {}\n",
        summary.exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("Tenant:     {}\n", summary.tenant_id));
    output.push_str(&format!(
        "Full:       {}\n",
        if summary.full_backup { "Yes" } else { "No" }
    ));
    output.push_str(&format!(
        "Compatible: {}\n",
        if summary.compatible { "Yes" } else { "No" }
    ));
    output.push('\n');
    output.push_str(&format_counts(&summary.entity_counts));

    output
}

/// One line per entity kind, in dependency order
fn format_counts(counts: &EntityCounts) -> String {
    let mut output = String::from("Records:\n");
    for kind in EntityKind::DEPENDENCY_ORDER {
        output.push_str(&format!(
            "  {:<22}{}\n",
            kind.collection_name(),
            counts.get(&kind).copied().unwrap_or(0)
        ));
    }
    output
}
