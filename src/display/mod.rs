//! Display formatting for terminal output
//!
//! Provides aligned-text tables and summaries for backup results.

pub mod backup;

pub use backup::{format_envelope_summary, format_export_summary, format_import_results};
