//! `check` subcommand: scan the database for tree inconsistencies.

use crate::db::Database;
use crate::integrity::{CheckReport, check_database};
use anyhow::{Result, bail};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Render a report for humans.
pub fn render(report: &CheckReport) -> String {
    let mut out = format!("Checked {} tasks: ", report.tasks);
    if report.is_clean() {
        out.push_str("no issues found\n");
        return out;
    }
    out.push_str(&format!("{} issue(s)\n", report.issues.len()));
    for issue in &report.issues {
        out.push_str(&format!("  {}\n", issue));
    }
    out
}

/// Run the check against the database at `db_path`.
///
/// Fails if any issue is found so scripts can rely on the exit status.
pub fn run_check(db_path: &Path, args: &CheckArgs) -> Result<()> {
    if !db_path.exists() {
        bail!("database not found: {}", db_path.display());
    }
    let db = Database::open(db_path)?;
    let report = check_database(&db)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }

    if !report.is_clean() {
        bail!("{} tree issue(s) found", report.issues.len());
    }
    Ok(())
}
