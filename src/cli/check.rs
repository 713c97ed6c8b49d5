//! Check command - audit the index for structural violations

use anyhow::Result;
use console::style;

use super::IndexTarget;

pub fn run(target: &IndexTarget) -> Result<()> {
    let index = target.open_existing()?;
    let report = index.check_integrity()?;

    println!(
        "Checked {} commits ({} stubs) and {} file changes",
        style(report.commits_checked).cyan(),
        report.stubs,
        style(report.changes_checked).cyan()
    );

    if report.is_ok() {
        println!("  {} No violations", style("[OK]").green());
        return Ok(());
    }

    for violation in &report.violations {
        println!("  {} {}", style("[!!]").red(), violation);
    }
    anyhow::bail!(
        "{} integrity violation{} found",
        report.violations.len(),
        if report.violations.len() == 1 { "" } else { "s" }
    )
}
