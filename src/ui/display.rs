//! End-of-run summary
//!
//! Completed components are listed with their notes, then the failure
//! (if any) and the components it caused to be skipped.

use console::Style;

use crate::orchestrator::RunReport;

/// Print the run summary to stdout
pub fn display_report(report: &RunReport) {
    if report.completed.is_empty() && report.failed.is_none() && report.skipped.is_empty() {
        println!("No components configured");
        return;
    }

    for done in &report.completed {
        println!(
            "{} {}",
            Style::new().green().bold().apply_to("✓"),
            Style::new().bold().apply_to(&done.name)
        );
        for note in &done.notes {
            println!("    {}", Style::new().dim().apply_to(note));
        }
    }

    if let Some(failed) = &report.failed {
        let phase = failed
            .phase
            .as_deref()
            .map(|phase| format!(" during {phase}"))
            .unwrap_or_default();
        println!(
            "{} {}{}",
            Style::new().red().bold().apply_to("✗"),
            Style::new().bold().apply_to(&failed.component),
            Style::new().red().apply_to(phase)
        );
    }

    for name in &report.skipped {
        println!(
            "{} {} {}",
            Style::new().yellow().apply_to("-"),
            name,
            Style::new().dim().apply_to("(skipped)")
        );
    }

    println!();
    println!("{}", summary_line(report));
}

fn summary_line(report: &RunReport) -> String {
    let mut parts = vec![format!("{} completed", report.completed.len())];
    if report.failed.is_some() {
        parts.push("1 failed".to_string());
    }
    if !report.skipped.is_empty() {
        parts.push(format!("{} skipped", report.skipped.len()));
    }
    let line = format!("{}: {}", report.action, parts.join(", "));
    if report.success() {
        Style::new().green().apply_to(line).to_string()
    } else {
        Style::new().red().apply_to(line).to_string()
    }
}
