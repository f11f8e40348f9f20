use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::AppServices;

pub async fn reconcile(services: &AppServices) -> Result<(), CliError> {
    println!("{}", "Reconciling enrollment progress...".yellow());
    let report = services.admin.reconcile_progress().await?;

    println!("  Scanned:             {}", report.scanned);
    println!("  Progress corrected:  {}", report.progress_fixed);
    println!("  Certificates issued: {}", report.certificates_issued);

    if report.failures.is_empty() {
        println!("{}", "✓ Reconcile finished".green().bold());
        return Ok(());
    }

    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.enrollment_id,
            failure.error.dimmed()
        );
    }
    Err(CliError::CommandError(format!(
        "{} enrollments could not be reconciled",
        report.failures.len()
    )))
}
