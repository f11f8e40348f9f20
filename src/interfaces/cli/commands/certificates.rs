use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::AppServices;
use crate::storage::CertificateStatus;

pub async fn verify_certificate(services: &AppServices, id: &str) -> Result<(), CliError> {
    let record = services.certificates.verify(id).await?;
    let status = match record.status {
        CertificateStatus::Valid => "VALID".green().bold(),
        CertificateStatus::Revoked => "REVOKED".red().bold(),
    };

    println!("{} {}", "Certificate".bold(), record.certificate_id.cyan());
    println!("  Status:     {}", status);
    println!("  Student:    {}", record.student_name);
    println!("  Course:     {}", record.course_title);
    println!("  Instructor: {}", record.instructor_name);
    println!("  Issued at:  {}", record.issued_at.to_rfc3339());
    if let Some(reason) = &record.revoke_reason {
        println!("  Reason:     {}", reason.yellow());
    }
    Ok(())
}

pub async fn revoke_certificate(
    services: &AppServices,
    id: &str,
    reason: &str,
) -> Result<(), CliError> {
    let cert = services.certificates.revoke(id, reason).await?;
    println!("{} Certificate {} revoked", "✓".green().bold(), cert.id.cyan());
    Ok(())
}
