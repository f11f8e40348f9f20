//! 进度校正、证书手动签发与撤销

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;

use crate::api::middleware::AdminUser;
use crate::api::services::TS_EXPORT_PATH;
use crate::api::services::helpers::{created_response, success_response};
use crate::api::services::types::ReasonRequest;
use crate::errors::LmsError;
use crate::services::{AdminService, CertificateService};

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct IssueCertificateRequest {
    pub enrollment_id: String,
}

pub async fn reconcile(
    actor: AdminUser,
    admin: web::Data<AdminService>,
) -> Result<HttpResponse, LmsError> {
    info!("Admin API: progress reconcile requested by {}", actor.id);
    Ok(success_response(admin.reconcile_progress().await?))
}

pub async fn issue_certificate(
    _admin: AdminUser,
    admin: web::Data<AdminService>,
    body: web::Json<IssueCertificateRequest>,
) -> Result<HttpResponse, LmsError> {
    let cert = admin.issue_certificate(&body.enrollment_id).await?;
    Ok(created_response(cert))
}

pub async fn revoke_certificate(
    actor: AdminUser,
    certificates: web::Data<CertificateService>,
    path: web::Path<String>,
    body: web::Json<ReasonRequest>,
) -> Result<HttpResponse, LmsError> {
    let cert = certificates.revoke(&path, &body.reason).await?;
    info!("Admin API: certificate {} revoked by {}", cert.id, actor.id);
    Ok(success_response(cert))
}
