//! 证书 API
//!
//! - `/api/certificates/...`：登录用户的证书列表与下载、公开验证
//! - `/verify/{id}`、`/files/{key}`：二维码与 PDF 链接指向的公开入口

use actix_web::http::header::{CONTENT_DISPOSITION, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};

use crate::errors::LmsError;
use crate::services::certificate::PDF_CONTENT_TYPE;
use crate::services::{AuthUser, CertificateService};

use super::helpers::success_response;

pub async fn list_my_certificates(
    user: AuthUser,
    certificates: web::Data<CertificateService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(certificates.list_mine(&user.id).await?))
}

/// 公开验证，撤销的证书也返回（带撤销原因）
pub async fn verify_certificate(
    certificates: web::Data<CertificateService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(certificates.verify(&path).await?))
}

fn pdf_response(filename: String, data: bytes::Bytes) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(PDF_CONTENT_TYPE)
        .insert_header((
            CONTENT_DISPOSITION,
            ContentDisposition {
                disposition: DispositionType::Inline,
                parameters: vec![DispositionParam::Filename(filename)],
            },
        ))
        .body(data)
}

pub async fn download_certificate(
    user: AuthUser,
    certificates: web::Data<CertificateService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    let (cert, data) = certificates.download(&path, &user).await?;
    Ok(pdf_response(format!("{}.pdf", cert.id), data))
}

pub async fn serve_certificate_file(
    certificates: web::Data<CertificateService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    let key = path.into_inner();
    let data = certificates.public_file(&key).await?;
    let filename = key.rsplit('/').next().unwrap_or("certificate.pdf").to_string();
    Ok(pdf_response(filename, data))
}

/// 证书路由 `/certificates`
pub fn certificates_routes() -> actix_web::Scope {
    web::scope("/certificates")
        .route("", web::get().to(list_my_certificates))
        .route("/{id}/verify", web::get().to(verify_certificate))
        .route("/{id}/download", web::get().to(download_certificate))
}

/// 站点根路径下的公开入口
pub fn public_certificate_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/verify/{id}", web::get().to(verify_certificate))
        .route("/files/{key:.*}", web::get().to(serve_certificate_file));
}
