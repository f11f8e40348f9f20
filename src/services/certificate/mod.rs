//! 证书流水线
//!
//! 已完成的选课 → 渲染 PDF（含验证二维码）→ 上传 Blob → 写证书记录 → 关联选课。
//! 线性执行，不做流水线级重试；记录写入失败时删除已上传的文件。

pub mod blob;
pub mod pdf;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use ts_rs::TS;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::{AuthUser, NotificationService};
use crate::storage::{Certificate, CertificateStatus, NotificationKind, SeaOrmStorage};
use crate::utils::generate_upper_code;

pub use blob::{BlobStore, HttpBlobStore, LocalBlobStore, MemoryBlobStore, create_blob_store};
pub use pdf::{CertificateDocument, render_certificate};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// 公开验证结果
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CertificateVerification {
    pub certificate_id: String,
    pub valid: bool,
    pub status: CertificateStatus,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: chrono::DateTime<Utc>,
    pub pdf_url: String,
    pub revoked_at: Option<chrono::DateTime<Utc>>,
    pub revoke_reason: Option<String>,
}

impl From<Certificate> for CertificateVerification {
    fn from(cert: Certificate) -> Self {
        Self {
            valid: cert.status == CertificateStatus::Valid,
            certificate_id: cert.id,
            status: cert.status,
            student_name: cert.student_name,
            course_title: cert.course_title,
            instructor_name: cert.instructor_name,
            issued_at: cert.issued_at,
            pdf_url: cert.pdf_url,
            revoked_at: cert.revoked_at,
            revoke_reason: cert.revoke_reason,
        }
    }
}

/// 证书编号：`LH-YYYYMMDD-XXXXXXXX`
pub fn generate_certificate_id(at: chrono::DateTime<Utc>) -> String {
    format!("LH-{}-{}", at.format("%Y%m%d"), generate_upper_code(8))
}

pub fn blob_key_for(certificate_id: &str) -> String {
    format!("certificates/{}.pdf", certificate_id)
}

pub struct CertificateService {
    storage: Arc<SeaOrmStorage>,
    blobs: Arc<dyn BlobStore>,
    notifications: Arc<NotificationService>,
    verify_base_url: String,
    issuer_name: String,
}

impl CertificateService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        blobs: Arc<dyn BlobStore>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        let config = crate::config::get_config();
        Self {
            storage,
            blobs,
            notifications,
            verify_base_url: config.certificates.verify_base_url.clone(),
            issuer_name: config.certificates.issuer_name.clone(),
        }
    }

    pub fn blob_store_name(&self) -> &'static str {
        self.blobs.name()
    }

    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/{}",
            self.verify_base_url.trim_end_matches('/'),
            certificate_id
        )
    }

    /// 为已完成的选课签发证书；已签发则直接返回已有证书
    pub async fn issue_for_enrollment(&self, enrollment_id: &str) -> Result<Certificate> {
        let enrollment = self
            .storage
            .find_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Enrollment not found: {}", enrollment_id)))?;

        if let Some(existing) = self
            .storage
            .find_certificate_by_enrollment(enrollment_id)
            .await?
        {
            if enrollment.certificate_id.as_deref() != Some(existing.id.as_str()) {
                self.storage
                    .set_enrollment_certificate(enrollment_id, &existing.id)
                    .await?;
            }
            return Ok(existing);
        }

        if enrollment.completion_percentage < 100 {
            return Err(LmsError::validation(format!(
                "Course not completed yet ({}%)",
                enrollment.completion_percentage
            )));
        }

        let student = self
            .storage
            .find_user(&enrollment.user_id)
            .await?
            .ok_or_else(|| LmsError::not_found("Student not found"))?;
        let course = self
            .storage
            .find_course(&enrollment.course_id)
            .await?
            .ok_or_else(|| LmsError::not_found("Course not found"))?;
        let instructor_name = self
            .storage
            .find_user(&course.instructor_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| self.issuer_name.clone());

        let issued_at = Utc::now();
        let certificate_id = generate_certificate_id(issued_at);
        let document = CertificateDocument {
            certificate_id: certificate_id.clone(),
            student_name: student.name.clone(),
            course_title: course.title.clone(),
            instructor_name: instructor_name.clone(),
            issuer_name: self.issuer_name.clone(),
            issued_at,
            verification_url: self.verification_url(&certificate_id),
        };

        // 1. 渲染
        let pdf = render_certificate(&document)?;

        // 2. 上传
        let blob_key = blob_key_for(&certificate_id);
        let pdf_url = self
            .blobs
            .put(&blob_key, Bytes::from(pdf), PDF_CONTENT_TYPE)
            .await?;

        // 3. 写记录，失败则回收已上传文件
        let record = Certificate {
            id: certificate_id.clone(),
            user_id: student.id.clone(),
            course_id: course.id.clone(),
            enrollment_id: enrollment.id.clone(),
            student_name: student.name,
            course_title: course.title.clone(),
            instructor_name,
            blob_key: blob_key.clone(),
            pdf_url,
            status: CertificateStatus::Valid,
            issued_at,
            revoked_at: None,
            revoke_reason: None,
        };

        let certificate = match self.storage.insert_certificate(&record).await {
            Ok(cert) => cert,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&blob_key).await {
                    warn!("Failed to remove orphaned blob {}: {}", blob_key, cleanup);
                }
                // 并发签发：另一个请求已写入
                if matches!(e, LmsError::Conflict(_))
                    && let Some(existing) = self
                        .storage
                        .find_certificate_by_enrollment(enrollment_id)
                        .await?
                {
                    return Ok(existing);
                }
                error!("Certificate record for {} failed: {}", enrollment_id, e);
                return Err(e);
            }
        };

        // 4. 关联选课
        self.storage
            .set_enrollment_certificate(&enrollment.id, &certificate.id)
            .await?;

        info!(
            "Certificate {} issued to {} for course {}",
            certificate.id, certificate.user_id, certificate.course_id
        );

        self.notifications
            .notify(
                &certificate.user_id,
                NotificationKind::Certificate,
                "Your certificate is ready",
                format!(
                    "Certificate {} for \"{}\" has been issued.",
                    certificate.id, course.title
                ),
            )
            .await;

        Ok(certificate)
    }

    pub async fn verify(&self, certificate_id: &str) -> Result<CertificateVerification> {
        let cert = self.find(certificate_id).await?;
        Ok(cert.into())
    }

    pub async fn list_mine(&self, user_id: &str) -> Result<Vec<Certificate>> {
        self.storage.list_certificates_by_user(user_id).await
    }

    /// 下载 PDF，仅证书持有人或管理员
    pub async fn download(
        &self,
        certificate_id: &str,
        actor: &AuthUser,
    ) -> Result<(Certificate, Bytes)> {
        let cert = self.find(certificate_id).await?;
        if cert.user_id != actor.id && !actor.is_admin() {
            return Err(LmsError::forbidden("Not your certificate"));
        }
        let data = self.blobs.get(&cert.blob_key).await?;
        Ok((cert, data))
    }

    /// `/files/{key}` 公开访问：只提供仍然有效的证书 PDF
    pub async fn public_file(&self, key: &str) -> Result<Bytes> {
        let not_found = || LmsError::not_found(format!("File not found: {}", key));
        let id = key
            .strip_prefix("certificates/")
            .and_then(|k| k.strip_suffix(".pdf"))
            .ok_or_else(not_found)?;
        let cert = self.find(id).await.map_err(|_| not_found())?;
        if cert.status == CertificateStatus::Revoked || cert.blob_key != key {
            return Err(not_found());
        }
        self.blobs.get(key).await
    }

    pub async fn revoke(&self, certificate_id: &str, reason: &str) -> Result<Certificate> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LmsError::validation("Revoke reason is required"));
        }
        self.storage.revoke_certificate(certificate_id, reason).await
    }

    async fn find(&self, certificate_id: &str) -> Result<Certificate> {
        self.storage
            .find_certificate(certificate_id)
            .await?
            .ok_or_else(|| {
                LmsError::not_found(format!("Certificate not found: {}", certificate_id))
            })
    }
}
