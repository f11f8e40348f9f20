//! 证书记录表操作

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};
use tracing::info;

use super::{SeaOrmStorage, is_unique_violation, model_to_certificate};
use crate::errors::{LmsError, Result};
use crate::storage::models::{Certificate, CertificateStatus};

use migration::entities::certificate;

impl SeaOrmStorage {
    /// 写入证书记录。同一 enrollment 已有证书时返回 Conflict
    pub async fn insert_certificate(&self, cert: &Certificate) -> Result<Certificate> {
        let inserted = certificate::ActiveModel {
            id: Set(cert.id.clone()),
            user_id: Set(cert.user_id.clone()),
            course_id: Set(cert.course_id.clone()),
            enrollment_id: Set(cert.enrollment_id.clone()),
            student_name: Set(cert.student_name.clone()),
            course_title: Set(cert.course_title.clone()),
            instructor_name: Set(cert.instructor_name.clone()),
            blob_key: Set(cert.blob_key.clone()),
            pdf_url: Set(cert.pdf_url.clone()),
            status: Set(cert.status.to_string()),
            issued_at: Set(cert.issued_at),
            revoked_at: Set(cert.revoked_at),
            revoke_reason: Set(cert.revoke_reason.clone()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LmsError::conflict("Certificate already issued for this enrollment")
            } else {
                LmsError::from(e)
            }
        })?;

        info!(
            "Certificate recorded: {} (enrollment {})",
            inserted.id, inserted.enrollment_id
        );
        Ok(model_to_certificate(inserted))
    }

    pub async fn find_certificate(&self, id: &str) -> Result<Option<Certificate>> {
        let db = &self.db;
        let model = self
            .retrying("find_certificate", || async {
                certificate::Entity::find_by_id(id).one(db).await
            })
            .await?;
        Ok(model.map(model_to_certificate))
    }

    pub async fn find_certificate_by_enrollment(
        &self,
        enrollment_id: &str,
    ) -> Result<Option<Certificate>> {
        let model = certificate::Entity::find()
            .filter(certificate::Column::EnrollmentId.eq(enrollment_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_certificate))
    }

    pub async fn list_certificates_by_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let models = certificate::Entity::find()
            .filter(certificate::Column::UserId.eq(user_id))
            .order_by_desc(certificate::Column::IssuedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_certificate).collect())
    }

    /// 吊销证书；已吊销返回 Conflict
    pub async fn revoke_certificate(&self, id: &str, reason: &str) -> Result<Certificate> {
        let now = Utc::now();
        let result = certificate::Entity::update_many()
            .col_expr(
                certificate::Column::Status,
                Expr::val(CertificateStatus::Revoked.to_string()),
            )
            .col_expr(certificate::Column::RevokedAt, Expr::val(Some(now)))
            .col_expr(
                certificate::Column::RevokeReason,
                Expr::val(Some(reason.to_string())),
            )
            .filter(certificate::Column::Id.eq(id))
            .filter(certificate::Column::Status.eq(CertificateStatus::Valid.to_string()))
            .exec(&self.db)
            .await?;

        let current = self
            .find_certificate(id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Certificate not found: {}", id)))?;

        if result.rows_affected == 0 {
            return Err(LmsError::conflict(format!(
                "Certificate already revoked: {}",
                id
            )));
        }

        info!("Certificate revoked: {} ({})", id, reason);
        Ok(current)
    }
}
