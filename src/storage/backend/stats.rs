//! 仪表盘统计查询

use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use ts_rs::TS;

use super::SeaOrmStorage;
use crate::api::services::TS_EXPORT_PATH;
use crate::errors::Result;
use crate::storage::models::{CertificateStatus, EnrollmentStatus, PaymentStatus, Role};

use migration::entities::{certificate, course, enrollment, payment, user};

/// 平台级计数
#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PlatformCounts {
    pub students: u64,
    pub instructors: u64,
    pub admins: u64,
    pub courses_total: u64,
    pub courses_published: u64,
    pub enrollments_total: u64,
    pub enrollments_completed: u64,
    pub certificates_valid: u64,
    pub certificates_revoked: u64,
    #[ts(type = "number")]
    pub revenue_cents: i64,
}

/// 单门课程的已支付收入
#[derive(Debug, Clone, Default)]
pub struct CourseRevenue {
    pub paid_orders: u64,
    pub revenue_cents: i64,
}

impl SeaOrmStorage {
    async fn count_users_with_role(&self, role: Role) -> Result<u64> {
        Ok(user::Entity::find()
            .filter(user::Column::Role.eq(role.to_string()))
            .count(&self.db)
            .await?)
    }

    pub async fn platform_counts(&self) -> Result<PlatformCounts> {
        let db = &self.db;

        let courses_total = course::Entity::find().count(db).await?;
        let courses_published = course::Entity::find()
            .filter(course::Column::IsPublished.eq(true))
            .count(db)
            .await?;

        let enrollments_total = enrollment::Entity::find().count(db).await?;
        let enrollments_completed = enrollment::Entity::find()
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Completed.to_string()))
            .count(db)
            .await?;

        let certificates_valid = certificate::Entity::find()
            .filter(certificate::Column::Status.eq(CertificateStatus::Valid.to_string()))
            .count(db)
            .await?;
        let certificates_revoked = certificate::Entity::find()
            .filter(certificate::Column::Status.eq(CertificateStatus::Revoked.to_string()))
            .count(db)
            .await?;

        let revenue_cents = self.paid_amounts().await?.into_iter().sum();

        Ok(PlatformCounts {
            students: self.count_users_with_role(Role::Student).await?,
            instructors: self.count_users_with_role(Role::Instructor).await?,
            admins: self.count_users_with_role(Role::Admin).await?,
            courses_total,
            courses_published,
            enrollments_total,
            enrollments_completed,
            certificates_valid,
            certificates_revoked,
            revenue_cents,
        })
    }

    /// 已支付订单金额列表（求和在内存完成）
    async fn paid_amounts(&self) -> Result<Vec<i64>> {
        Ok(payment::Entity::find()
            .select_only()
            .column(payment::Column::AmountCents)
            .filter(payment::Column::Status.eq(PaymentStatus::Paid.to_string()))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?)
    }

    /// 按课程汇总已支付收入
    pub async fn revenue_by_course(
        &self,
        course_ids: &[String],
    ) -> Result<HashMap<String, CourseRevenue>> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = payment::Entity::find()
            .select_only()
            .column(payment::Column::CourseId)
            .column(payment::Column::AmountCents)
            .filter(payment::Column::Status.eq(PaymentStatus::Paid.to_string()))
            .filter(payment::Column::CourseId.is_in(course_ids.iter().cloned()))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut revenue: HashMap<String, CourseRevenue> = HashMap::new();
        for (course_id, amount) in rows {
            let entry = revenue.entry(course_id).or_default();
            entry.paid_orders += 1;
            entry.revenue_cents += amount;
        }
        Ok(revenue)
    }
}
