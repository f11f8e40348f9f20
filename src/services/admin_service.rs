//! Admin and instructor dashboards, user management, progress reconciliation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::{
    AuthUser, CertificateService, EnrollmentService, Page, normalize_page,
};
use crate::storage::{
    Certificate, EnrollmentStatus, PlatformCounts, Role, SeaOrmStorage, UserFilter, UserProfile,
};

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    #[ts(type = "number | null")]
    pub page: Option<u64>,
    #[ts(type = "number | null")]
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ReconcileFailure {
    pub enrollment_id: String,
    pub error: String,
}

/// 进度校正结果
#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub progress_fixed: usize,
    pub certificates_issued: usize,
    pub failures: Vec<ReconcileFailure>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CourseStats {
    pub course_id: String,
    pub title: String,
    pub is_published: bool,
    #[ts(type = "number")]
    pub lesson_count: u64,
    pub enrollments: usize,
    pub completed: usize,
    /// 平均完成度（百分比，保留一位小数）
    pub average_completion: f64,
    #[ts(type = "number")]
    pub paid_orders: u64,
    #[ts(type = "number")]
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct InstructorDashboard {
    pub instructor_id: String,
    pub total_enrollments: usize,
    #[ts(type = "number")]
    pub total_revenue_cents: i64,
    pub courses: Vec<CourseStats>,
}

fn average_completion(percentages: &[i32]) -> f64 {
    if percentages.is_empty() {
        return 0.0;
    }
    let sum: i64 = percentages.iter().map(|p| i64::from(*p)).sum();
    let avg = sum as f64 / percentages.len() as f64;
    (avg * 10.0).round() / 10.0
}

pub struct AdminService {
    storage: Arc<SeaOrmStorage>,
    enrollments: Arc<EnrollmentService>,
    certificates: Arc<CertificateService>,
}

impl AdminService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        enrollments: Arc<EnrollmentService>,
        certificates: Arc<CertificateService>,
    ) -> Self {
        Self {
            storage,
            enrollments,
            certificates,
        }
    }

    pub async fn stats(&self) -> Result<PlatformCounts> {
        self.storage.platform_counts().await
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<UserProfile>> {
        let (page, page_size) = normalize_page(query.page, query.page_size)?;
        let filter = UserFilter {
            role: query.role,
            search: query.search.clone(),
        };
        let (users, total) = self.storage.list_users(&filter, page, page_size).await?;
        Ok(Page {
            items: users.iter().map(UserProfile::from).collect(),
            total,
            page,
            page_size,
        })
    }

    /// 管理员不能降低自己的权限
    pub async fn set_role(&self, actor: &AuthUser, user_id: &str, role: Role) -> Result<UserProfile> {
        if actor.id == user_id && role != Role::Admin {
            return Err(LmsError::validation("You cannot change your own admin role"));
        }
        let user = self.storage.set_user_role(user_id, role).await?;
        info!("User {} role set to {} by {}", user.id, role, actor.id);
        Ok(UserProfile::from(&user))
    }

    pub async fn set_active(
        &self,
        actor: &AuthUser,
        user_id: &str,
        active: bool,
    ) -> Result<UserProfile> {
        if actor.id == user_id && !active {
            return Err(LmsError::validation("You cannot deactivate your own account"));
        }
        let user = self.storage.set_user_active(user_id, active).await?;
        Ok(UserProfile::from(&user))
    }

    /// 手动签发证书：先按当前课时重算进度
    pub async fn issue_certificate(&self, enrollment_id: &str) -> Result<Certificate> {
        let enrollment = self
            .storage
            .find_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Enrollment not found: {}", enrollment_id)))?;
        self.enrollments.recompute(&enrollment).await?;
        self.certificates.issue_for_enrollment(enrollment_id).await
    }

    /// 重算所有选课进度，并补发 100% 但缺少证书的记录
    pub async fn reconcile_progress(&self) -> Result<ReconcileReport> {
        let enrollments = self.storage.list_all_enrollments().await?;
        let mut report = ReconcileReport {
            scanned: enrollments.len(),
            ..Default::default()
        };

        for enrollment in &enrollments {
            let current = match self.enrollments.recompute(enrollment).await {
                Ok(result) => {
                    if result.changed {
                        report.progress_fixed += 1;
                    }
                    result.enrollment
                }
                Err(e) => {
                    warn!("Reconcile: progress for {} failed: {}", enrollment.id, e);
                    report.failures.push(ReconcileFailure {
                        enrollment_id: enrollment.id.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if current.completion_percentage == 100 && current.certificate_id.is_none() {
                match self.certificates.issue_for_enrollment(&current.id).await {
                    Ok(_) => report.certificates_issued += 1,
                    Err(e) => {
                        warn!("Reconcile: certificate for {} failed: {}", current.id, e);
                        report.failures.push(ReconcileFailure {
                            enrollment_id: current.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "Reconcile finished: scanned={} fixed={} issued={} failures={}",
            report.scanned,
            report.progress_fixed,
            report.certificates_issued,
            report.failures.len()
        );
        Ok(report)
    }

    pub async fn instructor_dashboard(&self, actor: &AuthUser) -> Result<InstructorDashboard> {
        actor.require_author()?;

        let courses = self.storage.list_courses_by_instructor(&actor.id).await?;
        let ids: Vec<String> = courses.iter().map(|c| c.id.clone()).collect();
        let revenue = self.storage.revenue_by_course(&ids).await?;

        let mut stats = Vec::with_capacity(courses.len());
        for course in courses {
            let enrollments = self.storage.list_enrollments_by_course(&course.id).await?;
            let percentages: Vec<i32> = enrollments
                .iter()
                .map(|e| e.completion_percentage)
                .collect();
            let course_revenue = revenue.get(&course.id).cloned().unwrap_or_default();

            stats.push(CourseStats {
                lesson_count: self.storage.count_lessons(&course.id).await?,
                enrollments: enrollments.len(),
                completed: enrollments
                    .iter()
                    .filter(|e| e.status == EnrollmentStatus::Completed)
                    .count(),
                average_completion: average_completion(&percentages),
                paid_orders: course_revenue.paid_orders,
                revenue_cents: course_revenue.revenue_cents,
                course_id: course.id,
                title: course.title,
                is_published: course.is_published,
            });
        }

        Ok(InstructorDashboard {
            instructor_id: actor.id.clone(),
            total_enrollments: stats.iter().map(|s| s.enrollments).sum(),
            total_revenue_cents: stats.iter().map(|s| s.revenue_cents).sum(),
            courses: stats,
        })
    }
}
