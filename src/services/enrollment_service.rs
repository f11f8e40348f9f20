//! Enrollment and progress service
//!
//! 进度只通过 `progress::evaluate` 计算；达到 100% 时触发证书流水线。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use ts_rs::TS;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::progress;
use crate::services::{AuthUser, CertificateService, NotificationService};
use crate::storage::{
    Certificate, Course, Enrollment, EnrollmentStatus, NotificationKind, SeaOrmStorage,
};

/// 选课记录 + 课程基本信息
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct EnrollmentSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub enrollment: Enrollment,
    pub course_title: String,
    pub course_slug: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ProgressView {
    pub enrollment_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub completed_lesson_ids: Vec<String>,
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub completion_percentage: i32,
    pub certificate_id: Option<String>,
}

/// `complete_lesson` 的结果
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LessonCompletion {
    pub enrollment: Enrollment,
    /// 本次请求是否新记录了该课时
    pub newly_recorded: bool,
    pub certificate: Option<Certificate>,
}

/// 重新计算进度的结果
#[derive(Debug, Clone)]
pub struct Recomputed {
    pub enrollment: Enrollment,
    pub changed: bool,
    pub newly_completed: bool,
}

pub struct EnrollmentService {
    storage: Arc<SeaOrmStorage>,
    notifications: Arc<NotificationService>,
    certificates: Arc<CertificateService>,
}

impl EnrollmentService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        notifications: Arc<NotificationService>,
        certificates: Arc<CertificateService>,
    ) -> Self {
        Self {
            storage,
            notifications,
            certificates,
        }
    }

    async fn published_course(&self, course_id: &str) -> Result<Course> {
        self.storage
            .find_course(course_id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))
    }

    /// 免费课程直接选课；付费课程需走支付流程
    pub async fn enroll(&self, actor: &AuthUser, course_id: &str) -> Result<Enrollment> {
        let course = self.published_course(course_id).await?;

        if self
            .storage
            .find_enrollment_for(&actor.id, course_id)
            .await?
            .is_some()
        {
            return Err(LmsError::validation("Already enrolled in this course"));
        }

        if !course.is_free() {
            return Err(LmsError::payment_required(format!(
                "Course \"{}\" requires payment",
                course.title
            )));
        }

        let enrollment = self.create_enrollment(&actor.id, &course).await.map_err(|e| {
            // 并发重复选课
            if matches!(e, LmsError::Conflict(_)) {
                LmsError::validation("Already enrolled in this course")
            } else {
                e
            }
        })?;
        Ok(enrollment)
    }

    /// 支付成功后的选课，重复调用返回已有记录
    pub async fn enroll_from_payment(&self, user_id: &str, course_id: &str) -> Result<Enrollment> {
        if let Some(existing) = self.storage.find_enrollment_for(user_id, course_id).await? {
            return Ok(existing);
        }
        let course = self
            .storage
            .find_course(course_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))?;

        match self.create_enrollment(user_id, &course).await {
            Ok(enrollment) => Ok(enrollment),
            Err(LmsError::Conflict(_)) => self
                .storage
                .find_enrollment_for(user_id, course_id)
                .await?
                .ok_or_else(|| LmsError::internal("Enrollment vanished after conflict")),
            Err(e) => Err(e),
        }
    }

    async fn create_enrollment(&self, user_id: &str, course: &Course) -> Result<Enrollment> {
        let total = self.storage.count_lessons(&course.id).await? as i32;
        let enrollment = self
            .storage
            .insert_enrollment(user_id, &course.id, total)
            .await?;

        info!("User {} enrolled in course {}", user_id, course.id);
        self.notifications
            .notify(
                user_id,
                NotificationKind::Enrollment,
                "Enrollment confirmed",
                format!("You are now enrolled in \"{}\".", course.title),
            )
            .await;
        Ok(enrollment)
    }

    pub async fn list_mine(&self, user_id: &str) -> Result<Vec<EnrollmentSummary>> {
        let enrollments = self.storage.list_enrollments_by_user(user_id).await?;
        let course_ids: Vec<String> = enrollments.iter().map(|e| e.course_id.clone()).collect();
        let courses: HashMap<String, Course> = self
            .storage
            .find_courses(&course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        Ok(enrollments
            .into_iter()
            .map(|enrollment| {
                let (course_title, course_slug) = courses
                    .get(&enrollment.course_id)
                    .map(|c| (c.title.clone(), c.slug.clone()))
                    .unwrap_or_default();
                EnrollmentSummary {
                    enrollment,
                    course_title,
                    course_slug,
                }
            })
            .collect())
    }

    /// 获取选课记录（本人或管理员）
    pub async fn get(&self, enrollment_id: &str, actor: &AuthUser) -> Result<Enrollment> {
        let enrollment = self
            .storage
            .find_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Enrollment not found: {}", enrollment_id)))?;
        if !actor.owns_or_admin(&enrollment.user_id) {
            return Err(LmsError::forbidden("Not your enrollment"));
        }
        Ok(enrollment)
    }

    pub async fn progress(&self, enrollment_id: &str, actor: &AuthUser) -> Result<ProgressView> {
        let enrollment = self.get(enrollment_id, actor).await?;
        let lesson_ids = self.lesson_ids(&enrollment.course_id).await?;
        let completed_lesson_ids: Vec<String> = self
            .storage
            .completed_lesson_ids(&enrollment.id)
            .await?
            .into_iter()
            .filter(|id| lesson_ids.contains(id))
            .collect();

        Ok(ProgressView {
            enrollment_id: enrollment.id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            completed_lesson_ids,
            completed_lessons: enrollment.completed_lessons,
            total_lessons: enrollment.total_lessons,
            completion_percentage: enrollment.completion_percentage,
            certificate_id: enrollment.certificate_id,
        })
    }

    /// 标记课时完成（幂等），重新计算进度，100% 时签发证书
    pub async fn complete_lesson(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        actor: &AuthUser,
    ) -> Result<LessonCompletion> {
        let enrollment = self.get(enrollment_id, actor).await?;
        if enrollment.user_id != actor.id {
            return Err(LmsError::forbidden("Only the enrolled student can complete lessons"));
        }

        let lesson = self
            .storage
            .find_lesson(lesson_id)
            .await?
            .filter(|l| l.course_id == enrollment.course_id)
            .ok_or_else(|| LmsError::validation("Lesson does not belong to this course"))?;

        let newly_recorded = self
            .storage
            .record_lesson_completion(&enrollment.id, &lesson.id)
            .await?;
        self.storage.touch_enrollment(&enrollment.id).await?;

        let recomputed = self.recompute(&enrollment).await?;
        let certificate = self.issue_if_complete(&recomputed.enrollment).await;
        let enrollment = match &certificate {
            Some(cert) => Enrollment {
                certificate_id: Some(cert.id.clone()),
                ..recomputed.enrollment
            },
            None => recomputed.enrollment,
        };

        Ok(LessonCompletion {
            enrollment,
            newly_recorded,
            certificate,
        })
    }

    async fn lesson_ids(&self, course_id: &str) -> Result<Vec<String>> {
        Ok(self
            .storage
            .list_lessons(course_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }

    /// 按当前课时重新计算并保存进度
    pub async fn recompute(&self, enrollment: &Enrollment) -> Result<Recomputed> {
        let lesson_ids = self.lesson_ids(&enrollment.course_id).await?;
        let completed_ids = self.storage.completed_lesson_ids(&enrollment.id).await?;
        self.apply(enrollment, &lesson_ids, &completed_ids).await
    }

    async fn apply(
        &self,
        enrollment: &Enrollment,
        lesson_ids: &[String],
        completed_ids: &[String],
    ) -> Result<Recomputed> {
        let update = progress::evaluate(enrollment, lesson_ids, completed_ids, Utc::now());
        if !progress::is_stale(enrollment, &update) {
            return Ok(Recomputed {
                enrollment: enrollment.clone(),
                changed: false,
                newly_completed: false,
            });
        }

        let newly_completed = enrollment.status != EnrollmentStatus::Completed
            && update.status == EnrollmentStatus::Completed;
        let saved = self.storage.save_progress(&enrollment.id, &update).await?;

        if newly_completed {
            info!(
                "Enrollment {} completed course {}",
                saved.id, saved.course_id
            );
            self.notifications
                .notify(
                    &saved.user_id,
                    NotificationKind::CourseCompleted,
                    "Course completed",
                    "Congratulations! You have completed every lesson of the course.",
                )
                .await;
        }

        Ok(Recomputed {
            enrollment: saved,
            changed: true,
            newly_completed,
        })
    }

    /// 100% 且尚无证书时运行证书流水线；失败只记日志，由 reconcile 补发
    pub async fn issue_if_complete(&self, enrollment: &Enrollment) -> Option<Certificate> {
        if enrollment.completion_percentage < 100 || enrollment.certificate_id.is_some() {
            return None;
        }
        match self.certificates.issue_for_enrollment(&enrollment.id).await {
            Ok(cert) => Some(cert),
            Err(e) => {
                error!(
                    "Certificate pipeline failed for enrollment {}: {}",
                    enrollment.id, e
                );
                None
            }
        }
    }

    /// 课时增删后重新计算该课程所有选课记录的进度
    pub async fn recompute_course(&self, course_id: &str) -> Result<usize> {
        let lesson_ids = self.lesson_ids(course_id).await?;
        let enrollments = self.storage.list_enrollments_by_course(course_id).await?;
        let mut changed = 0;

        for enrollment in &enrollments {
            let completed_ids = match self.storage.completed_lesson_ids(&enrollment.id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Skip progress recompute for {}: {}", enrollment.id, e);
                    continue;
                }
            };
            match self.apply(enrollment, &lesson_ids, &completed_ids).await {
                Ok(result) => {
                    if result.changed {
                        changed += 1;
                    }
                    self.issue_if_complete(&result.enrollment).await;
                }
                Err(e) => warn!("Progress recompute failed for {}: {}", enrollment.id, e),
            }
        }

        if changed > 0 {
            info!(
                "Recomputed progress for course {}: {} of {} enrollments updated",
                course_id,
                changed,
                enrollments.len()
            );
        }
        Ok(changed)
    }
}
