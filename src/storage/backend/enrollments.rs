//! 选课与学习进度表操作

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::info;

use super::{SeaOrmStorage, is_unique_violation, model_to_enrollment};
use crate::errors::{LmsError, Result};
use crate::storage::models::{Enrollment, EnrollmentStatus};

use migration::entities::{enrollment, lesson_progress};

/// 进度重算结果，写回 enrollments 表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub completion_percentage: i32,
    pub status: EnrollmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SeaOrmStorage {
    /// 新建选课记录；同一用户重复选课返回 Conflict
    pub async fn insert_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
        total_lessons: i32,
    ) -> Result<Enrollment> {
        let now = Utc::now();
        let model = enrollment::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            course_id: Set(course_id.to_string()),
            status: Set(EnrollmentStatus::Active.to_string()),
            completed_lessons: Set(0),
            total_lessons: Set(total_lessons),
            completion_percentage: Set(0),
            certificate_id: Set(None),
            enrolled_at: Set(now),
            completed_at: Set(None),
            last_accessed_at: Set(now),
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                LmsError::conflict("Already enrolled in this course")
            } else {
                LmsError::from(e)
            }
        })?;

        info!(
            "Enrollment created: user={} course={}",
            inserted.user_id, inserted.course_id
        );
        Ok(model_to_enrollment(inserted))
    }

    pub async fn find_enrollment(&self, id: &str) -> Result<Option<Enrollment>> {
        let db = &self.db;
        let model = self
            .retrying("find_enrollment", || async {
                enrollment::Entity::find_by_id(id).one(db).await
            })
            .await?;
        Ok(model.map(model_to_enrollment))
    }

    pub async fn find_enrollment_for(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>> {
        let db = &self.db;
        let model = self
            .retrying("find_enrollment_for", || async {
                enrollment::Entity::find()
                    .filter(enrollment::Column::UserId.eq(user_id))
                    .filter(enrollment::Column::CourseId.eq(course_id))
                    .one(db)
                    .await
            })
            .await?;
        Ok(model.map(model_to_enrollment))
    }

    pub async fn list_enrollments_by_user(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let models = enrollment::Entity::find()
            .filter(enrollment::Column::UserId.eq(user_id))
            .order_by_desc(enrollment::Column::EnrolledAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_enrollment).collect())
    }

    pub async fn list_enrollments_by_course(&self, course_id: &str) -> Result<Vec<Enrollment>> {
        let models = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_enrollment).collect())
    }

    /// 全部选课记录（进度校正）
    pub async fn list_all_enrollments(&self) -> Result<Vec<Enrollment>> {
        let models = enrollment::Entity::find()
            .order_by_asc(enrollment::Column::EnrolledAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_enrollment).collect())
    }

    /// 记录课时完成；已完成过返回 false
    pub async fn record_lesson_completion(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
    ) -> Result<bool> {
        let model = lesson_progress::ActiveModel {
            enrollment_id: Set(enrollment_id.to_string()),
            lesson_id: Set(lesson_id.to_string()),
            completed_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn completed_lesson_ids(&self, enrollment_id: &str) -> Result<Vec<String>> {
        let db = &self.db;
        self.retrying("completed_lesson_ids", || async {
            lesson_progress::Entity::find()
                .select_only()
                .column(lesson_progress::Column::LessonId)
                .filter(lesson_progress::Column::EnrollmentId.eq(enrollment_id))
                .order_by_asc(lesson_progress::Column::CompletedAt)
                .into_tuple::<String>()
                .all(db)
                .await
        })
        .await
    }

    pub async fn save_progress(
        &self,
        enrollment_id: &str,
        update: &ProgressUpdate,
    ) -> Result<Enrollment> {
        let active = enrollment::ActiveModel {
            id: Set(enrollment_id.to_string()),
            completed_lessons: Set(update.completed_lessons),
            total_lessons: Set(update.total_lessons),
            completion_percentage: Set(update.completion_percentage),
            status: Set(update.status.to_string()),
            completed_at: Set(update.completed_at),
            last_accessed_at: Set(Utc::now()),
            ..Default::default()
        };

        let updated = active.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                LmsError::not_found(format!("Enrollment not found: {}", enrollment_id))
            }
            other => LmsError::from(other),
        })?;
        Ok(model_to_enrollment(updated))
    }

    pub async fn set_enrollment_certificate(
        &self,
        enrollment_id: &str,
        certificate_id: &str,
    ) -> Result<()> {
        let active = enrollment::ActiveModel {
            id: Set(enrollment_id.to_string()),
            certificate_id: Set(Some(certificate_id.to_string())),
            ..Default::default()
        };
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn touch_enrollment(&self, enrollment_id: &str) -> Result<()> {
        let active = enrollment::ActiveModel {
            id: Set(enrollment_id.to_string()),
            last_accessed_at: Set(Utc::now()),
            ..Default::default()
        };
        active.update(&self.db).await?;
        Ok(())
    }
}
