//! Course catalog and lesson authoring

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::{AuthUser, EnrollmentService, Page, normalize_page};
use crate::storage::{
    Course, CourseFilter, CourseLevel, Lesson, LessonSummary, SeaOrmStorage,
};
use crate::utils::generate_random_code;
use crate::utils::validation::{slugify, validate_http_url, validate_required};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 10_000;
const MAX_CATEGORY_CHARS: usize = 64;
const MAX_LESSON_CONTENT_CHARS: usize = 100_000;
/// slug 冲突时尝试的数字后缀上限，超出后使用随机后缀
const SLUG_SUFFIX_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    #[ts(type = "number | null")]
    pub page: Option<u64>,
    #[ts(type = "number | null")]
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub level: Option<CourseLevel>,
    #[serde(default)]
    #[ts(type = "number")]
    pub price_cents: i64,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    #[ts(type = "number | null")]
    pub price_cents: Option<i64>,
    /// 空字符串表示移除封面
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LessonRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// 课程详情（含课时目录）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CourseDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub course: Course,
    pub instructor_name: String,
    pub lesson_count: usize,
    pub lessons: Vec<LessonSummary>,
}

fn validate_price(price_cents: i64) -> Result<i64> {
    if price_cents < 0 {
        return Err(LmsError::validation("price_cents must be >= 0"));
    }
    Ok(price_cents)
}

fn validate_duration(minutes: i32) -> Result<i32> {
    if minutes < 0 {
        return Err(LmsError::validation("duration_minutes must be >= 0"));
    }
    Ok(minutes)
}

fn validate_optional_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.chars().count() > max_len {
        return Err(LmsError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(value.to_string())
}

/// None / 空字符串 → None，否则校验 http(s) URL
fn normalize_url(url: Option<&str>) -> Result<Option<String>> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => {
            validate_http_url(u)?;
            Ok(Some(u.to_string()))
        }
        None => Ok(None),
    }
}

pub struct CourseService {
    storage: Arc<SeaOrmStorage>,
    enrollments: Arc<EnrollmentService>,
}

impl CourseService {
    pub fn new(storage: Arc<SeaOrmStorage>, enrollments: Arc<EnrollmentService>) -> Self {
        Self {
            storage,
            enrollments,
        }
    }

    /// 公开目录：仅已发布课程，最新优先
    pub async fn list(&self, query: &CourseQuery) -> Result<Page<Course>> {
        let (page, page_size) = normalize_page(query.page, query.page_size)?;
        let filter = CourseFilter {
            search: query.search.clone(),
            category: query.category.clone(),
            level: query.level,
            published_only: true,
            instructor_id: None,
        };
        let (items, total) = self.storage.list_courses(&filter, page, page_size).await?;
        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 讲师自己的课程（含草稿）
    pub async fn list_own(&self, actor: &AuthUser) -> Result<Vec<Course>> {
        actor.require_author()?;
        self.storage.list_courses_by_instructor(&actor.id).await
    }

    async fn find_by_id_or_slug(&self, id_or_slug: &str) -> Result<Option<Course>> {
        if let Some(course) = self.storage.find_course(id_or_slug).await? {
            return Ok(Some(course));
        }
        self.storage.find_course_by_slug(id_or_slug).await
    }

    /// 草稿只对作者和管理员可见，其他人得到 404
    pub async fn get(&self, id_or_slug: &str, actor: Option<&AuthUser>) -> Result<CourseDetail> {
        let course = self
            .find_by_id_or_slug(id_or_slug)
            .await?
            .filter(|c| c.is_published || actor.is_some_and(|a| a.owns_or_admin(&c.instructor_id)))
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", id_or_slug)))?;

        let lessons = self.storage.list_lessons(&course.id).await?;
        let instructor_name = self
            .storage
            .find_user(&course.instructor_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();

        Ok(CourseDetail {
            lesson_count: lessons.len(),
            lessons: lessons.iter().map(LessonSummary::from).collect(),
            instructor_name,
            course,
        })
    }

    /// 读取课程并检查作者/管理员权限
    pub async fn get_owned(&self, course_id: &str, actor: &AuthUser) -> Result<Course> {
        let course = self
            .storage
            .find_course(course_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))?;
        if !actor.owns_or_admin(&course.instructor_id) {
            return Err(LmsError::forbidden("Only the course instructor can modify it"));
        }
        Ok(course)
    }

    async fn unique_slug(&self, title: &str) -> Result<String> {
        let base = slugify(title);
        if !self.storage.slug_exists(&base).await? {
            return Ok(base);
        }
        for n in 2..=SLUG_SUFFIX_ATTEMPTS {
            let candidate = format!("{}-{}", base, n);
            if !self.storage.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Ok(format!(
            "{}-{}",
            base,
            generate_random_code(6).to_lowercase()
        ))
    }

    pub async fn create(&self, actor: &AuthUser, req: CreateCourseRequest) -> Result<Course> {
        actor.require_author()?;

        let title = validate_required("title", &req.title, MAX_TITLE_CHARS)?;
        let description =
            validate_optional_text("description", &req.description, MAX_DESCRIPTION_CHARS)?;
        let category = validate_optional_text("category", &req.category, MAX_CATEGORY_CHARS)?;
        let price_cents = validate_price(req.price_cents)?;
        let thumbnail_url = normalize_url(req.thumbnail_url.as_deref())?;

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4().to_string(),
            slug: self.unique_slug(&title).await?,
            title,
            description,
            category,
            level: req.level.unwrap_or(CourseLevel::Beginner),
            price_cents,
            currency: crate::config::get_config().payments.currency.clone(),
            instructor_id: actor.id.clone(),
            thumbnail_url,
            is_published: false,
            created_at: now,
            updated_at: now,
        };

        let created = self.storage.insert_course(&course).await?;
        info!("Course {} ({}) created by {}", created.id, created.slug, actor.id);
        Ok(created)
    }

    /// 更新课程；slug 创建后保持不变
    pub async fn update(
        &self,
        course_id: &str,
        actor: &AuthUser,
        req: UpdateCourseRequest,
    ) -> Result<Course> {
        let mut course = self.get_owned(course_id, actor).await?;

        if let Some(title) = req.title {
            course.title = validate_required("title", &title, MAX_TITLE_CHARS)?;
        }
        if let Some(description) = req.description {
            course.description =
                validate_optional_text("description", &description, MAX_DESCRIPTION_CHARS)?;
        }
        if let Some(category) = req.category {
            course.category = validate_optional_text("category", &category, MAX_CATEGORY_CHARS)?;
        }
        if let Some(level) = req.level {
            course.level = level;
        }
        if let Some(price) = req.price_cents {
            course.price_cents = validate_price(price)?;
        }
        if let Some(url) = req.thumbnail_url {
            course.thumbnail_url = normalize_url(Some(&url))?;
        }
        course.updated_at = Utc::now();

        self.storage.update_course(&course).await
    }

    /// 已有选课记录或未结订单的课程不能删除
    pub async fn delete(&self, course_id: &str, actor: &AuthUser) -> Result<()> {
        let course = self.get_owned(course_id, actor).await?;
        let enrolled = self.storage.count_enrollments_for_course(&course.id).await?;
        if enrolled > 0 {
            return Err(LmsError::conflict(format!(
                "Course has {} enrollments and cannot be deleted",
                enrolled
            )));
        }
        let orders = self.storage.count_open_payments_for_course(&course.id).await?;
        if orders > 0 {
            return Err(LmsError::conflict(format!(
                "Course has {} open orders and cannot be deleted",
                orders
            )));
        }
        self.storage.delete_course(&course.id).await?;
        info!("Course {} deleted by {}", course.id, actor.id);
        Ok(())
    }

    pub async fn set_published(
        &self,
        course_id: &str,
        actor: &AuthUser,
        published: bool,
    ) -> Result<Course> {
        let mut course = self.get_owned(course_id, actor).await?;
        if course.is_published == published {
            return Ok(course);
        }
        if published && self.storage.count_lessons(&course.id).await? == 0 {
            return Err(LmsError::validation(
                "A course needs at least one lesson before publishing",
            ));
        }
        course.is_published = published;
        course.updated_at = Utc::now();
        let course = self.storage.update_course(&course).await?;
        info!(
            "Course {} {}",
            course.id,
            if published { "published" } else { "unpublished" }
        );
        Ok(course)
    }

    // ============ Lessons ============

    pub async fn list_lessons(&self, course_id: &str, actor: Option<&AuthUser>) -> Result<Vec<LessonSummary>> {
        Ok(self.get(course_id, actor).await?.lessons)
    }

    pub async fn add_lesson(
        &self,
        course_id: &str,
        actor: &AuthUser,
        req: LessonRequest,
    ) -> Result<Lesson> {
        let course = self.get_owned(course_id, actor).await?;
        let lesson = Lesson {
            id: Uuid::new_v4().to_string(),
            course_id: course.id.clone(),
            title: validate_required("title", &req.title, MAX_TITLE_CHARS)?,
            content: validate_optional_text("content", &req.content, MAX_LESSON_CONTENT_CHARS)?,
            video_url: normalize_url(req.video_url.as_deref())?,
            position: 0,
            duration_minutes: validate_duration(req.duration_minutes)?,
            created_at: Utc::now(),
        };

        let lesson = self.storage.insert_lesson(lesson).await?;
        self.enrollments.recompute_course(&course.id).await?;
        Ok(lesson)
    }

    async fn owned_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        actor: &AuthUser,
    ) -> Result<Lesson> {
        let course = self.get_owned(course_id, actor).await?;
        self.storage
            .find_lesson(lesson_id)
            .await?
            .filter(|l| l.course_id == course.id)
            .ok_or_else(|| LmsError::not_found(format!("Lesson not found: {}", lesson_id)))
    }

    pub async fn update_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        actor: &AuthUser,
        req: UpdateLessonRequest,
    ) -> Result<Lesson> {
        let mut lesson = self.owned_lesson(course_id, lesson_id, actor).await?;
        if let Some(title) = req.title {
            lesson.title = validate_required("title", &title, MAX_TITLE_CHARS)?;
        }
        if let Some(content) = req.content {
            lesson.content =
                validate_optional_text("content", &content, MAX_LESSON_CONTENT_CHARS)?;
        }
        if let Some(url) = req.video_url {
            lesson.video_url = normalize_url(Some(&url))?;
        }
        if let Some(minutes) = req.duration_minutes {
            lesson.duration_minutes = validate_duration(minutes)?;
        }
        self.storage.update_lesson(&lesson).await
    }

    pub async fn delete_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        actor: &AuthUser,
    ) -> Result<()> {
        let lesson = self.owned_lesson(course_id, lesson_id, actor).await?;
        self.storage.delete_lesson(&lesson.id).await?;
        self.enrollments.recompute_course(&lesson.course_id).await?;
        Ok(())
    }

    /// 课时正文：已选课学员、作者、管理员可读
    pub async fn get_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        actor: &AuthUser,
    ) -> Result<Lesson> {
        let course = self
            .storage
            .find_course(course_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))?;
        let lesson = self
            .storage
            .find_lesson(lesson_id)
            .await?
            .filter(|l| l.course_id == course.id)
            .ok_or_else(|| LmsError::not_found(format!("Lesson not found: {}", lesson_id)))?;

        if actor.owns_or_admin(&course.instructor_id) {
            return Ok(lesson);
        }
        match self.storage.find_enrollment_for(&actor.id, &course.id).await? {
            Some(enrollment) => {
                self.storage.touch_enrollment(&enrollment.id).await?;
                Ok(lesson)
            }
            None => Err(LmsError::forbidden("Enroll in this course to view its lessons")),
        }
    }
}
