//! 课程与课时表操作

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use super::{SeaOrmStorage, model_to_course, model_to_lesson, page_index};
use crate::errors::{LmsError, Result};
use crate::storage::models::{Course, CourseLevel, Lesson};

use migration::entities::{course, enrollment, lesson, lesson_progress};

/// 课程目录过滤条件
#[derive(Default, Clone, Debug)]
pub struct CourseFilter {
    /// 模糊匹配标题或简介
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub published_only: bool,
    pub instructor_id: Option<String>,
}

impl CourseFilter {
    fn cache_key(&self) -> String {
        format!(
            "courses:s={:?}:c={:?}:l={:?}:p={}:i={:?}",
            self.search, self.category, self.level, self.published_only, self.instructor_id
        )
    }

    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if self.published_only {
            condition = condition.add(course::Column::IsPublished.eq(true));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(course::Column::Title.contains(search))
                    .add(course::Column::Description.contains(search)),
            );
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(course::Column::Category.eq(category));
        }
        if let Some(level) = self.level {
            condition = condition.add(course::Column::Level.eq(level.to_string()));
        }
        if let Some(instructor_id) = &self.instructor_id {
            condition = condition.add(course::Column::InstructorId.eq(instructor_id.as_str()));
        }
        condition
    }
}

fn course_to_active_model(c: &Course) -> course::ActiveModel {
    course::ActiveModel {
        id: Set(c.id.clone()),
        title: Set(c.title.clone()),
        slug: Set(c.slug.clone()),
        description: Set(c.description.clone()),
        category: Set(c.category.clone()),
        level: Set(c.level.to_string()),
        price_cents: Set(c.price_cents),
        currency: Set(c.currency.clone()),
        instructor_id: Set(c.instructor_id.clone()),
        thumbnail_url: Set(c.thumbnail_url.clone()),
        is_published: Set(c.is_published),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    }
}

impl SeaOrmStorage {
    pub async fn insert_course(&self, c: &Course) -> Result<Course> {
        let inserted = course_to_active_model(c).insert(&self.db).await?;
        self.invalidate_count_cache();
        info!("Course created: {} ({})", inserted.id, inserted.slug);
        Ok(model_to_course(inserted))
    }

    /// 全量更新课程字段（id/created_at 不变）
    pub async fn update_course(&self, c: &Course) -> Result<Course> {
        let mut active = course_to_active_model(c);
        active.created_at = sea_orm::ActiveValue::NotSet;
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                LmsError::not_found(format!("Course not found: {}", c.id))
            }
            other => LmsError::from(other),
        })?;
        self.invalidate_count_cache();
        Ok(model_to_course(updated))
    }

    pub async fn find_course(&self, id: &str) -> Result<Option<Course>> {
        let db = &self.db;
        let model = self
            .retrying("find_course", || async {
                course::Entity::find_by_id(id).one(db).await
            })
            .await?;
        Ok(model.map(model_to_course))
    }

    pub async fn find_course_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        let db = &self.db;
        let model = self
            .retrying("find_course_by_slug", || async {
                course::Entity::find()
                    .filter(course::Column::Slug.eq(slug))
                    .one(db)
                    .await
            })
            .await?;
        Ok(model.map(model_to_course))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.find_course_by_slug(slug).await?.is_some())
    }

    pub async fn find_courses(&self, ids: &[String]) -> Result<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = course::Entity::find()
            .filter(course::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_course).collect())
    }

    /// 删除课程及其课时（调用方已确认无选课记录）
    pub async fn delete_course(&self, id: &str) -> Result<()> {
        let txn = self.db.begin().await?;

        lesson::Entity::delete_many()
            .filter(lesson::Column::CourseId.eq(id))
            .exec(&txn)
            .await?;
        let result = course::Entity::delete_by_id(id).exec(&txn).await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(LmsError::not_found(format!("Course not found: {}", id)));
        }

        txn.commit().await?;
        self.invalidate_count_cache();
        info!("Course deleted: {}", id);
        Ok(())
    }

    /// 带过滤条件的分页加载课程（带 COUNT 缓存），最新的在前
    pub async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Course>, u64)> {
        let cache_key = filter.cache_key();
        let condition = filter.condition();
        let db = &self.db;

        let total = if let Some(cached) = self.count_cache.get(&cache_key) {
            debug!("count cache hit: key={}, value={}", cache_key, cached);
            cached
        } else {
            let count = self
                .retrying("list_courses(count)", || async {
                    course::Entity::find()
                        .filter(condition.clone())
                        .count(db)
                        .await
                })
                .await?;
            self.count_cache.insert(cache_key, count);
            count
        };

        let models = self
            .retrying("list_courses(data)", || async {
                course::Entity::find()
                    .filter(condition.clone())
                    .order_by_desc(course::Column::CreatedAt)
                    .order_by_desc(course::Column::Id)
                    .paginate(db, page_size)
                    .fetch_page(page_index(page))
                    .await
            })
            .await?;

        Ok((models.into_iter().map(model_to_course).collect(), total))
    }

    pub async fn list_courses_by_instructor(&self, instructor_id: &str) -> Result<Vec<Course>> {
        let models = course::Entity::find()
            .filter(course::Column::InstructorId.eq(instructor_id))
            .order_by_desc(course::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_course).collect())
    }

    // ============================================================
    // 课时
    // ============================================================

    /// 追加课时，position 取当前最大值 + 1
    pub async fn insert_lesson(&self, mut new_lesson: Lesson) -> Result<Lesson> {
        let txn = self.db.begin().await?;

        let max_position: Option<i32> = lesson::Entity::find()
            .select_only()
            .column(lesson::Column::Position)
            .filter(lesson::Column::CourseId.eq(new_lesson.course_id.as_str()))
            .order_by_desc(lesson::Column::Position)
            .into_tuple::<i32>()
            .one(&txn)
            .await?;
        new_lesson.position = max_position.map_or(1, |p| p + 1);

        let inserted = lesson::ActiveModel {
            id: Set(new_lesson.id),
            course_id: Set(new_lesson.course_id),
            title: Set(new_lesson.title),
            content: Set(new_lesson.content),
            video_url: Set(new_lesson.video_url),
            position: Set(new_lesson.position),
            duration_minutes: Set(new_lesson.duration_minutes),
            created_at: Set(new_lesson.created_at),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(
            "Lesson {} added to course {} at position {}",
            inserted.id, inserted.course_id, inserted.position
        );
        Ok(model_to_lesson(inserted))
    }

    pub async fn update_lesson(&self, l: &Lesson) -> Result<Lesson> {
        let active = lesson::ActiveModel {
            id: Set(l.id.clone()),
            course_id: sea_orm::ActiveValue::NotSet,
            title: Set(l.title.clone()),
            content: Set(l.content.clone()),
            video_url: Set(l.video_url.clone()),
            position: sea_orm::ActiveValue::NotSet,
            duration_minutes: Set(l.duration_minutes),
            created_at: sea_orm::ActiveValue::NotSet,
        };
        let updated = active.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                LmsError::not_found(format!("Lesson not found: {}", l.id))
            }
            other => LmsError::from(other),
        })?;
        Ok(model_to_lesson(updated))
    }

    pub async fn find_lesson(&self, id: &str) -> Result<Option<Lesson>> {
        let db = &self.db;
        let model = self
            .retrying("find_lesson", || async {
                lesson::Entity::find_by_id(id).one(db).await
            })
            .await?;
        Ok(model.map(model_to_lesson))
    }

    /// 删除课时及其完成记录
    pub async fn delete_lesson(&self, id: &str) -> Result<()> {
        let txn = self.db.begin().await?;

        lesson_progress::Entity::delete_many()
            .filter(lesson_progress::Column::LessonId.eq(id))
            .exec(&txn)
            .await?;
        let result = lesson::Entity::delete_by_id(id).exec(&txn).await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(LmsError::not_found(format!("Lesson not found: {}", id)));
        }

        txn.commit().await?;
        info!("Lesson deleted: {}", id);
        Ok(())
    }

    /// 按 position 排序的课时列表
    pub async fn list_lessons(&self, course_id: &str) -> Result<Vec<Lesson>> {
        let db = &self.db;
        let models = self
            .retrying("list_lessons", || async {
                lesson::Entity::find()
                    .filter(lesson::Column::CourseId.eq(course_id))
                    .order_by_asc(lesson::Column::Position)
                    .all(db)
                    .await
            })
            .await?;
        Ok(models.into_iter().map(model_to_lesson).collect())
    }

    pub async fn count_lessons(&self, course_id: &str) -> Result<u64> {
        let db = &self.db;
        self.retrying("count_lessons", || async {
            lesson::Entity::find()
                .filter(lesson::Column::CourseId.eq(course_id))
                .count(db)
                .await
        })
        .await
    }

    pub async fn count_enrollments_for_course(&self, course_id: &str) -> Result<u64> {
        let count = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
