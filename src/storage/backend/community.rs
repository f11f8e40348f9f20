//! 留言、通知、课程聊天表操作

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

use super::{
    SeaOrmStorage, model_to_contact, model_to_message, model_to_notification, page_index,
};
use crate::errors::{LmsError, Result};
use crate::storage::models::{
    ChatMessage, Contact, ContactStatus, Notification, NotificationKind,
};

use migration::entities::{contact, message, notification};

impl SeaOrmStorage {
    pub async fn insert_contact(
        &self,
        name: String,
        email: String,
        subject: String,
        body: String,
    ) -> Result<Contact> {
        let inserted = contact::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name),
            email: Set(email),
            subject: Set(subject),
            message: Set(body),
            status: Set(ContactStatus::Open.to_string()),
            created_at: Set(Utc::now()),
            resolved_at: Set(None),
        }
        .insert(&self.db)
        .await?;
        Ok(model_to_contact(inserted))
    }

    pub async fn list_contacts(
        &self,
        status: Option<ContactStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Contact>, u64)> {
        let mut condition = Condition::all();
        if let Some(status) = status {
            condition = condition.add(contact::Column::Status.eq(status.to_string()));
        }

        let db = &self.db;
        let total = self
            .retrying("list_contacts(count)", || async {
                contact::Entity::find()
                    .filter(condition.clone())
                    .count(db)
                    .await
            })
            .await?;
        let models = self
            .retrying("list_contacts(data)", || async {
                contact::Entity::find()
                    .filter(condition.clone())
                    .order_by_desc(contact::Column::CreatedAt)
                    .paginate(db, page_size)
                    .fetch_page(page_index(page))
                    .await
            })
            .await?;

        Ok((models.into_iter().map(model_to_contact).collect(), total))
    }

    pub async fn resolve_contact(&self, id: &str) -> Result<Contact> {
        let updated = contact::ActiveModel {
            id: Set(id.to_string()),
            status: Set(ContactStatus::Resolved.to_string()),
            resolved_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                LmsError::not_found(format!("Contact message not found: {}", id))
            }
            other => LmsError::from(other),
        })?;
        Ok(model_to_contact(updated))
    }

    // ============================================================
    // 通知
    // ============================================================

    pub async fn insert_notification(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: String,
        body: String,
    ) -> Result<Notification> {
        let inserted = notification::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind.to_string()),
            title: Set(title),
            body: Set(body),
            is_read: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok(model_to_notification(inserted))
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u64,
    ) -> Result<Vec<Notification>> {
        let mut query = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        let models = query
            .order_by_desc(notification::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_notification).collect())
    }

    pub async fn count_unread_notifications(&self, user_id: &str) -> Result<u64> {
        let count = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// 标记单条已读；只能操作自己的通知
    pub async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<()> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::val(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(LmsError::not_found(format!("Notification not found: {}", id)));
        }
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::val(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    // ============================================================
    // 课程聊天
    // ============================================================

    pub async fn insert_message(
        &self,
        course_id: &str,
        sender_id: &str,
        sender_name: &str,
        body: String,
    ) -> Result<ChatMessage> {
        let inserted = message::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            course_id: Set(course_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            sender_name: Set(sender_name.to_string()),
            body: Set(body),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok(model_to_message(inserted))
    }

    /// 最近 `limit` 条消息，按时间正序返回
    pub async fn list_messages(&self, course_id: &str, limit: u64) -> Result<Vec<ChatMessage>> {
        let mut models = message::Entity::find()
            .filter(message::Column::CourseId.eq(course_id))
            .order_by_desc(message::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        models.reverse();
        Ok(models.into_iter().map(model_to_message).collect())
    }
}
