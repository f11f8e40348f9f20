//! 课程聊天室
//!
//! 消息落库后广播到事件总线，由 SSE 端点按课程过滤。

use std::sync::Arc;

use tracing::debug;

use crate::errors::{LmsError, Result};
use crate::services::AuthUser;
use crate::storage::{ChatMessage, Course, SeaOrmStorage};
use crate::system::event::{Event, EventBus};

pub const MAX_MESSAGE_CHARS: usize = 2000;
const MESSAGE_HISTORY_LIMIT: u64 = 100;

pub struct ChatService {
    storage: Arc<SeaOrmStorage>,
    bus: EventBus,
}

impl ChatService {
    pub fn new(storage: Arc<SeaOrmStorage>, bus: EventBus) -> Self {
        Self { storage, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// 聊天室准入：已选课学员、课程讲师、管理员
    pub async fn ensure_room_access(&self, course_id: &str, actor: &AuthUser) -> Result<Course> {
        let course = self
            .storage
            .find_course(course_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))?;

        if actor.owns_or_admin(&course.instructor_id) {
            return Ok(course);
        }
        if self
            .storage
            .find_enrollment_for(&actor.id, course_id)
            .await?
            .is_some()
        {
            return Ok(course);
        }
        Err(LmsError::forbidden("Enroll in this course to join its chat"))
    }

    pub async fn list_messages(&self, course_id: &str, actor: &AuthUser) -> Result<Vec<ChatMessage>> {
        self.ensure_room_access(course_id, actor).await?;
        self.storage
            .list_messages(course_id, MESSAGE_HISTORY_LIMIT)
            .await
    }

    pub async fn post_message(
        &self,
        course_id: &str,
        actor: &AuthUser,
        body: &str,
    ) -> Result<ChatMessage> {
        let body = body.trim();
        let chars = body.chars().count();
        if chars == 0 || chars > MAX_MESSAGE_CHARS {
            return Err(LmsError::validation(format!(
                "Message must be 1 to {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        self.ensure_room_access(course_id, actor).await?;

        let sender = self
            .storage
            .find_user(&actor.id)
            .await?
            .ok_or_else(|| LmsError::unauthorized("User no longer exists"))?;

        let message = self
            .storage
            .insert_message(course_id, &sender.id, &sender.name, body.to_string())
            .await?;

        let delivered = self.bus.publish(Event::ChatMessage(message.clone()));
        debug!(
            "Chat message {} in course {} delivered to {} subscribers",
            message.id, course_id, delivered
        );
        Ok(message)
    }
}
