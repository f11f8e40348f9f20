//! 站内通知
//!
//! 通知先落库再推送到事件总线；推送失败（无人在线）不影响业务流程。

use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::Result;
use crate::storage::{Notification, NotificationKind, SeaOrmStorage};
use crate::system::event::{Event, EventBus};

/// 通知列表默认上限
const NOTIFICATION_LIST_LIMIT: u64 = 100;

pub struct NotificationService {
    storage: Arc<SeaOrmStorage>,
    bus: EventBus,
}

impl NotificationService {
    pub fn new(storage: Arc<SeaOrmStorage>, bus: EventBus) -> Self {
        Self { storage, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// 创建并推送通知；失败只记录日志
    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Option<Notification> {
        match self
            .storage
            .insert_notification(user_id, kind, title.into(), body.into())
            .await
        {
            Ok(notification) => {
                let delivered = self.bus.publish(Event::Notification(notification.clone()));
                debug!(
                    "Notification {} ({}) for {} delivered to {} subscribers",
                    notification.id, kind, user_id, delivered
                );
                Some(notification)
            }
            Err(e) => {
                error!("Failed to create {} notification for {}: {}", kind, user_id, e);
                None
            }
        }
    }

    pub async fn list_mine(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        self.storage
            .list_notifications(user_id, unread_only, NOTIFICATION_LIST_LIMIT)
            .await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64> {
        self.storage.count_unread_notifications(user_id).await
    }

    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        self.storage
            .mark_notification_read(user_id, notification_id)
            .await
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        self.storage.mark_all_notifications_read(user_id).await
    }
}
