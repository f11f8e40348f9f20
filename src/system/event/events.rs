use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::storage::models::{ChatMessage, Notification};

/// 推送给在线客户端的事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// 发给单个用户的通知
    Notification(Notification),
    /// 课程聊天室消息
    ChatMessage(ChatMessage),
}

impl Event {
    /// SSE `event:` 字段
    pub fn name(&self) -> &'static str {
        match self {
            Event::Notification(_) => "notification",
            Event::ChatMessage(_) => "chat_message",
        }
    }

    pub fn is_for_user(&self, user_id: &str) -> bool {
        matches!(self, Event::Notification(n) if n.user_id == user_id)
    }

    pub fn is_for_course(&self, course_id: &str) -> bool {
        matches!(self, Event::ChatMessage(m) if m.course_id == course_id)
    }
}

/// 进程内事件总线
///
/// 基于 broadcast channel，慢订阅者会丢失旧事件（`Lagged`），发布方从不阻塞。
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件，返回收到事件的订阅者数量
    pub fn publish(&self, event: Event) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!("No subscribers for {} event", event.name());
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::NotificationKind;
    use chrono::Utc;

    fn notification(user_id: &str) -> Notification {
        Notification {
            id: "n1".into(),
            user_id: user_id.into(),
            kind: NotificationKind::System,
            title: "Hello".into(),
            body: "World".into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(Event::Notification(notification("u1"))), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(Event::Notification(notification("u1")));
        let event = rx.recv().await.unwrap();
        assert!(event.is_for_user("u1"));
        assert!(!event.is_for_user("u2"));
        assert!(!event.is_for_course("u1"));
        assert_eq!(event.name(), "notification");
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(Event::Notification(notification(&format!("u{}", i))));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(Event::Notification(notification("u1"))).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["data"]["user_id"], "u1");
    }
}
