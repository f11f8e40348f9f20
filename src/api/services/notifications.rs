//! 站内通知 API `/notifications`

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::LmsError;
use crate::services::{AuthUser, NotificationService};

use super::TS_EXPORT_PATH;
use super::helpers::{message_response, success_response};
use super::sse::event_stream;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UnreadCount {
    #[ts(type = "number")]
    pub unread: u64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct MarkedRead {
    #[ts(type = "number")]
    pub updated: u64,
}

pub async fn list_notifications(
    user: AuthUser,
    notifications: web::Data<NotificationService>,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, LmsError> {
    let items = notifications.list_mine(&user.id, query.unread_only).await?;
    Ok(success_response(items))
}

pub async fn unread_count(
    user: AuthUser,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, LmsError> {
    let unread = notifications.unread_count(&user.id).await?;
    Ok(success_response(UnreadCount { unread }))
}

pub async fn mark_read(
    user: AuthUser,
    notifications: web::Data<NotificationService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    notifications.mark_read(&user.id, &path).await?;
    Ok(message_response("Notification marked as read"))
}

pub async fn mark_all_read(
    user: AuthUser,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, LmsError> {
    let updated = notifications.mark_all_read(&user.id).await?;
    Ok(success_response(MarkedRead { updated }))
}

/// 当前用户的实时通知流
pub async fn stream_notifications(
    user: AuthUser,
    notifications: web::Data<NotificationService>,
) -> HttpResponse {
    let rx = notifications.bus().subscribe();
    let user_id = user.id;
    event_stream(rx, move |event| event.is_for_user(&user_id))
}

pub fn notifications_routes() -> actix_web::Scope {
    web::scope("/notifications")
        .route("", web::get().to(list_notifications))
        .route("/unread-count", web::get().to(unread_count))
        .route("/read-all", web::post().to(mark_all_read))
        .route("/stream", web::get().to(stream_notifications))
        .route("/{id}/read", web::post().to(mark_read))
}
