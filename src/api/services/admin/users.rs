//! 平台统计与用户管理

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;

use crate::api::middleware::AdminUser;
use crate::api::services::TS_EXPORT_PATH;
use crate::api::services::helpers::{paginated_response, success_response};
use crate::errors::LmsError;
use crate::services::{AdminService, UserQuery};
use crate::storage::Role;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SetActiveRequest {
    pub active: bool,
}

pub async fn get_stats(
    _admin: AdminUser,
    admin: web::Data<AdminService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(admin.stats().await?))
}

pub async fn list_users(
    _admin: AdminUser,
    admin: web::Data<AdminService>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, LmsError> {
    let page = admin.list_users(&query).await?;
    Ok(paginated_response(page, |u| u))
}

pub async fn set_user_role(
    actor: AdminUser,
    admin: web::Data<AdminService>,
    path: web::Path<String>,
    body: web::Json<SetRoleRequest>,
) -> Result<HttpResponse, LmsError> {
    let profile = admin.set_role(&actor, &path, body.role).await?;
    Ok(success_response(profile))
}

pub async fn set_user_active(
    actor: AdminUser,
    admin: web::Data<AdminService>,
    path: web::Path<String>,
    body: web::Json<SetActiveRequest>,
) -> Result<HttpResponse, LmsError> {
    let profile = admin.set_active(&actor, &path, body.active).await?;
    info!(
        "Admin API: user {} active={} by {}",
        profile.id, profile.is_active, actor.id
    );
    Ok(success_response(profile))
}
