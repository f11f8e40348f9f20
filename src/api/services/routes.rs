//! API 路由汇总
//!
//! 所有业务端点挂在 `/api` 下；证书公开入口与健康检查挂在站点根路径。

use actix_web::web;

use super::admin::admin_routes;
use super::auth::auth_routes;
use super::certificates::{certificates_routes, public_certificate_routes};
use super::community::community_routes;
use super::courses::courses_routes;
use super::enrollments::enrollments_routes;
use super::health::health_routes;
use super::instructor::instructor_routes;
use super::notifications::notifications_routes;
use super::payments::{payments_routes, promo_routes};
use crate::api::constants::API_PREFIX;

/// `/api` 作用域
pub fn api_scope() -> actix_web::Scope {
    web::scope(API_PREFIX)
        .service(auth_routes())
        .service(courses_routes())
        .service(enrollments_routes())
        .service(payments_routes())
        .service(promo_routes())
        .service(certificates_routes())
        .service(notifications_routes())
        .service(instructor_routes())
        .service(admin_routes())
        .configure(community_routes)
}

/// 注册全部路由
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_routes())
        .configure(public_certificate_routes)
        .service(api_scope());
}
