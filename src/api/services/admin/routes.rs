//! Admin API 路由配置

use actix_web::web;

use super::commerce::{
    create_promo, deactivate_promo, list_contacts, list_payments, list_promos, resolve_contact,
};
use super::operations::{issue_certificate, reconcile, revoke_certificate};
use super::users::{get_stats, list_users, set_user_active, set_user_role};

/// 管理路由 `/admin`
///
/// 包含：
/// - GET /admin/stats
/// - GET /admin/users, PUT /admin/users/{id}/role, PUT /admin/users/{id}/active
/// - POST /admin/reconcile
/// - POST /admin/certificates, POST /admin/certificates/{id}/revoke
/// - GET /admin/payments
/// - GET/POST /admin/promo-codes, POST /admin/promo-codes/{code}/deactivate
/// - GET /admin/contacts, POST /admin/contacts/{id}/resolve
pub fn admin_routes() -> actix_web::Scope {
    web::scope("/admin")
        .route("/stats", web::get().to(get_stats))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}/role", web::put().to(set_user_role))
        .route("/users/{id}/active", web::put().to(set_user_active))
        .route("/reconcile", web::post().to(reconcile))
        .route("/certificates", web::post().to(issue_certificate))
        .route("/certificates/{id}/revoke", web::post().to(revoke_certificate))
        .route("/payments", web::get().to(list_payments))
        .route("/promo-codes", web::get().to(list_promos))
        .route("/promo-codes", web::post().to(create_promo))
        .route(
            "/promo-codes/{code}/deactivate",
            web::post().to(deactivate_promo),
        )
        .route("/contacts", web::get().to(list_contacts))
        .route("/contacts/{id}/resolve", web::post().to(resolve_contact))
}
