//! 订单、优惠码与联系表单

use actix_web::{HttpResponse, web};

use crate::api::middleware::AdminUser;
use crate::api::services::helpers::{created_response, paginated_response, success_response};
use crate::api::services::types::ListQuery;
use crate::errors::LmsError;
use crate::services::{CommunityService, CreatePromoRequest, PaymentService};
use crate::storage::{ContactStatus, PaymentStatus};

pub async fn list_payments(
    _admin: AdminUser,
    payments: web::Data<PaymentService>,
    query: web::Query<ListQuery<PaymentStatus>>,
) -> Result<HttpResponse, LmsError> {
    let query = query.into_inner();
    let page = payments
        .list_all(query.status, query.page, query.page_size)
        .await?;
    Ok(paginated_response(page, |p| p))
}

pub async fn list_promos(
    _admin: AdminUser,
    payments: web::Data<PaymentService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(payments.list_promos().await?))
}

pub async fn create_promo(
    _admin: AdminUser,
    payments: web::Data<PaymentService>,
    body: web::Json<CreatePromoRequest>,
) -> Result<HttpResponse, LmsError> {
    let promo = payments.create_promo(body.into_inner()).await?;
    Ok(created_response(promo))
}

pub async fn deactivate_promo(
    _admin: AdminUser,
    payments: web::Data<PaymentService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(payments.deactivate_promo(&path).await?))
}

pub async fn list_contacts(
    _admin: AdminUser,
    community: web::Data<CommunityService>,
    query: web::Query<ListQuery<ContactStatus>>,
) -> Result<HttpResponse, LmsError> {
    let query = query.into_inner();
    let page = community
        .list_contacts(query.status, query.page, query.page_size)
        .await?;
    Ok(paginated_response(page, |c| c))
}

pub async fn resolve_contact(
    _admin: AdminUser,
    community: web::Data<CommunityService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(community.resolve_contact(&path).await?))
}
