//! 支付与优惠码 API
//!
//! `/payments/webhook` 不需要登录，靠请求体的 HMAC 签名认证，
//! 因此以原始字节接收请求体。

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::debug;

use crate::api::constants::WEBHOOK_SIGNATURE_HEADER;
use crate::errors::LmsError;
use crate::services::{
    AuthUser, CreateOrderRequest, PaymentService, ValidatePromoRequest, VerifyPaymentRequest,
};

use super::helpers::{created_response, success_response};

pub async fn create_order(
    user: AuthUser,
    payments: web::Data<PaymentService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, LmsError> {
    let created = payments.create_order(&user, body.into_inner()).await?;
    Ok(created_response(created))
}

pub async fn verify_payment(
    user: AuthUser,
    payments: web::Data<PaymentService>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, LmsError> {
    let payment = payments.verify(&user, body.into_inner()).await?;
    Ok(success_response(payment))
}

pub async fn payment_webhook(
    req: HttpRequest,
    payments: web::Data<PaymentService>,
    body: web::Bytes,
) -> Result<HttpResponse, LmsError> {
    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    debug!("Payment webhook received ({} bytes)", body.len());

    let outcome = payments.handle_webhook(&body, signature).await?;
    Ok(success_response(outcome))
}

pub async fn list_my_payments(
    user: AuthUser,
    payments: web::Data<PaymentService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(payments.list_mine(&user.id).await?))
}

pub async fn validate_promo(
    _user: AuthUser,
    payments: web::Data<PaymentService>,
    body: web::Json<ValidatePromoRequest>,
) -> Result<HttpResponse, LmsError> {
    let preview = payments.validate_promo(body.into_inner()).await?;
    Ok(success_response(preview))
}

/// 支付路由 `/payments`
pub fn payments_routes() -> actix_web::Scope {
    web::scope("/payments")
        .route("", web::get().to(list_my_payments))
        .route("/orders", web::post().to(create_order))
        .route("/verify", web::post().to(verify_payment))
        .route("/webhook", web::post().to(payment_webhook))
}

/// 优惠码路由 `/promo-codes`
pub fn promo_routes() -> actix_web::Scope {
    web::scope("/promo-codes").route("/validate", web::post().to(validate_promo))
}
