//! 账号 API `/auth`

use actix_web::{HttpResponse, web};
use tracing::trace;

use crate::errors::LmsError;
use crate::services::{
    AuthService, AuthUser, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    UpdateProfileRequest,
};

use super::helpers::{created_response, message_response, success_response};

pub async fn register(
    auth: web::Data<AuthService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, LmsError> {
    trace!("Auth API: register {}", body.email);
    let session = auth.register(body.into_inner()).await?;
    Ok(created_response(session))
}

pub async fn login(
    auth: web::Data<AuthService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, LmsError> {
    let session = auth.login(body.into_inner()).await?;
    Ok(success_response(session))
}

pub async fn refresh(
    auth: web::Data<AuthService>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, LmsError> {
    let tokens = auth.refresh(body.into_inner()).await?;
    Ok(success_response(tokens))
}

pub async fn me(user: AuthUser, auth: web::Data<AuthService>) -> Result<HttpResponse, LmsError> {
    Ok(success_response(auth.me(&user).await?))
}

pub async fn update_me(
    user: AuthUser,
    auth: web::Data<AuthService>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, LmsError> {
    let profile = auth.update_profile(&user, body.into_inner()).await?;
    Ok(success_response(profile))
}

pub async fn change_password(
    user: AuthUser,
    auth: web::Data<AuthService>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, LmsError> {
    auth.change_password(&user, body.into_inner()).await?;
    Ok(message_response("Password updated"))
}

/// 认证路由 `/auth`
///
/// - POST /auth/register
/// - POST /auth/login
/// - POST /auth/refresh
/// - GET/PUT /auth/me
/// - PUT /auth/me/password
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/refresh", web::post().to(refresh))
        .route("/me", web::get().to(me))
        .route("/me", web::put().to(update_me))
        .route("/me/password", web::put().to(change_password))
}
