//! Bearer token 认证中间件与 `AuthUser` 提取器
//!
//! 中间件只在请求携带 token 时校验：有效则把 `AuthUser` 放入 request extensions，
//! 无效直接返回 401；未携带 token 的请求原样放行，由 handler 的提取器决定是否需要登录。

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::CONTENT_TYPE,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::api::constants;
use crate::api::jwt::get_jwt_service;
use crate::api::services::{ApiResponse, ErrorCode};
use crate::errors::LmsError;
use crate::services::AuthUser;

/// Bearer token authentication middleware
#[derive(Clone, Default)]
pub struct BearerAuth;

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    /// Handle unauthorized requests
    fn handle_unauthorized(req: ServiceRequest, reason: &str) -> ServiceResponse<EitherBody<B>> {
        debug!("Bearer authentication failed: {}", reason);
        req.into_response(
            HttpResponse::Unauthorized()
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .json(ApiResponse::<()> {
                    code: ErrorCode::TokenInvalid as i32,
                    message: "Unauthorized: Invalid or expired token".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
    }

    /// EventSource 不能设置请求头，SSE 端点允许 `?access_token=`
    fn extract_stream_token(req: &ServiceRequest) -> Option<String> {
        if !req.path().ends_with(constants::STREAM_PATH_SUFFIX) {
            return None;
        }
        url::form_urlencoded::parse(req.query_string().as_bytes())
            .find(|(k, _)| k == constants::STREAM_TOKEN_PARAM)
            .map(|(_, v)| v.into_owned())
    }
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            let token = Self::extract_bearer_token(&req).or_else(|| Self::extract_stream_token(&req));

            if let Some(token) = token {
                match get_jwt_service().validate_access_token(&token) {
                    Ok(claims) => {
                        trace!("Bearer token accepted for user {}", claims.sub);
                        req.extensions_mut()
                            .insert(AuthUser::new(claims.sub, claims.role));
                    }
                    Err(e) => return Ok(Self::handle_unauthorized(req, &e.to_string())),
                }
            }

            let response = srv.call(req).await?.map_into_left_body();
            Ok(response)
        })
    }
}

/// handler 参数中声明 `AuthUser` 即要求登录；可选登录使用 `Option<AuthUser>`
impl FromRequest for AuthUser {
    type Error = LmsError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| LmsError::unauthorized("Authentication required")),
        )
    }
}

/// 要求管理员角色的提取器：未登录 401，非管理员 403
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = LmsError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| LmsError::unauthorized("Authentication required"))
            .and_then(|user| user.require_admin().map(|_| AdminUser(user)));
        ready(result)
    }
}

impl std::ops::Deref for AdminUser {
    type Target = AuthUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test, web};

    use crate::storage::Role;

    async fn whoami(user: Option<AuthUser>) -> HttpResponse {
        match user {
            Some(u) => HttpResponse::Ok().body(format!("{}:{}", u.id, u.role)),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    async fn private(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.id)
    }

    async fn admin_only(admin: AdminUser) -> HttpResponse {
        HttpResponse::Ok().body(admin.id.clone())
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .wrap(BearerAuth)
                    .route("/whoami", web::get().to(whoami))
                    .route("/private", web::get().to(private))
                    .route("/admin", web::get().to(admin_only))
                    .route("/events/stream", web::get().to(whoami)),
            )
            .await
        };
    }

    fn bearer(role: Role) -> String {
        let token = get_jwt_service()
            .generate_access_token("user-42", role)
            .unwrap();
        format!("Bearer {}", token)
    }

    #[actix_web::test]
    async fn test_anonymous_request_passes_through() {
        crate::config::init_config();
        let app = test_app!();
        let req = test::TestRequest::get().uri("/whoami").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "anonymous");
    }

    #[actix_web::test]
    async fn test_valid_token_sets_auth_user() {
        crate::config::init_config();
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", bearer(Role::Instructor)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "user-42:instructor");
    }

    #[actix_web::test]
    async fn test_invalid_token_is_rejected() {
        crate::config::init_config();
        let app = test_app!();
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_extractor_requires_login() {
        crate::config::init_config();
        let app = test_app!();
        let req = test::TestRequest::get().uri("/private").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_admin_extractor_checks_role() {
        crate::config::init_config();
        let app = test_app!();

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", bearer(Role::Student)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", bearer(Role::Admin)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn test_stream_accepts_query_token() {
        crate::config::init_config();
        let app = test_app!();
        let token = get_jwt_service()
            .generate_access_token("user-42", Role::Student)
            .unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/events/stream?access_token={}", token))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "user-42:student");

        // 非 SSE 路径不接受 query token
        let req = test::TestRequest::get()
            .uri(&format!("/whoami?access_token={}", token))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "anonymous");
    }
}
