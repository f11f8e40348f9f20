//! 账号 API 集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use learnhub::api::services::ErrorCode;
use learnhub::storage::Role;

#[actix_web::test]
async fn test_register_login_and_me() {
    let env = common::setup().await;
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Grace",
            "email": "Grace@Example.com",
            "password": common::PASSWORD,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["user"]["email"], "grace@example.com");
    assert_eq!(body["data"]["user"]["role"], "student");
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");

    let req = TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "grace@example.com", "password": common::PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let access = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    let req = TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", access)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["name"], "Grace");
    // 密码哈希不应出现在响应中
    assert!(body["data"].get("password_hash").is_none());
}

#[actix_web::test]
async fn test_duplicate_email_is_conflict() {
    let env = common::setup().await;
    env.student("dup@learn.test").await;
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Again",
            "email": "DUP@learn.test",
            "password": common::PASSWORD,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::Conflict as i32);
}

#[actix_web::test]
async fn test_login_with_wrong_password() {
    let env = common::setup().await;
    env.student("someone@learn.test").await;
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "someone@learn.test", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::AuthFailed as i32);
}

#[actix_web::test]
async fn test_short_password_and_bad_json_are_rejected() {
    let env = common::setup().await;
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": "Short", "email": "short@learn.test", "password": "abc" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/api/auth/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::PayloadInvalid as i32);
}

#[actix_web::test]
async fn test_refresh_rejects_access_token() {
    let env = common::setup().await;
    let (_, user) = env.user("Refresher", "refresh@learn.test", Role::Student).await;
    let tokens = learnhub::services::issue_tokens(&user.id, user.role).unwrap();
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": tokens.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": tokens.access_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_protected_routes_require_token() {
    let env = common::setup().await;
    let app = test_app!(env);

    let req = TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::TokenInvalid as i32);
}

#[tokio::test]
async fn test_register_with_referral_code_records_referral() {
    let env = common::setup().await;
    let (referrer, _) = env.user("Referrer", "referrer@learn.test", Role::Student).await;

    let session = env
        .services
        .auth
        .register(learnhub::services::RegisterRequest {
            name: "Friend".into(),
            email: "friend@learn.test".into(),
            password: common::PASSWORD.into(),
            referral_code: Some(referrer.referral_code.to_lowercase()),
        })
        .await
        .unwrap();

    let referrals = env
        .services
        .storage
        .list_referrals_by_referrer(&referrer.id)
        .await
        .unwrap();
    assert_eq!(referrals.len(), 1);
    assert_eq!(referrals[0].referee_id, session.user.id);

    let unknown = env
        .services
        .auth
        .register(learnhub::services::RegisterRequest {
            name: "Nobody".into(),
            email: "nobody@learn.test".into(),
            password: common::PASSWORD.into(),
            referral_code: Some("ZZZZZZZZ".into()),
        })
        .await;
    assert!(unknown.is_err());
}
