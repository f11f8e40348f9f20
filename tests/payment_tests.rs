//! 订单、签名校验、webhook、优惠码与推荐奖励

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use learnhub::services::{
    CreateOrderRequest, CreatePromoRequest, RegisterRequest, VerifyPaymentRequest, hmac_hex,
    payment_signature_payload,
};
use learnhub::storage::{PaymentStatus, ReferralStatus, Role};

fn sign(order_id: &str, payment_id: &str) -> String {
    let payload = payment_signature_payload(order_id, payment_id);
    hmac_hex(common::KEY_SECRET, payload.as_bytes()).unwrap()
}

#[actix_web::test]
async fn test_order_then_verified_payment_enrolls() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("buyer@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Paid Rust", 4900, 2).await;
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/payments/orders")
        .insert_header(auth.clone())
        .set_json(json!({ "course_id": course.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["enrolled"], false);
    assert_eq!(body["data"]["payment"]["amount_cents"], 4900);
    assert_eq!(body["data"]["payment"]["status"], "created");
    let order_id = body["data"]["payment"]["order_id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("order_"));

    let req = TestRequest::post()
        .uri("/api/payments/verify")
        .insert_header(auth.clone())
        .set_json(json!({
            "order_id": order_id,
            "payment_id": "pay_123",
            "signature": sign(&order_id, "pay_123"),
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["gateway_payment_id"], "pay_123");

    let enrollments = env.services.enrollments.list_mine(&student.id).await.unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].enrollment.course_id, course.id);

    // 已支付的订单再次校验原样返回
    let again = env
        .services
        .payments
        .verify(
            &student,
            VerifyPaymentRequest {
                order_id: order_id.clone(),
                payment_id: "pay_123".into(),
                signature: "ignored".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(again.status, PaymentStatus::Paid);

    // 已选课后不能再下单
    let req = TestRequest::post()
        .uri("/api/payments/orders")
        .insert_header(auth)
        .set_json(json!({ "course_id": course.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_bad_signature_marks_payment_failed() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("forger@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Forged", 1000, 1).await;
    let order = env
        .services
        .payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/payments/verify")
        .insert_header(auth)
        .set_json(json!({
            "order_id": order.payment.order_id,
            "payment_id": "pay_1",
            "signature": "00".repeat(32),
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 5000);

    let payments = env.services.payments.list_mine(&student.id).await.unwrap();
    assert_eq!(payments[0].status, PaymentStatus::Failed);
    assert!(env.services.enrollments.list_mine(&student.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cannot_verify_someone_elses_order() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let owner = env.student("order-owner@learn.test").await;
    let thief = env.student("thief@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Guarded", 1000, 1).await;
    let order = env
        .services
        .payments
        .create_order(
            &owner,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();
    let order_id = order.payment.order_id;

    let err = env
        .services
        .payments
        .verify(
            &thief,
            VerifyPaymentRequest {
                signature: sign(&order_id, "pay_x"),
                order_id,
                payment_id: "pay_x".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_webhook_requires_valid_signature() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("hooked@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Webhooks", 2500, 1).await;
    let order = env
        .services
        .payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();
    let app = test_app!(env);

    let payload = json!({
        "event": "payment.captured",
        "data": { "order_id": order.payment.order_id, "payment_id": "pay_hook" }
    })
    .to_string();

    let req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("X-Webhook-Signature", "deadbeef"))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let signature = hmac_hex(common::WEBHOOK_SECRET, payload.as_bytes()).unwrap();
    let req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("X-Webhook-Signature", signature.clone()))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["handled"], true);

    // 网关重发同一事件不会重复选课
    let req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("X-Webhook-Signature", signature))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let enrollments = env.services.enrollments.list_mine(&student.id).await.unwrap();
    assert_eq!(enrollments.len(), 1);
}

#[tokio::test]
async fn test_webhook_failure_and_unknown_events() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("declined@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Declined", 2500, 1).await;
    let payments = &env.services.payments;
    let order = payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();

    let send = |event: &str| {
        let body = json!({
            "event": event,
            "data": { "order_id": order.payment.order_id }
        })
        .to_string();
        let signature = hmac_hex(common::WEBHOOK_SECRET, body.as_bytes()).unwrap();
        (body, signature)
    };

    let (body, signature) = send("payment.authorized");
    let outcome = payments
        .handle_webhook(body.as_bytes(), Some(&signature))
        .await
        .unwrap();
    assert!(!outcome.handled);
    assert_eq!(outcome.status, PaymentStatus::Created);

    let (body, signature) = send("payment.failed");
    let outcome = payments
        .handle_webhook(body.as_bytes(), Some(&signature))
        .await
        .unwrap();
    assert!(outcome.handled);
    assert_eq!(outcome.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_promo_code_discount_and_usage() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("saver@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Discounted", 5000, 1).await;
    let payments = &env.services.payments;

    payments
        .create_promo(CreatePromoRequest {
            code: "launch20".into(),
            discount_percent: 20,
            max_uses: Some(1),
            expires_at: None,
        })
        .await
        .unwrap();

    let order = payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: Some("Launch20".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(order.payment.discount_cents, 1000);
    assert_eq!(order.payment.amount_cents, 4000);
    assert_eq!(order.payment.promo_code.as_deref(), Some("LAUNCH20"));

    // 下单即占用次数
    let promos = payments.list_promos().await.unwrap();
    assert_eq!(promos[0].used_count, 1);

    let order_id = order.payment.order_id;
    payments
        .verify(
            &student,
            VerifyPaymentRequest {
                signature: sign(&order_id, "pay_promo"),
                order_id,
                payment_id: "pay_promo".into(),
            },
        )
        .await
        .unwrap();

    let promos = payments.list_promos().await.unwrap();
    assert_eq!(promos[0].used_count, 1);

    // 次数用尽
    let other = env.student("late@learn.test").await;
    let err = payments
        .create_order(
            &other,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: Some("LAUNCH20".into()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_limited_promo_cannot_be_shared_by_pending_orders() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let first = env.student("early@learn.test").await;
    let second = env.student("eager@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Limited", 5000, 1).await;
    let payments = &env.services.payments;
    payments
        .create_promo(CreatePromoRequest {
            code: "SOLO".into(),
            discount_percent: 50,
            max_uses: Some(1),
            expires_at: None,
        })
        .await
        .unwrap();

    let order = |course_id: String| CreateOrderRequest {
        course_id,
        promo_code: Some("SOLO".into()),
    };
    let pending = payments
        .create_order(&first, order(course.id.clone()))
        .await
        .unwrap();
    assert_eq!(pending.payment.amount_cents, 2500);

    // 第一笔订单尚未支付，次数已被占用
    let err = payments
        .create_order(&second, order(course.id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

    let order_id = pending.payment.order_id;
    payments
        .verify(
            &first,
            VerifyPaymentRequest {
                signature: sign(&order_id, "pay_solo"),
                order_id,
                payment_id: "pay_solo".into(),
            },
        )
        .await
        .unwrap();

    let promos = payments.list_promos().await.unwrap();
    assert_eq!(promos[0].used_count, 1);
    assert!(
        !env.services
            .storage
            .claim_promo_use("SOLO")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_course_with_open_order_cannot_be_deleted() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("pending@learn.test").await;
    let (course, _) = env.published_course(&instructor, "In Checkout", 1500, 1).await;
    env.services
        .payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();

    let err = env
        .services
        .courses
        .delete(&course.id, &instructor)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::CONFLICT);
    assert!(
        env.services
            .courses
            .get(&course.id, Some(&instructor))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_failed_enrollment_leaves_order_verifiable() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("stranded@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Vanishing", 1500, 1).await;
    let payments = &env.services.payments;
    let order = payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: None,
            },
        )
        .await
        .unwrap();
    let order_id = order.payment.order_id;

    // 绕过服务层的删除检查，让选课失败
    env.services.storage.delete_course(&course.id).await.unwrap();

    let verify = || VerifyPaymentRequest {
        order_id: order_id.clone(),
        payment_id: "pay_lost".into(),
        signature: sign(&order_id, "pay_lost"),
    };
    let err = payments.verify(&student, verify()).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);

    let stored = env
        .services
        .storage
        .find_payment_by_order(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Created);

    // 订单没有被提前标记为 paid，再次校验仍然走完整流程
    let err = payments.verify(&student, verify()).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    assert!(
        env.services
            .enrollments
            .list_mine(&student.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[actix_web::test]
async fn test_validate_and_deactivate_promo() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("preview@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Preview", 999, 1).await;
    env.services
        .payments
        .create_promo(CreatePromoRequest {
            code: "HALF".into(),
            discount_percent: 50,
            max_uses: None,
            expires_at: None,
        })
        .await
        .unwrap();
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/promo-codes/validate")
        .insert_header(auth.clone())
        .set_json(json!({ "code": "half", "course_id": course.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["original_cents"], 999);
    assert_eq!(body["data"]["discount_cents"], 499);
    assert_eq!(body["data"]["final_cents"], 500);

    env.services.payments.deactivate_promo("half").await.unwrap();

    let req = TestRequest::post()
        .uri("/api/promo-codes/validate")
        .insert_header(auth)
        .set_json(json!({ "code": "HALF", "course_id": course.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_promo_definitions_are_rejected() {
    let env = common::setup().await;
    let payments = &env.services.payments;
    let promo = |code: &str, percent: i32| CreatePromoRequest {
        code: code.into(),
        discount_percent: percent,
        max_uses: None,
        expires_at: None,
    };

    assert!(payments.create_promo(promo("ZERO", 0)).await.is_err());
    assert!(payments.create_promo(promo("TOO-MUCH", 101)).await.is_err());
    assert!(payments.create_promo(promo("bad code", 10)).await.is_err());

    payments.create_promo(promo("ONCE", 10)).await.unwrap();
    let err = payments.create_promo(promo("once", 15)).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_full_discount_enrolls_immediately() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("lucky@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Gifted", 3000, 1).await;
    let payments = &env.services.payments;
    payments
        .create_promo(CreatePromoRequest {
            code: "FREEBIE".into(),
            discount_percent: 100,
            max_uses: None,
            expires_at: None,
        })
        .await
        .unwrap();

    let order = payments
        .create_order(
            &student,
            CreateOrderRequest {
                course_id: course.id.clone(),
                promo_code: Some("FREEBIE".into()),
            },
        )
        .await
        .unwrap();
    assert!(order.enrolled);
    assert_eq!(order.payment.amount_cents, 0);
    assert_eq!(order.payment.status, PaymentStatus::Paid);

    let enrollments = env.services.enrollments.list_mine(&student.id).await.unwrap();
    assert_eq!(enrollments.len(), 1);
}

#[tokio::test]
async fn test_referral_reward_credited_once() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let (referrer, referrer_auth) = env
        .user("Refer Rer", "referrer@learn.test", Role::Student)
        .await;
    let (first, _) = env.published_course(&instructor, "First Buy", 2000, 1).await;
    let (second, _) = env.published_course(&instructor, "Second Buy", 2000, 1).await;

    let session = env
        .services
        .auth
        .register(RegisterRequest {
            name: "New Friend".into(),
            email: "friend@learn.test".into(),
            password: common::PASSWORD.into(),
            referral_code: Some(referrer.referral_code.to_lowercase()),
        })
        .await
        .unwrap();
    let friend = learnhub::services::AuthUser::new(session.user.id.clone(), session.user.role);
    let payments = &env.services.payments;

    let overview = env.services.community.my_referrals(&referrer_auth).await.unwrap();
    assert_eq!(overview.referrals.len(), 1);
    assert_eq!(overview.referrals[0].status, ReferralStatus::Pending);

    for course in [&first, &second] {
        let order = payments
            .create_order(
                &friend,
                CreateOrderRequest {
                    course_id: course.id.clone(),
                    promo_code: None,
                },
            )
            .await
            .unwrap();
        let order_id = order.payment.order_id;
        payments
            .verify(
                &friend,
                VerifyPaymentRequest {
                    signature: sign(&order_id, "pay_ref"),
                    order_id,
                    payment_id: "pay_ref".into(),
                },
            )
            .await
            .unwrap();
    }

    let overview = env.services.community.my_referrals(&referrer_auth).await.unwrap();
    assert_eq!(overview.wallet_balance_cents, common::REFERRAL_REWARD_CENTS);
    assert_eq!(overview.referrals[0].status, ReferralStatus::Rewarded);
    assert_eq!(overview.referrals[0].reward_cents, common::REFERRAL_REWARD_CENTS);
}
