//! 选课、进度与证书流水线集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use learnhub::services::LessonRequest;
use learnhub::services::certificate::blob_key_for;
use learnhub::storage::{CertificateStatus, EnrollmentStatus, NotificationKind};

#[actix_web::test]
async fn test_enroll_twice_is_rejected() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("twice@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Free Course", 0, 2).await;
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let enroll = || {
        TestRequest::post()
            .uri("/api/enrollments")
            .insert_header(auth.clone())
            .set_json(json!({ "course_id": course.id }))
            .to_request()
    };

    let resp = test::call_service(&app, enroll()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total_lessons"], 2);
    assert_eq!(body["data"]["completion_percentage"], 0);

    let resp = test::call_service(&app, enroll()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_paid_course_requires_payment() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("payer@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Paid Course", 4900, 1).await;
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/enrollments")
        .insert_header(auth)
        .set_json(json!({ "course_id": course.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn test_completing_all_lessons_issues_certificate() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let (_, student) = env
        .user("Linus Learner", "linus@learn.test", learnhub::storage::Role::Student)
        .await;
    let (course, lessons) = env.published_course(&instructor, "Systems 101", 0, 3).await;
    let enrollment = env.services.enrollments.enroll(&student, &course.id).await.unwrap();
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let complete = |lesson_id: &str| {
        TestRequest::post()
            .uri(&format!(
                "/api/enrollments/{}/lessons/{}/complete",
                enrollment.id, lesson_id
            ))
            .insert_header(auth.clone())
            .to_request()
    };

    let resp = test::call_service(&app, complete(&lessons[0].id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["enrollment"]["completion_percentage"], 33);
    assert_eq!(body["data"]["newly_recorded"], true);
    assert!(body["data"]["certificate"].is_null());

    // 重复完成同一课时不改变进度
    let resp = test::call_service(&app, complete(&lessons[0].id)).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["newly_recorded"], false);
    assert_eq!(body["data"]["enrollment"]["completed_lessons"], 1);

    test::call_service(&app, complete(&lessons[1].id)).await;
    let resp = test::call_service(&app, complete(&lessons[2].id)).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["enrollment"]["completion_percentage"], 100);
    assert_eq!(body["data"]["enrollment"]["status"], "completed");
    let cert_id = body["data"]["certificate"]["id"].as_str().unwrap().to_string();
    assert!(cert_id.starts_with("LH-"));
    assert_eq!(body["data"]["enrollment"]["certificate_id"], cert_id.as_str());

    // PDF 已上传
    assert!(env.blobs.contains(&blob_key_for(&cert_id)));

    // 公开验证无需登录
    let req = TestRequest::get().uri(&format!("/verify/{}", cert_id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["student_name"], "Linus Learner");
    assert_eq!(body["data"]["course_title"], "Systems 101");

    // 下载 PDF
    let req = TestRequest::get()
        .uri(&format!("/api/certificates/{}/download", cert_id))
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "application/pdf"
    );
    let pdf = test::read_body(resp).await;
    assert!(pdf.starts_with(b"%PDF"));

    let notifications = env
        .services
        .notifications
        .list_mine(&student.id, false)
        .await
        .unwrap();
    assert!(notifications.iter().any(|n| n.kind == NotificationKind::CourseCompleted));
    assert!(notifications.iter().any(|n| n.kind == NotificationKind::Certificate));
}

#[tokio::test]
async fn test_issuing_certificate_is_idempotent() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("idem@learn.test").await;
    let (course, lessons) = env.published_course(&instructor, "Once Only", 0, 1).await;
    let enrollment = env.services.enrollments.enroll(&student, &course.id).await.unwrap();

    let done = env
        .services
        .enrollments
        .complete_lesson(&enrollment.id, &lessons[0].id, &student)
        .await
        .unwrap();
    let first = done.certificate.expect("certificate issued");

    let again = env
        .services
        .certificates
        .issue_for_enrollment(&enrollment.id)
        .await
        .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(env.blobs.len(), 1);
}

#[tokio::test]
async fn test_incomplete_enrollment_cannot_get_certificate() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("halfway@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Halfway", 0, 2).await;
    let enrollment = env.services.enrollments.enroll(&student, &course.id).await.unwrap();

    let err = env
        .services
        .certificates
        .issue_for_enrollment(&enrollment.id)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    assert!(env.blobs.is_empty());
}

#[tokio::test]
async fn test_adding_lesson_lowers_progress_but_keeps_certificate() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("keeper@learn.test").await;
    let other = env.student("midway@learn.test").await;
    let (course, lessons) = env.published_course(&instructor, "Growing Course", 0, 2).await;
    let enrollments = &env.services.enrollments;

    let done = enrollments.enroll(&student, &course.id).await.unwrap();
    for lesson in &lessons {
        enrollments
            .complete_lesson(&done.id, &lesson.id, &student)
            .await
            .unwrap();
    }
    let partial = enrollments.enroll(&other, &course.id).await.unwrap();
    enrollments
        .complete_lesson(&partial.id, &lessons[0].id, &other)
        .await
        .unwrap();

    env.services
        .courses
        .add_lesson(
            &course.id,
            &instructor,
            LessonRequest {
                title: "Bonus".into(),
                content: String::new(),
                video_url: None,
                duration_minutes: 5,
            },
        )
        .await
        .unwrap();

    let finished = enrollments.progress(&done.id, &student).await.unwrap();
    assert_eq!(finished.total_lessons, 3);
    assert_eq!(finished.completion_percentage, 66);
    assert_eq!(finished.status, EnrollmentStatus::Completed);
    assert!(finished.certificate_id.is_some());

    let midway = enrollments.progress(&partial.id, &other).await.unwrap();
    assert_eq!(midway.total_lessons, 3);
    assert_eq!(midway.completion_percentage, 33);
    assert_eq!(midway.status, EnrollmentStatus::Active);
}

#[tokio::test]
async fn test_lesson_from_other_course_is_rejected() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("mixed@learn.test").await;
    let (course_a, _) = env.published_course(&instructor, "Course A", 0, 1).await;
    let (_, lessons_b) = env.published_course(&instructor, "Course B", 0, 1).await;
    let enrollment = env.services.enrollments.enroll(&student, &course_a.id).await.unwrap();

    let err = env
        .services
        .enrollments
        .complete_lesson(&enrollment.id, &lessons_b[0].id, &student)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_students_cannot_see_progress() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let owner = env.student("owner@learn.test").await;
    let stranger = env.student("stranger@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Private Progress", 0, 1).await;
    let enrollment = env.services.enrollments.enroll(&owner, &course.id).await.unwrap();

    let err = env
        .services
        .enrollments
        .progress(&enrollment.id, &stranger)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_revoked_certificate_is_reported_and_hidden() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("revoked@learn.test").await;
    let (course, lessons) = env.published_course(&instructor, "Revocable", 0, 1).await;
    let enrollment = env.services.enrollments.enroll(&student, &course.id).await.unwrap();
    let cert = env
        .services
        .enrollments
        .complete_lesson(&enrollment.id, &lessons[0].id, &student)
        .await
        .unwrap()
        .certificate
        .unwrap();
    let certificates = &env.services.certificates;

    assert!(certificates.revoke(&cert.id, "  ").await.is_err());

    let revoked = certificates.revoke(&cert.id, "Academic misconduct").await.unwrap();
    assert_eq!(revoked.status, CertificateStatus::Revoked);

    let err = certificates.revoke(&cert.id, "Again").await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::CONFLICT);

    let record = certificates.verify(&cert.id).await.unwrap();
    assert!(!record.valid);
    assert_eq!(record.revoke_reason.as_deref(), Some("Academic misconduct"));

    let err = certificates.public_file(&cert.blob_key).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
}
