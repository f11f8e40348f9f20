//! 课程与课时 API 集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

#[actix_web::test]
async fn test_instructor_creates_and_publishes_course() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let auth = env.bearer(&instructor);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/courses")
        .insert_header(auth.clone())
        .set_json(json!({
            "title": "Rust for Backend Developers",
            "description": "Ownership, async and more",
            "category": "programming",
            "price_cents": 0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let course_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["slug"], "rust-for-backend-developers");
    assert_eq!(body["data"]["is_published"], false);
    assert_eq!(body["data"]["level"], "beginner");

    // 没有课时不能发布
    let req = TestRequest::post()
        .uri(&format!("/api/courses/{}/publish", course_id))
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri(&format!("/api/courses/{}/lessons", course_id))
        .insert_header(auth.clone())
        .set_json(json!({ "title": "Ownership", "content": "Moves and borrows", "duration_minutes": 15 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["position"], 1);

    let req = TestRequest::post()
        .uri(&format!("/api/courses/{}/publish", course_id))
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 匿名用户可以按 slug 查看已发布课程
    let req = TestRequest::get()
        .uri("/api/courses/rust-for-backend-developers")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["lesson_count"], 1);
    assert_eq!(body["data"]["instructor_name"], "Ada Instructor");
}

#[actix_web::test]
async fn test_draft_course_hidden_from_public_and_students() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("curious@learn.test").await;
    let course = env
        .services
        .courses
        .create(
            &instructor,
            learnhub::services::CreateCourseRequest {
                title: "Secret Draft".into(),
                description: String::new(),
                category: String::new(),
                level: None,
                price_cents: 0,
                thumbnail_url: None,
            },
        )
        .await
        .unwrap();
    let student_auth = env.bearer(&student);
    let instructor_auth = env.bearer(&instructor);
    let app = test_app!(env);

    let uri = format!("/api/courses/{}", course.id);
    let resp = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri(&uri).insert_header(student_auth).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri(&uri).insert_header(instructor_auth).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 目录只列出已发布课程
    let resp = test::call_service(&app, TestRequest::get().uri("/api/courses").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[actix_web::test]
async fn test_students_cannot_author_courses() {
    let env = common::setup().await;
    let student = env.student("student@learn.test").await;
    let auth = env.bearer(&student);
    let app = test_app!(env);

    let req = TestRequest::post()
        .uri("/api/courses")
        .insert_header(auth)
        .set_json(json!({ "title": "Nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_catalog_search_and_pagination() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    for title in ["Intro to Rust", "Advanced Rust", "Cooking Basics"] {
        env.published_course(&instructor, title, 0, 1).await;
    }
    let app = test_app!(env);

    let req = TestRequest::get()
        .uri("/api/courses?search=rust&page=1&page_size=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = TestRequest::get().uri("/api/courses?page_size=1000").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_titles_get_unique_slugs() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let (first, _) = env.published_course(&instructor, "Data Science", 0, 1).await;
    let (second, _) = env.published_course(&instructor, "Data Science", 0, 1).await;

    assert_eq!(first.slug, "data-science");
    assert_eq!(second.slug, "data-science-2");
}

#[tokio::test]
async fn test_course_with_enrollments_cannot_be_deleted() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("enrolled@learn.test").await;
    let (course, _) = env.published_course(&instructor, "Keep Me", 0, 2).await;
    env.services.enrollments.enroll(&student, &course.id).await.unwrap();

    let err = env
        .services
        .courses
        .delete(&course.id, &instructor)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_lesson_content_requires_enrollment() {
    let env = common::setup().await;
    let instructor = env.instructor().await;
    let student = env.student("viewer@learn.test").await;
    let (course, lessons) = env.published_course(&instructor, "Gated", 0, 1).await;
    let courses = &env.services.courses;

    let err = courses
        .get_lesson(&course.id, &lessons[0].id, &student)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), StatusCode::FORBIDDEN);

    env.services.enrollments.enroll(&student, &course.id).await.unwrap();
    let lesson = courses
        .get_lesson(&course.id, &lessons[0].id, &student)
        .await
        .unwrap();
    assert_eq!(lesson.content, "Body");
}
