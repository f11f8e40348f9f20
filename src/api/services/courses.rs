//! 课程、课时与课程聊天室 API `/courses`

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use ts_rs::TS;

use crate::errors::LmsError;
use crate::services::{
    AuthUser, ChatService, CourseQuery, CourseService, CreateCourseRequest, LessonRequest,
    UpdateCourseRequest, UpdateLessonRequest,
};

use super::TS_EXPORT_PATH;
use super::helpers::{created_response, message_response, paginated_response, success_response};
use super::sse::event_stream;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PostMessageRequest {
    pub body: String,
}

pub async fn list_courses(
    courses: web::Data<CourseService>,
    query: web::Query<CourseQuery>,
) -> Result<HttpResponse, LmsError> {
    let page = courses.list(&query).await?;
    Ok(paginated_response(page, |c| c))
}

pub async fn list_my_courses(
    user: AuthUser,
    courses: web::Data<CourseService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(courses.list_own(&user).await?))
}

pub async fn create_course(
    user: AuthUser,
    courses: web::Data<CourseService>,
    body: web::Json<CreateCourseRequest>,
) -> Result<HttpResponse, LmsError> {
    let course = courses.create(&user, body.into_inner()).await?;
    Ok(created_response(course))
}

/// 草稿课程只对作者和管理员可见
pub async fn get_course(
    user: Option<AuthUser>,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    let detail = courses.get(&path, user.as_ref()).await?;
    Ok(success_response(detail))
}

pub async fn update_course(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
    body: web::Json<UpdateCourseRequest>,
) -> Result<HttpResponse, LmsError> {
    let course = courses.update(&path, &user, body.into_inner()).await?;
    Ok(success_response(course))
}

pub async fn delete_course(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    courses.delete(&path, &user).await?;
    Ok(message_response("Course deleted"))
}

pub async fn publish_course(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(courses.set_published(&path, &user, true).await?))
}

pub async fn unpublish_course(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(courses.set_published(&path, &user, false).await?))
}

pub async fn list_lessons(
    user: Option<AuthUser>,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    let lessons = courses.list_lessons(&path, user.as_ref()).await?;
    Ok(success_response(lessons))
}

pub async fn add_lesson(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<String>,
    body: web::Json<LessonRequest>,
) -> Result<HttpResponse, LmsError> {
    let lesson = courses.add_lesson(&path, &user, body.into_inner()).await?;
    Ok(created_response(lesson))
}

pub async fn get_lesson(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, LmsError> {
    let (course_id, lesson_id) = path.into_inner();
    let lesson = courses.get_lesson(&course_id, &lesson_id, &user).await?;
    Ok(success_response(lesson))
}

pub async fn update_lesson(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateLessonRequest>,
) -> Result<HttpResponse, LmsError> {
    let (course_id, lesson_id) = path.into_inner();
    let lesson = courses
        .update_lesson(&course_id, &lesson_id, &user, body.into_inner())
        .await?;
    Ok(success_response(lesson))
}

pub async fn delete_lesson(
    user: AuthUser,
    courses: web::Data<CourseService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, LmsError> {
    let (course_id, lesson_id) = path.into_inner();
    courses.delete_lesson(&course_id, &lesson_id, &user).await?;
    Ok(message_response("Lesson deleted"))
}

pub async fn list_messages(
    user: AuthUser,
    chat: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(chat.list_messages(&path, &user).await?))
}

pub async fn post_message(
    user: AuthUser,
    chat: web::Data<ChatService>,
    path: web::Path<String>,
    body: web::Json<PostMessageRequest>,
) -> Result<HttpResponse, LmsError> {
    let message = chat.post_message(&path, &user, &body.body).await?;
    Ok(created_response(message))
}

/// 课程聊天室实时流
pub async fn stream_messages(
    user: AuthUser,
    chat: web::Data<ChatService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    let course = chat.ensure_room_access(&path, &user).await?;
    let rx = chat.bus().subscribe();
    let course_id = course.id;
    Ok(event_stream(rx, move |event| event.is_for_course(&course_id)))
}

/// 课程路由 `/courses`
///
/// 固定路径（`/mine`）必须注册在 `/{id}` 之前
pub fn courses_routes() -> actix_web::Scope {
    web::scope("/courses")
        .route("", web::get().to(list_courses))
        .route("", web::post().to(create_course))
        .route("/mine", web::get().to(list_my_courses))
        .route("/{id}", web::get().to(get_course))
        .route("/{id}", web::put().to(update_course))
        .route("/{id}", web::delete().to(delete_course))
        .route("/{id}/publish", web::post().to(publish_course))
        .route("/{id}/unpublish", web::post().to(unpublish_course))
        .route("/{id}/lessons", web::get().to(list_lessons))
        .route("/{id}/lessons", web::post().to(add_lesson))
        .route("/{id}/lessons/{lesson_id}", web::get().to(get_lesson))
        .route("/{id}/lessons/{lesson_id}", web::put().to(update_lesson))
        .route("/{id}/lessons/{lesson_id}", web::delete().to(delete_lesson))
        .route("/{id}/messages", web::get().to(list_messages))
        .route("/{id}/messages", web::post().to(post_message))
        .route("/{id}/messages/stream", web::get().to(stream_messages))
}
