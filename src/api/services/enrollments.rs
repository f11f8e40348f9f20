//! 选课与学习进度 API `/enrollments`

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use ts_rs::TS;

use crate::errors::LmsError;
use crate::services::{AuthUser, EnrollmentService};

use super::TS_EXPORT_PATH;
use super::helpers::{created_response, success_response};

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct EnrollRequest {
    pub course_id: String,
}

/// 免费课程直接选课；付费课程返回 402，需走订单流程
pub async fn enroll(
    user: AuthUser,
    enrollments: web::Data<EnrollmentService>,
    body: web::Json<EnrollRequest>,
) -> Result<HttpResponse, LmsError> {
    let enrollment = enrollments.enroll(&user, &body.course_id).await?;
    Ok(created_response(enrollment))
}

pub async fn list_my_enrollments(
    user: AuthUser,
    enrollments: web::Data<EnrollmentService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(enrollments.list_mine(&user.id).await?))
}

pub async fn get_enrollment(
    user: AuthUser,
    enrollments: web::Data<EnrollmentService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(enrollments.get(&path, &user).await?))
}

pub async fn get_progress(
    user: AuthUser,
    enrollments: web::Data<EnrollmentService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(enrollments.progress(&path, &user).await?))
}

pub async fn complete_lesson(
    user: AuthUser,
    enrollments: web::Data<EnrollmentService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, LmsError> {
    let (enrollment_id, lesson_id) = path.into_inner();
    let completion = enrollments
        .complete_lesson(&enrollment_id, &lesson_id, &user)
        .await?;
    Ok(success_response(completion))
}

/// 选课路由 `/enrollments`
pub fn enrollments_routes() -> actix_web::Scope {
    web::scope("/enrollments")
        .route("", web::post().to(enroll))
        .route("", web::get().to(list_my_enrollments))
        .route("/{id}", web::get().to(get_enrollment))
        .route("/{id}/progress", web::get().to(get_progress))
        .route(
            "/{id}/lessons/{lesson_id}/complete",
            web::post().to(complete_lesson),
        )
}
