//! 讲师面板 API `/instructor`

use actix_web::{HttpResponse, web};

use crate::errors::LmsError;
use crate::services::{AdminService, AuthUser, CourseService};

use super::helpers::success_response;

pub async fn dashboard(
    user: AuthUser,
    admin: web::Data<AdminService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(admin.instructor_dashboard(&user).await?))
}

/// 包含草稿在内的自有课程
pub async fn my_courses(
    user: AuthUser,
    courses: web::Data<CourseService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(courses.list_own(&user).await?))
}

pub fn instructor_routes() -> actix_web::Scope {
    web::scope("/instructor")
        .route("/dashboard", web::get().to(dashboard))
        .route("/courses", web::get().to(my_courses))
}
