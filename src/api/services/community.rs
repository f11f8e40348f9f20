//! 联系表单与推荐计划 API

use actix_web::{HttpResponse, web};

use crate::errors::LmsError;
use crate::services::{AuthUser, CommunityService, ContactRequest};

use super::helpers::{created_response, success_response};

/// 匿名可提交
pub async fn submit_contact(
    community: web::Data<CommunityService>,
    body: web::Json<ContactRequest>,
) -> Result<HttpResponse, LmsError> {
    let contact = community.submit_contact(body.into_inner()).await?;
    Ok(created_response(contact))
}

pub async fn my_referrals(
    user: AuthUser,
    community: web::Data<CommunityService>,
) -> Result<HttpResponse, LmsError> {
    Ok(success_response(community.my_referrals(&user).await?))
}

pub fn community_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/contact", web::post().to(submit_contact))
        .route("/referrals", web::get().to(my_referrals));
}
