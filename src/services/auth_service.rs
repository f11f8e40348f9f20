//! Account service: registration, login, token refresh, profile

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::api::jwt::get_jwt_service;
use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::AuthUser;
use crate::storage::{NewUser, Role, SeaOrmStorage, User, UserProfile};
use crate::utils::generate_upper_code;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::validation::{validate_email, validate_password, validate_required};

/// 推荐码长度
pub const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 10;
const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[ts(type = "number")]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: AuthTokens,
}

/// 签发一对 access/refresh token
pub fn issue_tokens(user_id: &str, role: Role) -> Result<AuthTokens> {
    let jwt = get_jwt_service();
    Ok(AuthTokens {
        access_token: jwt.generate_access_token(user_id, role)?,
        refresh_token: jwt.generate_refresh_token(user_id, role)?,
        token_type: "Bearer".to_string(),
        expires_in: jwt.access_token_ttl_secs(),
    })
}

pub struct AuthService {
    storage: Arc<SeaOrmStorage>,
}

impl AuthService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    fn min_password_length() -> usize {
        crate::config::get_config().auth.min_password_length
    }

    async fn unique_referral_code(&self) -> Result<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_upper_code(REFERRAL_CODE_LEN);
            if !self.storage.referral_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(LmsError::internal("Could not allocate a unique referral code"))
    }

    /// 创建账号（注册与 CLI 共用）
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        referred_by: Option<&User>,
    ) -> Result<User> {
        let name = validate_required("name", name, MAX_NAME_CHARS)?;
        let email = validate_email(email)?;
        validate_password(password, Self::min_password_length())?;

        let password_hash = hash_password(password)?;
        let user = self
            .storage
            .insert_user(NewUser {
                name,
                email,
                password_hash,
                role,
                referral_code: self.unique_referral_code().await?,
                referred_by: referred_by.map(|u| u.id.clone()),
            })
            .await?;

        info!("User {} registered as {}", user.id, user.role);
        Ok(user)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthSession> {
        let referrer = match req
            .referral_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(
                self.storage
                    .find_user_by_referral_code(&code.to_uppercase())
                    .await?
                    .ok_or_else(|| LmsError::validation("Unknown referral code"))?,
            ),
            None => None,
        };

        let user = self
            .create_user(
                &req.name,
                &req.email,
                &req.password,
                Role::Student,
                referrer.as_ref(),
            )
            .await?;

        // 新账号不可能是推荐人自己
        if let Some(referrer) = &referrer
            && let Err(e) = self.storage.insert_referral(&referrer.id, &user.id).await
        {
            warn!(
                "Failed to record referral {} -> {}: {}",
                referrer.id, user.id, e
            );
        }

        Ok(AuthSession {
            tokens: issue_tokens(&user.id, user.role)?,
            user: UserProfile::from(&user),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession> {
        let email = req.email.trim().to_lowercase();
        let user = self
            .storage
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| LmsError::unauthorized("Invalid email or password"))?;

        if !verify_password(&req.password, &user.password_hash)? {
            warn!("Failed login attempt for {}", user.id);
            return Err(LmsError::unauthorized("Invalid email or password"));
        }
        if !user.is_active {
            return Err(LmsError::forbidden("Account is deactivated"));
        }

        info!("User {} logged in", user.id);
        Ok(AuthSession {
            tokens: issue_tokens(&user.id, user.role)?,
            user: UserProfile::from(&user),
        })
    }

    /// 用 refresh token 换新的 token 对；角色按当前库中的值签发
    pub async fn refresh(&self, req: RefreshRequest) -> Result<AuthTokens> {
        let claims = get_jwt_service().validate_refresh_token(&req.refresh_token)?;
        let user = self
            .storage
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| LmsError::unauthorized("User no longer exists"))?;
        if !user.is_active {
            return Err(LmsError::forbidden("Account is deactivated"));
        }
        issue_tokens(&user.id, user.role)
    }

    pub async fn current_user(&self, actor: &AuthUser) -> Result<User> {
        self.storage
            .find_user(&actor.id)
            .await?
            .ok_or_else(|| LmsError::unauthorized("User no longer exists"))
    }

    pub async fn me(&self, actor: &AuthUser) -> Result<UserProfile> {
        Ok(UserProfile::from(&self.current_user(actor).await?))
    }

    pub async fn update_profile(
        &self,
        actor: &AuthUser,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile> {
        let name = validate_required("name", &req.name, MAX_NAME_CHARS)?;
        let user = self.storage.update_user_name(&actor.id, name).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn change_password(&self, actor: &AuthUser, req: ChangePasswordRequest) -> Result<()> {
        let user = self.current_user(actor).await?;
        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(LmsError::unauthorized("Current password is incorrect"));
        }
        validate_password(&req.new_password, Self::min_password_length())?;

        let hash = hash_password(&req.new_password)?;
        self.storage.update_password_hash(&user.id, hash).await?;
        info!("User {} changed password", user.id);
        Ok(())
    }
}
