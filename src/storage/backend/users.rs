//! 用户表操作

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, ExprTrait,
    PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
};
use tracing::info;

use super::{SeaOrmStorage, is_unique_violation, model_to_user, page_index};
use crate::errors::{LmsError, Result};
use crate::storage::models::{Role, User};

use migration::entities::user;

/// 新用户（密码已哈希）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub referral_code: String,
    pub referred_by: Option<String>,
}

/// 管理后台用户列表过滤条件
#[derive(Default, Clone, Debug)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// 模糊匹配姓名或邮箱
    pub search: Option<String>,
}

impl SeaOrmStorage {
    /// 插入用户；邮箱或推荐码重复时返回 Conflict
    pub async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role.to_string()),
            referral_code: Set(new_user.referral_code),
            referred_by: Set(new_user.referred_by),
            wallet_balance_cents: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                LmsError::conflict("Email already registered")
            } else {
                LmsError::from(e)
            }
        })?;

        info!("User created: {} ({})", inserted.id, inserted.role);
        Ok(model_to_user(inserted))
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = self
            .retrying("find_user", || async {
                user::Entity::find_by_id(id).one(db).await
            })
            .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = self
            .retrying("find_user_by_email", || async {
                user::Entity::find()
                    .filter(user::Column::Email.eq(email))
                    .one(db)
                    .await
            })
            .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = self
            .retrying("find_user_by_referral_code", || async {
                user::Entity::find()
                    .filter(user::Column::ReferralCode.eq(code))
                    .one(db)
                    .await
            })
            .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn referral_code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.find_user_by_referral_code(code).await?.is_some())
    }

    /// 批量按 id 查询用户（证书、课程详情中的讲师名等）
    pub async fn find_users(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_user).collect())
    }

    async fn update_user_with(
        &self,
        id: &str,
        apply: impl FnOnce(&mut user::ActiveModel),
    ) -> Result<User> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("User not found: {}", id)))?;

        let mut active: user::ActiveModel = existing.into();
        apply(&mut active);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(model_to_user(updated))
    }

    pub async fn update_user_name(&self, id: &str, name: String) -> Result<User> {
        self.update_user_with(id, |m| m.name = Set(name)).await
    }

    pub async fn update_password_hash(&self, id: &str, password_hash: String) -> Result<User> {
        self.update_user_with(id, |m| m.password_hash = Set(password_hash))
            .await
    }

    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<User> {
        let updated = self
            .update_user_with(id, |m| m.role = Set(role.to_string()))
            .await?;
        info!("User {} role set to {}", id, role);
        Ok(updated)
    }

    pub async fn set_user_active(&self, id: &str, active: bool) -> Result<User> {
        let updated = self
            .update_user_with(id, |m| m.is_active = Set(active))
            .await?;
        info!("User {} active = {}", id, active);
        Ok(updated)
    }

    /// 钱包余额原子增加
    pub async fn credit_wallet(&self, user_id: &str, cents: i64) -> Result<()> {
        let result = user::Entity::update_many()
            .col_expr(
                user::Column::WalletBalanceCents,
                Expr::col(user::Column::WalletBalanceCents).add(Expr::val(cents)),
            )
            .col_expr(user::Column::UpdatedAt, Expr::val(Utc::now()))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(LmsError::not_found(format!("User not found: {}", user_id)));
        }
        Ok(())
    }

    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<User>, u64)> {
        let mut condition = Condition::all();
        if let Some(role) = filter.role {
            condition = condition.add(user::Column::Role.eq(role.to_string()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(user::Column::Name.contains(search))
                    .add(user::Column::Email.contains(search)),
            );
        }

        let db = &self.db;
        let total = self
            .retrying("list_users(count)", || async {
                user::Entity::find()
                    .filter(condition.clone())
                    .count(db)
                    .await
            })
            .await?;

        let models = self
            .retrying("list_users(data)", || async {
                user::Entity::find()
                    .filter(condition.clone())
                    .order_by_desc(user::Column::CreatedAt)
                    .paginate(db, page_size)
                    .fetch_page(page_index(page))
                    .await
            })
            .await?;

        Ok((models.into_iter().map(model_to_user).collect(), total))
    }
}
