//! 订单、优惠码、推荐奖励表操作

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, ExprTrait,
    PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
};
use tracing::info;

use super::{
    SeaOrmStorage, is_unique_violation, model_to_payment, model_to_promo, model_to_referral,
    page_index,
};
use crate::errors::{LmsError, Result};
use crate::storage::models::{Payment, PaymentStatus, PromoCode, Referral, ReferralStatus};

use migration::entities::{payment, promo_code, referral};

impl SeaOrmStorage {
    pub async fn insert_payment(&self, p: &Payment) -> Result<Payment> {
        let inserted = payment::ActiveModel {
            id: Set(p.id.clone()),
            order_id: Set(p.order_id.clone()),
            user_id: Set(p.user_id.clone()),
            course_id: Set(p.course_id.clone()),
            gateway_payment_id: Set(p.gateway_payment_id.clone()),
            amount_cents: Set(p.amount_cents),
            discount_cents: Set(p.discount_cents),
            currency: Set(p.currency.clone()),
            status: Set(p.status.to_string()),
            promo_code: Set(p.promo_code.clone()),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        }
        .insert(&self.db)
        .await?;

        info!(
            "Order created: {} amount={} {}",
            inserted.order_id, inserted.amount_cents, inserted.currency
        );
        Ok(model_to_payment(inserted))
    }

    pub async fn find_payment_by_order(&self, order_id: &str) -> Result<Option<Payment>> {
        let db = &self.db;
        let model = self
            .retrying("find_payment_by_order", || async {
                payment::Entity::find()
                    .filter(payment::Column::OrderId.eq(order_id))
                    .one(db)
                    .await
            })
            .await?;
        Ok(model.map(model_to_payment))
    }

    /// 将订单标记为已支付。只有首次转换返回 true，重复回调不会重复生效
    pub async fn mark_payment_paid(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<bool> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::val(PaymentStatus::Paid.to_string()),
            )
            .col_expr(
                payment::Column::GatewayPaymentId,
                Expr::val(gateway_payment_id.map(str::to_string)),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::val(Utc::now()))
            .filter(payment::Column::OrderId.eq(order_id))
            .filter(payment::Column::Status.ne(PaymentStatus::Paid.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 标记失败；已支付的订单保持不变
    pub async fn mark_payment_failed(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<bool> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::val(PaymentStatus::Failed.to_string()),
            )
            .col_expr(
                payment::Column::GatewayPaymentId,
                Expr::val(gateway_payment_id.map(str::to_string)),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::val(Utc::now()))
            .filter(payment::Column::OrderId.eq(order_id))
            .filter(payment::Column::Status.eq(PaymentStatus::Created.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_payments_by_user(&self, user_id: &str) -> Result<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_payment).collect())
    }

    pub async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Payment>, u64)> {
        let mut condition = Condition::all();
        if let Some(status) = status {
            condition = condition.add(payment::Column::Status.eq(status.to_string()));
        }

        let db = &self.db;
        let total = self
            .retrying("list_payments(count)", || async {
                payment::Entity::find()
                    .filter(condition.clone())
                    .count(db)
                    .await
            })
            .await?;
        let models = self
            .retrying("list_payments(data)", || async {
                payment::Entity::find()
                    .filter(condition.clone())
                    .order_by_desc(payment::Column::CreatedAt)
                    .paginate(db, page_size)
                    .fetch_page(page_index(page))
                    .await
            })
            .await?;

        Ok((models.into_iter().map(model_to_payment).collect(), total))
    }

    pub async fn count_paid_payments_for_user(&self, user_id: &str) -> Result<u64> {
        let count = payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .filter(payment::Column::Status.eq(PaymentStatus::Paid.to_string()))
            .filter(payment::Column::AmountCents.gt(0))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// 课程上未失败的订单数（created / paid）
    pub async fn count_open_payments_for_course(&self, course_id: &str) -> Result<u64> {
        let count = payment::Entity::find()
            .filter(payment::Column::CourseId.eq(course_id))
            .filter(payment::Column::Status.ne(PaymentStatus::Failed.to_string()))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    // ============================================================
    // 优惠码
    // ============================================================

    pub async fn insert_promo(&self, promo: &PromoCode) -> Result<PromoCode> {
        let inserted = promo_code::ActiveModel {
            code: Set(promo.code.clone()),
            discount_percent: Set(promo.discount_percent),
            max_uses: Set(promo.max_uses),
            used_count: Set(0),
            expires_at: Set(promo.expires_at),
            is_active: Set(true),
            created_at: Set(promo.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LmsError::conflict(format!("Promo code already exists: {}", promo.code))
            } else {
                LmsError::from(e)
            }
        })?;

        info!("Promo code created: {}", inserted.code);
        Ok(model_to_promo(inserted))
    }

    pub async fn find_promo(&self, code: &str) -> Result<Option<PromoCode>> {
        let model = promo_code::Entity::find_by_id(code).one(&self.db).await?;
        Ok(model.map(model_to_promo))
    }

    pub async fn list_promos(&self) -> Result<Vec<PromoCode>> {
        let models = promo_code::Entity::find()
            .order_by_desc(promo_code::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_promo).collect())
    }

    pub async fn deactivate_promo(&self, code: &str) -> Result<PromoCode> {
        let updated = promo_code::ActiveModel {
            code: Set(code.to_string()),
            is_active: Set(false),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                LmsError::not_found(format!("Promo code not found: {}", code))
            }
            other => LmsError::from(other),
        })?;
        Ok(model_to_promo(updated))
    }

    /// 占用一次优惠码；已停用或次数用尽时不更新，返回 false
    pub async fn claim_promo_use(&self, code: &str) -> Result<bool> {
        let result = promo_code::Entity::update_many()
            .col_expr(
                promo_code::Column::UsedCount,
                Expr::col(promo_code::Column::UsedCount).add(Expr::val(1)),
            )
            .filter(promo_code::Column::Code.eq(code))
            .filter(promo_code::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(promo_code::Column::MaxUses.is_null())
                    .add(
                        Expr::col(promo_code::Column::UsedCount)
                            .lt(Expr::col(promo_code::Column::MaxUses)),
                    ),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    // ============================================================
    // 推荐
    // ============================================================

    pub async fn insert_referral(&self, referrer_id: &str, referee_id: &str) -> Result<Referral> {
        let inserted = referral::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            referrer_id: Set(referrer_id.to_string()),
            referee_id: Set(referee_id.to_string()),
            reward_cents: Set(0),
            status: Set(ReferralStatus::Pending.to_string()),
            created_at: Set(Utc::now()),
            rewarded_at: Set(None),
        }
        .insert(&self.db)
        .await?;
        Ok(model_to_referral(inserted))
    }

    pub async fn find_referral_by_referee(&self, referee_id: &str) -> Result<Option<Referral>> {
        let model = referral::Entity::find()
            .filter(referral::Column::RefereeId.eq(referee_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_referral))
    }

    pub async fn list_referrals_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let models = referral::Entity::find()
            .filter(referral::Column::ReferrerId.eq(referrer_id))
            .order_by_desc(referral::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_referral).collect())
    }

    /// pending → rewarded；只有首次转换返回 true
    pub async fn mark_referral_rewarded(
        &self,
        referral_id: &str,
        reward_cents: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = referral::Entity::update_many()
            .col_expr(
                referral::Column::Status,
                Expr::val(ReferralStatus::Rewarded.to_string()),
            )
            .col_expr(referral::Column::RewardCents, Expr::val(reward_cents))
            .col_expr(referral::Column::RewardedAt, Expr::val(Some(at)))
            .filter(referral::Column::Id.eq(referral_id))
            .filter(referral::Column::Status.eq(ReferralStatus::Pending.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
