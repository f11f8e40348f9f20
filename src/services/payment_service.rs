//! Orders, gateway signature verification, promo codes and referral rewards
//!
//! 网关侧的下单与退款不在本服务内；这里只校验客户端回传的签名和网关 webhook。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::{
    AuthUser, EnrollmentService, NotificationService, Page, normalize_page,
};
use crate::storage::{
    Course, NotificationKind, Payment, PaymentStatus, PromoCode, ReferralStatus, SeaOrmStorage,
};
use crate::utils::generate_random_code;

type HmacSha256 = Hmac<Sha256>;

pub const ORDER_ID_PREFIX: &str = "order_";
const ORDER_ID_RANDOM_LEN: usize = 14;
const PROMO_CODE_MAX_LEN: usize = 32;

pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";
pub const EVENT_PAYMENT_FAILED: &str = "payment.failed";

/// hex(HMAC-SHA256(secret, message))
pub fn hmac_hex(secret: &str, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LmsError::internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 常量时间比较签名
pub fn verify_hmac_hex(secret: &str, message: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// 客户端回传签名的原文：`order_id|payment_id`
pub fn payment_signature_payload(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CreateOrderRequest {
    pub course_id: String,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct OrderCreated {
    pub payment: Payment,
    /// 金额为 0 时直接完成选课
    pub enrolled: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// 网关 webhook 负载
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookPayment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayment {
    pub order_id: String,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct WebhookOutcome {
    pub event: String,
    pub order_id: String,
    pub status: PaymentStatus,
    /// 未识别的事件类型只确认收到
    pub handled: bool,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PromoPreview {
    pub code: String,
    pub discount_percent: i32,
    #[ts(type = "number")]
    pub original_cents: i64,
    #[ts(type = "number")]
    pub discount_cents: i64,
    #[ts(type = "number")]
    pub final_cents: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CreatePromoRequest {
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn normalize_promo_code(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() || code.len() > PROMO_CODE_MAX_LEN {
        return Err(LmsError::validation(format!(
            "Promo code must be 1 to {} characters",
            PROMO_CODE_MAX_LEN
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LmsError::validation(
            "Promo code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code)
}

pub struct PaymentService {
    storage: Arc<SeaOrmStorage>,
    enrollments: Arc<EnrollmentService>,
    notifications: Arc<NotificationService>,
}

impl PaymentService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        enrollments: Arc<EnrollmentService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            storage,
            enrollments,
            notifications,
        }
    }

    async fn published_course(&self, course_id: &str) -> Result<Course> {
        self.storage
            .find_course(course_id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| LmsError::not_found(format!("Course not found: {}", course_id)))
    }

    /// 查找可用的优惠码，不可用时返回 400
    async fn redeemable_promo(&self, code: &str) -> Result<PromoCode> {
        let code = normalize_promo_code(code)?;
        self.storage
            .find_promo(&code)
            .await?
            .filter(|p| p.is_redeemable(Utc::now()))
            .ok_or_else(|| LmsError::validation(format!("Promo code {} is not valid", code)))
    }

    pub async fn create_order(&self, actor: &AuthUser, req: CreateOrderRequest) -> Result<OrderCreated> {
        let course = self.published_course(&req.course_id).await?;
        if self
            .storage
            .find_enrollment_for(&actor.id, &course.id)
            .await?
            .is_some()
        {
            return Err(LmsError::validation("Already enrolled in this course"));
        }

        let promo = match req.promo_code.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(code) => Some(self.redeemable_promo(code).await?),
            None => None,
        };
        let discount_cents = promo
            .as_ref()
            .map_or(0, |p| p.discount_for(course.price_cents));
        let amount_cents = course.price_cents - discount_cents;

        // 下单即占用次数，未支付的订单同样计入 max_uses
        if let Some(promo) = &promo
            && !self.storage.claim_promo_use(&promo.code).await?
        {
            return Err(LmsError::validation(format!(
                "Promo code {} is not valid",
                promo.code
            )));
        }

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: format!(
                "{}{}",
                ORDER_ID_PREFIX,
                generate_random_code(ORDER_ID_RANDOM_LEN)
            ),
            user_id: actor.id.clone(),
            course_id: course.id.clone(),
            gateway_payment_id: None,
            amount_cents,
            discount_cents,
            currency: course.currency.clone(),
            status: PaymentStatus::Created,
            promo_code: promo.map(|p| p.code),
            created_at: now,
            updated_at: now,
        };
        let payment = self.storage.insert_payment(&payment).await?;

        if amount_cents == 0 {
            let payment = self.fulfil(&payment, None).await?;
            return Ok(OrderCreated {
                payment,
                enrolled: true,
            });
        }

        Ok(OrderCreated {
            payment,
            enrolled: false,
        })
    }

    async fn find_order(&self, order_id: &str) -> Result<Payment> {
        self.storage
            .find_payment_by_order(order_id)
            .await?
            .ok_or_else(|| LmsError::not_found(format!("Order not found: {}", order_id)))
    }

    /// 校验客户端回传的支付签名
    pub async fn verify(&self, actor: &AuthUser, req: VerifyPaymentRequest) -> Result<Payment> {
        let payment = self.find_order(&req.order_id).await?;
        if !actor.owns_or_admin(&payment.user_id) {
            return Err(LmsError::forbidden("Not your order"));
        }
        if payment.status == PaymentStatus::Paid {
            return Ok(payment);
        }

        let secret = &crate::config::get_config().payments.key_secret;
        let message = payment_signature_payload(&req.order_id, &req.payment_id);
        if !verify_hmac_hex(secret, message.as_bytes(), &req.signature) {
            warn!("Payment signature mismatch for order {}", req.order_id);
            self.storage
                .mark_payment_failed(&req.order_id, Some(&req.payment_id))
                .await?;
            return Err(LmsError::payment("Payment signature verification failed"));
        }

        self.fulfil(&payment, Some(&req.payment_id)).await
    }

    /// 网关 webhook；签名为原始请求体的 HMAC
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let secret = &crate::config::get_config().payments.webhook_secret;
        let signature =
            signature.ok_or_else(|| LmsError::unauthorized("Missing webhook signature"))?;
        if !verify_hmac_hex(secret, body, signature) {
            warn!("Rejected webhook with invalid signature");
            return Err(LmsError::unauthorized("Invalid webhook signature"));
        }

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| LmsError::validation(format!("Invalid webhook payload: {}", e)))?;
        let payment = self.find_order(&event.data.order_id).await?;
        let gateway_id = event.data.payment_id.as_deref();

        let (status, handled) = match event.event.as_str() {
            EVENT_PAYMENT_CAPTURED => (self.fulfil(&payment, gateway_id).await?.status, true),
            EVENT_PAYMENT_FAILED => {
                self.storage
                    .mark_payment_failed(&payment.order_id, gateway_id)
                    .await?;
                (self.find_order(&payment.order_id).await?.status, true)
            }
            other => {
                debug!("Ignoring webhook event {}", other);
                (payment.status, false)
            }
        };

        info!(
            "Webhook {} for order {} → {}",
            event.event, payment.order_id, status
        );
        Ok(WebhookOutcome {
            event: event.event,
            order_id: payment.order_id,
            status,
            handled,
        })
    }

    /// 支付成功的副作用：选课、推荐奖励、通知。
    /// 先选课后标记 paid，选课失败时订单状态不变。
    /// 只有首次 paid 转换会发奖励和通知；选课本身幂等。
    async fn fulfil(&self, payment: &Payment, gateway_payment_id: Option<&str>) -> Result<Payment> {
        self.enrollments
            .enroll_from_payment(&payment.user_id, &payment.course_id)
            .await?;

        let first_transition = self
            .storage
            .mark_payment_paid(&payment.order_id, gateway_payment_id)
            .await?;

        if first_transition {
            info!(
                "Order {} paid: {} {}",
                payment.order_id, payment.amount_cents, payment.currency
            );
            if payment.amount_cents > 0 {
                self.notifications
                    .notify(
                        &payment.user_id,
                        NotificationKind::Payment,
                        "Payment received",
                        format!(
                            "We received your payment for order {}.",
                            payment.order_id
                        ),
                    )
                    .await;
                self.reward_referrer(&payment.user_id).await;
            }
        }

        self.find_order(&payment.order_id).await
    }

    /// 被推荐人的首笔付费订单给推荐人发放奖励
    async fn reward_referrer(&self, referee_id: &str) {
        if let Err(e) = self.try_reward_referrer(referee_id).await {
            warn!("Referral reward for {} failed: {}", referee_id, e);
        }
    }

    async fn try_reward_referrer(&self, referee_id: &str) -> Result<()> {
        if self.storage.count_paid_payments_for_user(referee_id).await? != 1 {
            return Ok(());
        }
        let Some(referral) = self.storage.find_referral_by_referee(referee_id).await? else {
            return Ok(());
        };
        if referral.status != ReferralStatus::Pending {
            return Ok(());
        }

        let reward = crate::config::get_config().referral.reward_cents;
        if !self
            .storage
            .mark_referral_rewarded(&referral.id, reward, Utc::now())
            .await?
        {
            return Ok(());
        }
        self.storage
            .credit_wallet(&referral.referrer_id, reward)
            .await?;

        info!(
            "Referral {} rewarded: {} cents to {}",
            referral.id, reward, referral.referrer_id
        );
        self.notifications
            .notify(
                &referral.referrer_id,
                NotificationKind::ReferralReward,
                "Referral reward earned",
                format!(
                    "A friend you referred made their first purchase. {} cents were added to your wallet.",
                    reward
                ),
            )
            .await;
        Ok(())
    }

    pub async fn list_mine(&self, user_id: &str) -> Result<Vec<Payment>> {
        self.storage.list_payments_by_user(user_id).await
    }

    pub async fn list_all(
        &self,
        status: Option<PaymentStatus>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page<Payment>> {
        let (page, page_size) = normalize_page(page, page_size)?;
        let (items, total) = self.storage.list_payments(status, page, page_size).await?;
        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    // ============ Promo codes ============

    pub async fn validate_promo(&self, req: ValidatePromoRequest) -> Result<PromoPreview> {
        let course = self.published_course(&req.course_id).await?;
        let promo = self.redeemable_promo(&req.code).await?;
        let discount_cents = promo.discount_for(course.price_cents);
        Ok(PromoPreview {
            code: promo.code,
            discount_percent: promo.discount_percent,
            original_cents: course.price_cents,
            discount_cents,
            final_cents: course.price_cents - discount_cents,
        })
    }

    pub async fn create_promo(&self, req: CreatePromoRequest) -> Result<PromoCode> {
        let code = normalize_promo_code(&req.code)?;
        if !(1..=100).contains(&req.discount_percent) {
            return Err(LmsError::validation("discount_percent must be between 1 and 100"));
        }
        if req.max_uses.is_some_and(|m| m < 1) {
            return Err(LmsError::validation("max_uses must be >= 1"));
        }
        let now = Utc::now();
        if req.expires_at.is_some_and(|exp| exp <= now) {
            return Err(LmsError::validation("expires_at must be in the future"));
        }

        let promo = PromoCode {
            code,
            discount_percent: req.discount_percent,
            max_uses: req.max_uses,
            used_count: 0,
            expires_at: req.expires_at,
            is_active: true,
            created_at: now,
        };
        let promo = self.storage.insert_promo(&promo).await?;
        info!("Promo code {} created ({}%)", promo.code, promo.discount_percent);
        Ok(promo)
    }

    pub async fn list_promos(&self) -> Result<Vec<PromoCode>> {
        self.storage.list_promos().await
    }

    pub async fn deactivate_promo(&self, code: &str) -> Result<PromoCode> {
        let code = normalize_promo_code(code)?;
        self.storage.deactivate_promo(&code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_hex_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            hmac_hex("Jefe", b"what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_hmac_hex() {
        let payload = payment_signature_payload("order_abc", "pay_123");
        assert_eq!(payload, "order_abc|pay_123");

        let sig = hmac_hex("secret", payload.as_bytes()).unwrap();
        assert!(verify_hmac_hex("secret", payload.as_bytes(), &sig));
        assert!(verify_hmac_hex("secret", payload.as_bytes(), &sig.to_uppercase()));
        assert!(!verify_hmac_hex("other", payload.as_bytes(), &sig));
        assert!(!verify_hmac_hex("secret", b"order_abc|pay_124", &sig));
        assert!(!verify_hmac_hex("secret", payload.as_bytes(), "not-hex"));
    }

    #[test]
    fn test_normalize_promo_code() {
        assert_eq!(normalize_promo_code(" spring-25 ").unwrap(), "SPRING-25");
        assert!(normalize_promo_code("").is_err());
        assert!(normalize_promo_code("bad code").is_err());
        assert!(normalize_promo_code(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_webhook_event_parses() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"event":"payment.captured","data":{"order_id":"order_1","payment_id":"pay_1"}}"#,
        )
        .unwrap();
        assert_eq!(event.event, EVENT_PAYMENT_CAPTURED);
        assert_eq!(event.data.payment_id.as_deref(), Some("pay_1"));
    }
}
