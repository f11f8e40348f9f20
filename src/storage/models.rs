//! 领域模型
//!
//! Storage returns these instead of raw entity models. They double as API
//! response shapes and are exported to TypeScript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use ts_rs::TS;

use crate::api::services::TS_EXPORT_PATH;

/// 用户角色
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CertificateStatus {
    Valid,
    Revoked,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContactStatus {
    Open,
    Resolved,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Rewarded,
}

/// 通知类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Enrollment,
    CourseCompleted,
    Certificate,
    Payment,
    ReferralReward,
    System,
}

/// 用户（包含密码哈希，不直接序列化给客户端）
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub wallet_balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 对外暴露的用户资料
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub referral_code: String,
    #[ts(type = "number")]
    pub wallet_balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            referral_code: user.referral_code.clone(),
            wallet_balance_cents: user.wallet_balance_cents,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub level: CourseLevel,
    #[ts(type = "number")]
    pub price_cents: i64,
    pub currency: String,
    pub instructor_id: String,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub video_url: Option<String>,
    pub position: i32,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

/// 课程详情页中的课时摘要（不含正文）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub position: i32,
    pub duration_minutes: i32,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id.clone(),
            title: lesson.title.clone(),
            position: lesson.position,
            duration_minutes: lesson.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub completion_percentage: i32,
    pub certificate_id: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    pub course_id: String,
    pub gateway_payment_id: Option<String>,
    #[ts(type = "number")]
    pub amount_cents: i64,
    #[ts(type = "number")]
    pub discount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub promo_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PromoCode {
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// 当前是否可用（激活、未过期、未用尽）
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.is_none_or(|exp| exp > now)
            && self.max_uses.is_none_or(|max| self.used_count < max)
    }

    /// 按折扣比例计算减免金额（向下取整）
    pub fn discount_for(&self, price_cents: i64) -> i64 {
        price_cents * i64::from(self.discount_percent.clamp(0, 100)) / 100
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Certificate {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub enrollment_id: String,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub blob_key: String,
    pub pdf_url: String,
    pub status: CertificateStatus,
    pub issued_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoke_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referee_id: String,
    #[ts(type = "number")]
    pub reward_cents: i64,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
    pub rewarded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ChatMessage {
    pub id: String,
    pub course_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn promo(max_uses: Option<i32>, used: i32, expires_in: Option<i64>) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            code: "SPRING".into(),
            discount_percent: 25,
            max_uses,
            used_count: used,
            expires_at: expires_in.map(|h| now + Duration::hours(h)),
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn test_role_round_trip_via_strum() {
        assert_eq!(Role::from_str("instructor").unwrap(), Role::Instructor);
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert!(Role::from_str("tutor").is_err());
        assert!(Role::Instructor.can_author());
        assert!(!Role::Student.can_author());
    }

    #[test]
    fn test_notification_kind_snake_case() {
        assert_eq!(NotificationKind::ReferralReward.as_ref(), "referral_reward");
        assert_eq!(
            serde_json::to_string(&NotificationKind::CourseCompleted).unwrap(),
            "\"course_completed\""
        );
    }

    #[test]
    fn test_promo_redeemable() {
        let now = Utc::now();
        assert!(promo(None, 100, None).is_redeemable(now));
        assert!(promo(Some(2), 1, Some(1)).is_redeemable(now));
        assert!(!promo(Some(2), 2, None).is_redeemable(now));
        assert!(!promo(None, 0, Some(-1)).is_redeemable(now));

        let mut inactive = promo(None, 0, None);
        inactive.is_active = false;
        assert!(!inactive.is_redeemable(now));
    }

    #[test]
    fn test_promo_discount_floors() {
        let p = promo(None, 0, None);
        assert_eq!(p.discount_for(1999), 499);
        assert_eq!(p.discount_for(0), 0);
    }
}
