//! Entity model → 领域模型转换

use std::str::FromStr;

use tracing::warn;

use crate::storage::models::*;
use migration::entities::{
    certificate, contact, course, enrollment, lesson, message, notification, payment, promo_code,
    referral, user,
};

/// 解析存储为字符串的枚举列，未知值回退到 `fallback`
fn parse_or<T: FromStr>(raw: &str, column: &str, fallback: T) -> T {
    T::from_str(raw).unwrap_or_else(|_| {
        warn!("Unknown value '{}' in column {}, using fallback", raw, column);
        fallback
    })
}

pub fn model_to_user(model: user::Model) -> User {
    User {
        role: parse_or(&model.role, "users.role", Role::Student),
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        referral_code: model.referral_code,
        referred_by: model.referred_by,
        wallet_balance_cents: model.wallet_balance_cents,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_course(model: course::Model) -> Course {
    Course {
        level: parse_or(&model.level, "courses.level", CourseLevel::Beginner),
        id: model.id,
        title: model.title,
        slug: model.slug,
        description: model.description,
        category: model.category,
        price_cents: model.price_cents,
        currency: model.currency,
        instructor_id: model.instructor_id,
        thumbnail_url: model.thumbnail_url,
        is_published: model.is_published,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_lesson(model: lesson::Model) -> Lesson {
    Lesson {
        id: model.id,
        course_id: model.course_id,
        title: model.title,
        content: model.content,
        video_url: model.video_url,
        position: model.position,
        duration_minutes: model.duration_minutes,
        created_at: model.created_at,
    }
}

pub fn model_to_enrollment(model: enrollment::Model) -> Enrollment {
    Enrollment {
        status: parse_or(
            &model.status,
            "enrollments.status",
            EnrollmentStatus::Active,
        ),
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        completed_lessons: model.completed_lessons,
        total_lessons: model.total_lessons,
        completion_percentage: model.completion_percentage,
        certificate_id: model.certificate_id,
        enrolled_at: model.enrolled_at,
        completed_at: model.completed_at,
        last_accessed_at: model.last_accessed_at,
    }
}

pub fn model_to_payment(model: payment::Model) -> Payment {
    Payment {
        status: parse_or(&model.status, "payments.status", PaymentStatus::Created),
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        course_id: model.course_id,
        gateway_payment_id: model.gateway_payment_id,
        amount_cents: model.amount_cents,
        discount_cents: model.discount_cents,
        currency: model.currency,
        promo_code: model.promo_code,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_promo(model: promo_code::Model) -> PromoCode {
    PromoCode {
        code: model.code,
        discount_percent: model.discount_percent,
        max_uses: model.max_uses,
        used_count: model.used_count,
        expires_at: model.expires_at,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub fn model_to_certificate(model: certificate::Model) -> Certificate {
    Certificate {
        status: parse_or(
            &model.status,
            "certificates.status",
            CertificateStatus::Valid,
        ),
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        enrollment_id: model.enrollment_id,
        student_name: model.student_name,
        course_title: model.course_title,
        instructor_name: model.instructor_name,
        blob_key: model.blob_key,
        pdf_url: model.pdf_url,
        issued_at: model.issued_at,
        revoked_at: model.revoked_at,
        revoke_reason: model.revoke_reason,
    }
}

pub fn model_to_contact(model: contact::Model) -> Contact {
    Contact {
        status: parse_or(&model.status, "contacts.status", ContactStatus::Open),
        id: model.id,
        name: model.name,
        email: model.email,
        subject: model.subject,
        message: model.message,
        created_at: model.created_at,
        resolved_at: model.resolved_at,
    }
}

pub fn model_to_referral(model: referral::Model) -> Referral {
    Referral {
        status: parse_or(&model.status, "referrals.status", ReferralStatus::Pending),
        id: model.id,
        referrer_id: model.referrer_id,
        referee_id: model.referee_id,
        reward_cents: model.reward_cents,
        created_at: model.created_at,
        rewarded_at: model.rewarded_at,
    }
}

pub fn model_to_notification(model: notification::Model) -> Notification {
    Notification {
        kind: parse_or(&model.kind, "notifications.kind", NotificationKind::System),
        id: model.id,
        user_id: model.user_id,
        title: model.title,
        body: model.body,
        is_read: model.is_read,
        created_at: model.created_at,
    }
}

pub fn model_to_message(model: message::Model) -> ChatMessage {
    ChatMessage {
        id: model.id,
        course_id: model.course_id,
        sender_id: model.sender_id,
        sender_name: model.sender_name,
        body: model.body,
        created_at: model.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_unknown_role_falls_back_to_student() {
        let now = Utc::now();
        let model = user::Model {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$x".into(),
            role: "superuser".into(),
            referral_code: "ABCDEFGH".into(),
            referred_by: None,
            wallet_balance_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let user = model_to_user(model);
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_enrollment_status_parsed() {
        let now = Utc::now();
        let model = enrollment::Model {
            id: "e1".into(),
            user_id: "u1".into(),
            course_id: "c1".into(),
            status: "completed".into(),
            completed_lessons: 3,
            total_lessons: 3,
            completion_percentage: 100,
            certificate_id: Some("LH-20261001-ABCDEFGH".into()),
            enrolled_at: now,
            completed_at: Some(now),
            last_accessed_at: now,
        };
        let enrollment = model_to_enrollment(model);
        assert_eq!(enrollment.status, EnrollmentStatus::Completed);
        assert_eq!(enrollment.completion_percentage, 100);
    }
}
