pub mod certificate;
pub mod contact;
pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod lesson_progress;
pub mod message;
pub mod notification;
pub mod payment;
pub mod promo_code;
pub mod referral;
pub mod user;

pub use certificate::Entity as CertificateEntity;
pub use contact::Entity as ContactEntity;
pub use course::Entity as CourseEntity;
pub use enrollment::Entity as EnrollmentEntity;
pub use lesson::Entity as LessonEntity;
pub use lesson_progress::Entity as LessonProgressEntity;
pub use message::Entity as MessageEntity;
pub use notification::Entity as NotificationEntity;
pub use payment::Entity as PaymentEntity;
pub use promo_code::Entity as PromoCodeEntity;
pub use referral::Entity as ReferralEntity;
pub use user::Entity as UserEntity;
