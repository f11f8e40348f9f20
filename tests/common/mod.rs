//! 集成测试共用的环境初始化
//!
//! 每个测试使用独立的临时 SQLite 数据库和内存 Blob 存储；
//! 全局配置只初始化一次，所有测试共用同一组密钥。

#![allow(dead_code)]

use std::sync::{Arc, Once};

use tempfile::TempDir;

use learnhub::config::{StaticConfig, update_config};
use learnhub::runtime::lifetime::startup::AppServices;
use learnhub::services::certificate::MemoryBlobStore;
use learnhub::services::{AuthUser, CreateCourseRequest, LessonRequest};
use learnhub::storage::{Course, Lesson, Role, SeaOrmStorage, User};

pub const JWT_SECRET: &str = "integration-test-jwt-secret-0123456789";
pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";
pub const REFERRAL_REWARD_CENTS: i64 = 500;
pub const PASSWORD: &str = "correct-horse-battery";

static INIT: Once = Once::new();

pub fn init_test_config() {
    INIT.call_once(|| {
        let mut config = StaticConfig::default();
        config.auth.jwt_secret = JWT_SECRET.to_string();
        config.payments.key_secret = KEY_SECRET.to_string();
        config.payments.webhook_secret = WEBHOOK_SECRET.to_string();
        config.referral.reward_cents = REFERRAL_REWARD_CENTS;
        config.database.pool_size = 4;
        config.database.retry_count = 0;
        config.certificates.verify_base_url = "https://learn.test/verify".to_string();
        update_config(config);
    });
}

pub struct TestEnv {
    pub services: AppServices,
    pub blobs: Arc<MemoryBlobStore>,
    pub db_url: String,
    _dir: TempDir,
}

pub async fn setup() -> TestEnv {
    init_test_config();

    let dir = TempDir::new().expect("创建临时目录失败");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("learnhub_test.db").display()
    );
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );
    let blobs = Arc::new(MemoryBlobStore::new());
    let services = AppServices::build(storage, blobs.clone());

    TestEnv {
        services,
        blobs,
        db_url,
        _dir: dir,
    }
}

impl TestEnv {
    pub async fn user(&self, name: &str, email: &str, role: Role) -> (User, AuthUser) {
        let user = self
            .services
            .auth
            .create_user(name, email, PASSWORD, role, None)
            .await
            .expect("创建用户失败");
        let auth = AuthUser::new(user.id.clone(), user.role);
        (user, auth)
    }

    pub async fn student(&self, email: &str) -> AuthUser {
        self.user("Student", email, Role::Student).await.1
    }

    pub async fn instructor(&self) -> AuthUser {
        self.user("Ada Instructor", "instructor@learn.test", Role::Instructor)
            .await
            .1
    }

    pub async fn admin(&self) -> AuthUser {
        self.user("Root Admin", "admin@learn.test", Role::Admin).await.1
    }

    /// 创建并发布一门带 `lessons` 个课时的课程
    pub async fn published_course(
        &self,
        instructor: &AuthUser,
        title: &str,
        price_cents: i64,
        lessons: usize,
    ) -> (Course, Vec<Lesson>) {
        let courses = &self.services.courses;
        let course = courses
            .create(
                instructor,
                CreateCourseRequest {
                    title: title.to_string(),
                    description: format!("{} description", title),
                    category: "programming".to_string(),
                    level: None,
                    price_cents,
                    thumbnail_url: None,
                },
            )
            .await
            .expect("创建课程失败");

        let mut created = Vec::with_capacity(lessons);
        for i in 0..lessons {
            let lesson = courses
                .add_lesson(
                    &course.id,
                    instructor,
                    LessonRequest {
                        title: format!("Lesson {}", i + 1),
                        content: "Body".to_string(),
                        video_url: None,
                        duration_minutes: 10,
                    },
                )
                .await
                .expect("添加课时失败");
            created.push(lesson);
        }

        let course = courses
            .set_published(&course.id, instructor, true)
            .await
            .expect("发布课程失败");
        (course, created)
    }

    pub fn bearer(&self, user: &AuthUser) -> (String, String) {
        let tokens = learnhub::services::issue_tokens(&user.id, user.role).expect("签发 token 失败");
        (
            "Authorization".to_string(),
            format!("Bearer {}", tokens.access_token),
        )
    }
}

/// 带完整路由与中间件的测试应用
#[macro_export]
macro_rules! test_app {
    ($env:expr) => {{
        let services = $env.services.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(learnhub::api::middleware::BearerAuth)
                .app_data(actix_web::web::Data::new(
                    learnhub::api::services::AppStartTime::now(),
                ))
                .app_data(
                    actix_web::web::JsonConfig::default()
                        .error_handler(learnhub::api::services::json_error_handler),
                )
                .app_data(
                    actix_web::web::QueryConfig::default()
                        .error_handler(learnhub::api::services::query_error_handler),
                )
                .configure(move |cfg| services.register(cfg))
                .configure(learnhub::api::services::configure_routes),
        )
        .await
    }};
}
