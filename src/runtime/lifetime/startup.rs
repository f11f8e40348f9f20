//! 服务装配
//!
//! Server 与 CLI 共用同一套服务实例；测试可以换入自己的 Blob 存储。

use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::services::certificate::{BlobStore, create_blob_store};
use crate::services::{
    AdminService, AuthService, CertificateService, ChatService, CommunityService, CourseService,
    EnrollmentService, NotificationService, PaymentService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::system::event::EventBus;

/// 全部业务服务
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub bus: EventBus,
    pub notifications: Arc<NotificationService>,
    pub certificates: Arc<CertificateService>,
    pub enrollments: Arc<EnrollmentService>,
    pub auth: Arc<AuthService>,
    pub courses: Arc<CourseService>,
    pub payments: Arc<PaymentService>,
    pub admin: Arc<AdminService>,
    pub community: Arc<CommunityService>,
    pub chat: Arc<ChatService>,
}

impl AppServices {
    pub fn build(storage: Arc<SeaOrmStorage>, blobs: Arc<dyn BlobStore>) -> Self {
        let config = crate::config::get_config();
        let bus = EventBus::new(config.events.channel_capacity);

        let notifications = Arc::new(NotificationService::new(storage.clone(), bus.clone()));
        let certificates = Arc::new(CertificateService::new(
            storage.clone(),
            blobs,
            notifications.clone(),
        ));
        let enrollments = Arc::new(EnrollmentService::new(
            storage.clone(),
            notifications.clone(),
            certificates.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            storage.clone(),
            enrollments.clone(),
            notifications.clone(),
        ));

        Self {
            auth: Arc::new(AuthService::new(storage.clone())),
            courses: Arc::new(CourseService::new(storage.clone(), enrollments.clone())),
            admin: Arc::new(AdminService::new(
                storage.clone(),
                enrollments.clone(),
                certificates.clone(),
            )),
            community: Arc::new(CommunityService::new(storage.clone())),
            chat: Arc::new(ChatService::new(storage.clone(), bus.clone())),
            storage,
            bus,
            notifications,
            certificates,
            enrollments,
            payments,
        }
    }

    /// 注册为 actix `app_data`，handler 通过 `web::Data<XxxService>` 取用
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::from(self.notifications.clone()))
            .app_data(web::Data::from(self.certificates.clone()))
            .app_data(web::Data::from(self.enrollments.clone()))
            .app_data(web::Data::from(self.auth.clone()))
            .app_data(web::Data::from(self.courses.clone()))
            .app_data(web::Data::from(self.payments.clone()))
            .app_data(web::Data::from(self.admin.clone()))
            .app_data(web::Data::from(self.community.clone()))
            .app_data(web::Data::from(self.chat.clone()));
    }
}

/// 按配置连接数据库、执行迁移并装配服务
pub async fn prepare_startup() -> Result<AppServices> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    let config = crate::config::get_config();
    let blobs = create_blob_store(&config.certificates)
        .context("Failed to create certificate blob store")?;

    let services = AppServices::build(storage, blobs);
    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(services)
}
