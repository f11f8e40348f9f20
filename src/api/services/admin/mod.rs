//! Admin API 服务模块
//!
//! 所有端点都要求管理员角色（`AdminUser` 提取器），包括：
//! - 平台统计、用户管理
//! - 进度校正与证书签发/撤销
//! - 订单、优惠码、联系表单

mod commerce;
mod operations;
pub mod routes;
mod users;

pub use commerce::{
    create_promo, deactivate_promo, list_contacts, list_payments, list_promos, resolve_contact,
};
pub use operations::{IssueCertificateRequest, issue_certificate, reconcile, revoke_certificate};
pub use routes::admin_routes;
pub use users::{SetActiveRequest, SetRoleRequest, get_stats, list_users, set_user_active, set_user_role};
