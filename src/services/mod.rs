//! Service layer for business logic
//!
//! Handlers and CLI commands both go through these services; they own the
//! validation and authorization rules, storage only persists.

mod admin_service;
mod auth_service;
pub mod certificate;
mod chat_service;
mod community_service;
mod course_service;
mod enrollment_service;
mod notification_service;
mod payment_service;
pub mod progress;

use serde::{Deserialize, Serialize};

use crate::errors::{LmsError, Result};
use crate::storage::Role;

pub use admin_service::*;
pub use auth_service::*;
pub use certificate::{CertificateService, CertificateVerification};
pub use chat_service::*;
pub use community_service::*;
pub use course_service::*;
pub use enrollment_service::*;
pub use notification_service::*;
pub use payment_service::*;

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// 最大分页大小
pub const MAX_PAGE_SIZE: u64 = 100;

/// 已认证的调用者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LmsError::forbidden("Admin role required"))
        }
    }

    pub fn require_author(&self) -> Result<()> {
        if self.role.can_author() {
            Ok(())
        } else {
            Err(LmsError::forbidden("Instructor role required"))
        }
    }

    /// 资源所有者或管理员
    pub fn owns_or_admin(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.is_admin()
    }
}

/// 一页查询结果
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1))
    }
}

/// 校验分页参数：page ≥ 1，page_size 1..=100
pub fn normalize_page(page: Option<u64>, page_size: Option<u64>) -> Result<(u64, u64)> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 {
        return Err(LmsError::validation("page must be >= 1"));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(LmsError::validation(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok((page, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_defaults() {
        assert_eq!(normalize_page(None, None).unwrap(), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(normalize_page(Some(3), Some(100)).unwrap(), (3, 100));
    }

    #[test]
    fn test_normalize_page_rejects_out_of_range() {
        assert!(normalize_page(Some(0), None).is_err());
        assert!(normalize_page(None, Some(0)).is_err());
        assert!(normalize_page(None, Some(101)).is_err());
    }

    #[test]
    fn test_total_pages() {
        let page = Page::<()> {
            items: vec![],
            total: 41,
            page: 1,
            page_size: 20,
        };
        assert_eq!(page.total_pages(), 3);
        let empty = Page::<()> {
            items: vec![],
            total: 0,
            page: 1,
            page_size: 20,
        };
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_auth_user_roles() {
        let admin = AuthUser::new("a", Role::Admin);
        let student = AuthUser::new("s", Role::Student);
        assert!(admin.require_admin().is_ok());
        assert!(admin.owns_or_admin("someone-else"));
        assert!(student.require_author().is_err());
        assert!(student.owns_or_admin("s"));
        assert!(!student.owns_or_admin("t"));
    }
}
