//! Contact form and referral overview

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::api::services::TS_EXPORT_PATH;
use crate::errors::{LmsError, Result};
use crate::services::{AuthUser, Page, normalize_page};
use crate::storage::{Contact, ContactStatus, Referral, SeaOrmStorage};
use crate::utils::validation::{validate_email, validate_required};

pub const MAX_CONTACT_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ReferralOverview {
    pub referral_code: String,
    #[ts(type = "number")]
    pub wallet_balance_cents: i64,
    pub referrals: Vec<Referral>,
}

pub struct CommunityService {
    storage: Arc<SeaOrmStorage>,
}

impl CommunityService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn submit_contact(&self, req: ContactRequest) -> Result<Contact> {
        let name = validate_required("name", &req.name, 100)?;
        let email = validate_email(&req.email)?;
        let subject = validate_required("subject", &req.subject, 200)?;
        let message = validate_required("message", &req.message, MAX_CONTACT_MESSAGE_CHARS)?;

        let contact = self
            .storage
            .insert_contact(name, email, subject, message)
            .await?;
        info!("Contact message {} received from {}", contact.id, contact.email);
        Ok(contact)
    }

    pub async fn list_contacts(
        &self,
        status: Option<ContactStatus>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page<Contact>> {
        let (page, page_size) = normalize_page(page, page_size)?;
        let (items, total) = self.storage.list_contacts(status, page, page_size).await?;
        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    pub async fn resolve_contact(&self, id: &str) -> Result<Contact> {
        self.storage.resolve_contact(id).await
    }

    pub async fn my_referrals(&self, actor: &AuthUser) -> Result<ReferralOverview> {
        let user = self
            .storage
            .find_user(&actor.id)
            .await?
            .ok_or_else(|| LmsError::unauthorized("User no longer exists"))?;
        let referrals = self.storage.list_referrals_by_referrer(&user.id).await?;
        Ok(ReferralOverview {
            referral_code: user.referral_code,
            wallet_balance_cents: user.wallet_balance_cents,
            referrals,
        })
    }
}
