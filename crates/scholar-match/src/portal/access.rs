use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::error::PortalError;
use super::repository::AdminWhitelist;

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Decides who may maintain the catalog: configured super admins plus the
/// runtime whitelist.
pub struct AdminAccess {
    super_admins: BTreeSet<String>,
    whitelist: Arc<dyn AdminWhitelist>,
}

impl AdminAccess {
    pub fn new(super_admins: &[String], whitelist: Arc<dyn AdminWhitelist>) -> Self {
        let super_admins = super_admins
            .iter()
            .map(|email| email_key(email))
            .filter(|email| !email.is_empty())
            .collect();
        Self {
            super_admins,
            whitelist,
        }
    }

    pub fn is_super_admin(&self, email: &str) -> bool {
        self.super_admins.contains(&email_key(email))
    }

    pub fn is_admin(&self, email: Option<&str>) -> Result<bool, PortalError> {
        let Some(email) = email.map(email_key).filter(|email| !email.is_empty()) else {
            return Ok(false);
        };
        if self.super_admins.contains(&email) {
            return Ok(true);
        }
        Ok(self.whitelist.contains(&email)?)
    }

    pub fn require_admin(&self, email: Option<&str>) -> Result<(), PortalError> {
        if self.is_admin(email)? {
            Ok(())
        } else {
            Err(PortalError::Forbidden)
        }
    }

    pub fn grant(&self, email: &str) -> Result<(), PortalError> {
        let email = email_key(email);
        if email.is_empty() || !email.contains('@') {
            return Err(PortalError::Invalid("a valid email address is required".to_string()));
        }
        self.whitelist.grant(&email)?;
        info!(%email, "admin access granted");
        Ok(())
    }

    /// Super admins come from configuration and cannot be revoked here.
    pub fn revoke(&self, email: &str) -> Result<bool, PortalError> {
        let email = email_key(email);
        if self.super_admins.contains(&email) {
            return Err(PortalError::Conflict(format!(
                "{email} is a configured super admin"
            )));
        }
        let removed = self.whitelist.revoke(&email)?;
        if removed {
            info!(%email, "admin access revoked");
        }
        Ok(removed)
    }

    pub fn whitelist(&self) -> Result<Vec<String>, PortalError> {
        Ok(self.whitelist.list()?)
    }
}
