//! Two-step admin handoff.
//!
//! The current admin commits a successor; the successor must accept before
//! the handoff takes effect. The committed address stays recorded as
//! `future_admin` after acceptance.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AccessError;
use crate::types::AccountId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Ownership {
    admin: AccountId,
    future_admin: Option<AccountId>,
}

impl Ownership {
    pub fn new(admin: AccountId) -> Result<Self, AccessError> {
        if admin.is_zero() {
            return Err(AccessError::ZeroAdmin);
        }
        Ok(Self { admin, future_admin: None })
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.future_admin
    }

    pub fn is_admin(&self, caller: &AccountId) -> bool {
        &self.admin == caller
    }

    pub fn ensure_admin(&self, caller: &AccountId) -> Result<(), AccessError> {
        if self.is_admin(caller) { Ok(()) } else { Err(AccessError::AdminOnly) }
    }

    /// Record `new_admin` as the pending successor. Admin only.
    pub fn commit_transfer(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), AccessError> {
        self.ensure_admin(caller)?;
        if new_admin.is_zero() {
            return Err(AccessError::ZeroAdmin);
        }
        self.future_admin = Some(new_admin);
        info!(admin = %self.admin, future_admin = %new_admin, "admin transfer committed");
        Ok(())
    }

    /// Complete the handoff. Only the committed successor may call this.
    pub fn accept_transfer(&mut self, caller: &AccountId) -> Result<(), AccessError> {
        let pending = self.future_admin.ok_or(AccessError::NoPendingAdmin)?;
        if &pending != caller {
            return Err(AccessError::FutureAdminOnly);
        }
        let previous = self.admin;
        self.admin = pending;
        info!(%previous, admin = %pending, "admin transfer accepted");
        Ok(())
    }
}
