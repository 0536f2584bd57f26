//! Tenant invitation lifecycle.
//!
//! An invitation is sent by a landlord for one of their properties and stays
//! pending for seven days unless accepted, declined or cancelled. Expiry is
//! applied lazily by [`expire_invitations`], which every token lookup runs first.

use super::ledger::{
    InvitationId, InvitationStatus, LandlordId, Ledger, PropertyId, Tenant, TenantId,
    TenantInvitation,
};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

pub const INVITATION_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvitationError {
    #[error("invitation not found: {0}")]
    NotFound(String),
    #[error("property {property} does not belong to landlord {landlord}")]
    PropertyNotOwned {
        property: PropertyId,
        landlord: LandlordId,
    },
    #[error("invitation {id} is {status:?} and cannot be {action}")]
    InvalidStatus {
        id: InvitationId,
        status: InvitationStatus,
        action: &'static str,
    },
    #[error("invalid e-mail address: {0}")]
    InvalidEmail(String),
}

#[derive(Debug, Clone)]
pub struct InvitationRequest {
    pub email: String,
    pub property: PropertyId,
    pub landlord: LandlordId,
    /// Defaults to seven days after creation
    pub expires_at: Option<DateTime<Utc>>,
}

fn token_for(landlord: LandlordId, email: &str, property: PropertyId, id: InvitationId, at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{landlord}:{email}:{property}:{id}:{}", at.to_rfc3339()));
    hex::encode(hasher.finalize())
}

pub fn create_invitation(
    ledger: &mut Ledger,
    request: InvitationRequest,
    now: DateTime<Utc>,
) -> Result<InvitationId, InvitationError> {
    let email = request.email.trim().to_string();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(InvitationError::InvalidEmail(email));
    }
    let owned = ledger
        .property(request.property)
        .is_some_and(|p| p.landlord == request.landlord);
    if !owned {
        return Err(InvitationError::PropertyNotOwned {
            property: request.property,
            landlord: request.landlord,
        });
    }

    let id = ledger.next_invitation_id();
    let invitation = TenantInvitation {
        id,
        token: token_for(request.landlord, &email, request.property, id, now),
        email,
        property: request.property,
        landlord: request.landlord,
        created_at: now,
        expires_at: request
            .expires_at
            .unwrap_or(now + Duration::days(INVITATION_VALIDITY_DAYS)),
        status: InvitationStatus::Pending,
    };
    log::info!("Invitation {} created for {}", id, invitation.email);
    ledger.invitations.push(invitation);
    Ok(id)
}

/// Mark pending invitations past their expiry as expired. Returns how many changed.
pub fn expire_invitations(ledger: &mut Ledger, now: DateTime<Utc>) -> usize {
    let mut count = 0;
    for invitation in ledger
        .invitations
        .iter_mut()
        .filter(|i| i.is_pending() && i.expires_at < now)
    {
        invitation.status = InvitationStatus::Expired;
        count += 1;
    }
    if count > 0 {
        log::info!("{} invitation(s) expired", count);
    }
    count
}

fn landlord_invitation(
    ledger: &mut Ledger,
    id: InvitationId,
    landlord: LandlordId,
) -> Result<&mut TenantInvitation, InvitationError> {
    ledger
        .invitations
        .iter_mut()
        .find(|i| i.id == id && i.landlord == landlord)
        .ok_or_else(|| InvitationError::NotFound(id.to_string()))
}

/// Send again. An expired invitation becomes pending with a fresh expiry.
pub fn resend_invitation(
    ledger: &mut Ledger,
    id: InvitationId,
    landlord: LandlordId,
    now: DateTime<Utc>,
) -> Result<(), InvitationError> {
    let invitation = landlord_invitation(ledger, id, landlord)?;
    match invitation.status {
        InvitationStatus::Pending => {}
        InvitationStatus::Expired => {
            invitation.status = InvitationStatus::Pending;
            invitation.expires_at = now + Duration::days(INVITATION_VALIDITY_DAYS);
        }
        status => {
            return Err(InvitationError::InvalidStatus {
                id,
                status,
                action: "resent",
            })
        }
    }
    invitation.created_at = now;
    Ok(())
}

/// Delete a pending, expired or accepted invitation.
pub fn cancel_invitation(
    ledger: &mut Ledger,
    id: InvitationId,
    landlord: LandlordId,
) -> Result<TenantInvitation, InvitationError> {
    let status = landlord_invitation(ledger, id, landlord)?.status;
    if status == InvitationStatus::Declined {
        return Err(InvitationError::InvalidStatus {
            id,
            status,
            action: "cancelled",
        });
    }
    let idx = ledger
        .invitations
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| InvitationError::NotFound(id.to_string()))?;
    Ok(ledger.invitations.remove(idx))
}

fn pending_by_token<'a>(
    ledger: &'a mut Ledger,
    token: &str,
    now: DateTime<Utc>,
) -> Result<&'a mut TenantInvitation, InvitationError> {
    expire_invitations(ledger, now);
    ledger
        .invitations
        .iter_mut()
        .find(|i| i.token == token && i.is_pending())
        .ok_or_else(|| InvitationError::NotFound(token.to_string()))
}

/// Accept by token, creating a tenant for the invited address if there is none.
pub fn accept_invitation(
    ledger: &mut Ledger,
    token: &str,
    now: DateTime<Utc>,
) -> Result<TenantId, InvitationError> {
    let invitation = pending_by_token(ledger, token, now)?;
    invitation.status = InvitationStatus::Accepted;
    let email = invitation.email.clone();

    let existing = ledger
        .tenants
        .iter()
        .find(|t| t.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(&email)))
        .map(|t| t.id);
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = ledger.next_tenant_id();
    let name = email.split('@').next().unwrap_or_default().to_string();
    log::info!("Tenant {} created from invitation for {}", id, email);
    ledger.tenants.push(Tenant {
        id,
        name,
        email: Some(email.clone()),
        contact_info: email,
    });
    Ok(id)
}

pub fn decline_invitation(
    ledger: &mut Ledger,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), InvitationError> {
    let invitation = pending_by_token(ledger, token, now)?;
    invitation.status = InvitationStatus::Declined;
    Ok(())
}

/// Invitations sent by a landlord, newest first
pub fn invitations_for_landlord(ledger: &Ledger, landlord: LandlordId) -> Vec<&TenantInvitation> {
    let mut invitations: Vec<_> = ledger
        .invitations
        .iter()
        .filter(|i| i.landlord == landlord)
        .collect();
    invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    invitations
}
