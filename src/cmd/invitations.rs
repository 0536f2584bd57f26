//! Invitations command - invite prospective tenants to a property

use super::{read_ledger, LedgerFile};
use crate::core::invitations::{
    accept_invitation, cancel_invitation, create_invitation, decline_invitation,
    expire_invitations, invitations_for_landlord, resend_invitation,
};
use crate::core::{InvitationId, InvitationRequest, LandlordId, PropertyId};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct InvitationsCommand {
    #[command(subcommand)]
    action: InvitationsAction,
}

#[derive(Subcommand, Debug)]
enum InvitationsAction {
    /// Invite an email address to one of the landlord's properties
    Create {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        landlord: LandlordId,
        #[arg(long)]
        property: PropertyId,
        #[arg(long)]
        email: String,
        /// Expiry (RFC 3339), defaults to seven days from now
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Send a pending or expired invitation again
    Resend {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        id: InvitationId,
        #[arg(long)]
        landlord: LandlordId,
    },
    /// Accept an invitation by its token
    Accept {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        token: String,
    },
    /// Decline an invitation by its token
    Decline {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        token: String,
    },
    /// Withdraw an invitation
    Cancel {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        id: InvitationId,
        #[arg(long)]
        landlord: LandlordId,
    },
    /// Mark pending invitations past their expiry as expired
    Expire {
        #[command(flatten)]
        file: LedgerFile,
    },
    /// List a landlord's invitations, newest first
    List {
        /// JSON ledger file ("-" for stdin)
        #[arg(short, long)]
        ledger: PathBuf,
        #[arg(long)]
        landlord: LandlordId,
        /// Output as JSON instead of formatted table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct InvitationRow {
    #[tabled(rename = "#")]
    id: InvitationId,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Sent")]
    created_at: String,
    #[tabled(rename = "Expires")]
    expires_at: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Token")]
    token: String,
}

impl InvitationsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        match &self.action {
            InvitationsAction::Create {
                file,
                landlord,
                property,
                email,
                expires_at,
            } => {
                let mut ledger = file.load()?;
                let request = InvitationRequest {
                    email: email.clone(),
                    property: *property,
                    landlord: *landlord,
                    expires_at: *expires_at,
                };
                let id = create_invitation(&mut ledger, request, now)?;
                file.save(&ledger)?;
                if let Some(invitation) = ledger.invitations.iter().find(|i| i.id == id) {
                    file.report(format!(
                        "Invitation {} sent to {} (token {}, expires {})",
                        id,
                        invitation.email,
                        invitation.token,
                        invitation.expires_at.format("%Y-%m-%d %H:%M")
                    ));
                }
            }
            InvitationsAction::Resend { file, id, landlord } => {
                let mut ledger = file.load()?;
                resend_invitation(&mut ledger, *id, *landlord, now)?;
                file.save(&ledger)?;
                file.report(format!("Invitation {} resent", id));
            }
            InvitationsAction::Accept { file, token } => {
                let mut ledger = file.load()?;
                let tenant = accept_invitation(&mut ledger, token, now)?;
                file.save(&ledger)?;
                file.report(format!("Invitation accepted, tenant {}", tenant));
            }
            InvitationsAction::Decline { file, token } => {
                let mut ledger = file.load()?;
                decline_invitation(&mut ledger, token, now)?;
                file.save(&ledger)?;
                file.report("Invitation declined");
            }
            InvitationsAction::Cancel { file, id, landlord } => {
                let mut ledger = file.load()?;
                let removed = cancel_invitation(&mut ledger, *id, *landlord)?;
                file.save(&ledger)?;
                file.report(format!("Invitation {} for {} cancelled", id, removed.email));
            }
            InvitationsAction::Expire { file } => {
                let mut ledger = file.load()?;
                let count = expire_invitations(&mut ledger, now);
                file.save(&ledger)?;
                file.report(format!("{} invitation(s) expired", count));
            }
            InvitationsAction::List {
                ledger,
                landlord,
                json,
            } => {
                let ledger = read_ledger(ledger)?;
                let invitations = invitations_for_landlord(&ledger, *landlord);
                if *json {
                    println!("{}", serde_json::to_string_pretty(&invitations)?);
                    return Ok(());
                }
                if invitations.is_empty() {
                    println!("No invitations for landlord {}", landlord);
                    return Ok(());
                }
                let rows: Vec<InvitationRow> = invitations
                    .into_iter()
                    .map(|i| InvitationRow {
                        id: i.id,
                        email: i.email.clone(),
                        property: ledger
                            .property(i.property)
                            .map_or_else(|| i.property.to_string(), |p| p.label()),
                        created_at: i.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        expires_at: i.expires_at.format("%Y-%m-%d %H:%M").to_string(),
                        status: if i.is_pending() && i.is_expired(now) {
                            "Pending (past expiry)".to_string()
                        } else {
                            format!("{:?}", i.status)
                        },
                        token: i.token.clone(),
                    })
                    .collect();
                println!("{}", Table::new(&rows).with(Style::rounded()));
            }
        }
        Ok(())
    }
}
