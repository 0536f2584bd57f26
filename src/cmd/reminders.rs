//! Reminders command - maintenance and inspection reminders on units

use super::{read_ledger, LedgerFile};
use crate::core::reminders::{add_reminder, delete_reminder, reminders_for_landlord, update_reminder};
use crate::core::{LandlordId, ReminderDraft, ReminderId, UnitId};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct RemindersCommand {
    #[command(subcommand)]
    action: RemindersAction,
}

#[derive(Subcommand, Debug)]
enum RemindersAction {
    /// List a landlord's reminders by due date
    List {
        /// JSON ledger file ("-" for stdin)
        #[arg(short, long)]
        ledger: PathBuf,
        #[arg(long)]
        landlord: LandlordId,
        /// Only reminders due in the next N days
        #[arg(long)]
        within_days: Option<i64>,
        /// Output as JSON instead of formatted table
        #[arg(long)]
        json: bool,
    },
    /// Add a reminder to one of the landlord's units
    Add {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        landlord: LandlordId,
        #[command(flatten)]
        fields: ReminderFields,
    },
    /// Edit a reminder
    Update {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        landlord: LandlordId,
        #[arg(long)]
        id: ReminderId,
        #[command(flatten)]
        fields: ReminderFields,
    },
    /// Delete a reminder
    Delete {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(long)]
        landlord: LandlordId,
        #[arg(long)]
        id: ReminderId,
    },
}

#[derive(Args, Debug)]
struct ReminderFields {
    #[arg(long)]
    unit: UnitId,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Due date (YYYY-MM-DD), midnight UTC
    #[arg(long)]
    due: NaiveDate,
}

impl ReminderFields {
    fn to_draft(&self) -> ReminderDraft {
        ReminderDraft {
            unit: self.unit,
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

#[derive(Debug, Tabled)]
struct ReminderRow {
    #[tabled(rename = "#")]
    id: ReminderId,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl RemindersCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match &self.action {
            RemindersAction::List {
                ledger,
                landlord,
                within_days,
                json,
            } => {
                let ledger = read_ledger(ledger)?;
                let window = match within_days {
                    Some(days) => Some(upcoming_window(Utc::now(), *days)?),
                    None => None,
                };
                let reminders = reminders_for_landlord(&ledger, *landlord, window);
                if *json {
                    println!("{}", serde_json::to_string_pretty(&reminders)?);
                } else if reminders.is_empty() {
                    println!("No reminders");
                } else {
                    let rows: Vec<ReminderRow> = reminders
                        .into_iter()
                        .map(|r| ReminderRow {
                            id: r.id,
                            due: r.due_date.format("%Y-%m-%d").to_string(),
                            unit: ledger
                                .unit(r.unit)
                                .map_or_else(|| r.unit.to_string(), |u| u.number.clone()),
                            title: r.title.clone(),
                            description: r.description.clone(),
                        })
                        .collect();
                    println!("{}", Table::new(&rows).with(Style::rounded()));
                }
            }
            RemindersAction::Add {
                file,
                landlord,
                fields,
            } => {
                let mut ledger = file.load()?;
                let id = add_reminder(&mut ledger, *landlord, fields.to_draft())?;
                file.save(&ledger)?;
                file.report(format!("Reminder {} added", id));
            }
            RemindersAction::Update {
                file,
                landlord,
                id,
                fields,
            } => {
                let mut ledger = file.load()?;
                update_reminder(&mut ledger, *landlord, *id, fields.to_draft())?;
                file.save(&ledger)?;
                file.report(format!("Reminder {} updated", id));
            }
            RemindersAction::Delete { file, landlord, id } => {
                let mut ledger = file.load()?;
                let removed = delete_reminder(&mut ledger, *landlord, *id)?;
                file.save(&ledger)?;
                file.report(format!("Reminder {} ({}) deleted", id, removed.title));
            }
        }
        Ok(())
    }
}

/// `now` until `days` days later
fn upcoming_window(now: DateTime<Utc>, days: i64) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let Some(until) = Duration::try_days(days).and_then(|d| now.checked_add_signed(d)) else {
        anyhow::bail!("--within-days {} is out of range", days);
    };
    Ok((now, until))
}
