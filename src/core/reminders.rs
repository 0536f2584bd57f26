use super::ledger::{LandlordId, Ledger, Reminder, ReminderId, UnitId};
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReminderError {
    #[error("unit {unit} does not belong to landlord {landlord}")]
    UnitNotOwned { unit: UnitId, landlord: LandlordId },
    #[error("reminder not found: {0}")]
    NotFound(ReminderId),
}

#[derive(Debug, Clone)]
pub struct ReminderDraft {
    pub unit: UnitId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

fn check_owner(ledger: &Ledger, unit: UnitId, landlord: LandlordId) -> Result<(), ReminderError> {
    if ledger.unit_landlord(unit) == Some(landlord) {
        Ok(())
    } else {
        Err(ReminderError::UnitNotOwned { unit, landlord })
    }
}

/// Add a reminder to one of the landlord's own units
pub fn add_reminder(
    ledger: &mut Ledger,
    landlord: LandlordId,
    draft: ReminderDraft,
) -> Result<ReminderId, ReminderError> {
    check_owner(ledger, draft.unit, landlord)?;
    let id = ledger.next_reminder_id();
    ledger.reminders.push(Reminder {
        id,
        unit: draft.unit,
        title: draft.title,
        description: draft.description,
        due_date: draft.due_date,
    });
    Ok(id)
}

pub fn update_reminder(
    ledger: &mut Ledger,
    landlord: LandlordId,
    id: ReminderId,
    draft: ReminderDraft,
) -> Result<(), ReminderError> {
    let current_unit = ledger
        .reminders
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.unit)
        .ok_or(ReminderError::NotFound(id))?;
    // hide reminders of other landlords
    if ledger.unit_landlord(current_unit) != Some(landlord) {
        return Err(ReminderError::NotFound(id));
    }
    check_owner(ledger, draft.unit, landlord)?;

    if let Some(reminder) = ledger.reminders.iter_mut().find(|r| r.id == id) {
        reminder.unit = draft.unit;
        reminder.title = draft.title;
        reminder.description = draft.description;
        reminder.due_date = draft.due_date;
    }
    Ok(())
}

pub fn delete_reminder(
    ledger: &mut Ledger,
    landlord: LandlordId,
    id: ReminderId,
) -> Result<Reminder, ReminderError> {
    let idx = ledger
        .reminders
        .iter()
        .position(|r| r.id == id && ledger.unit_landlord(r.unit) == Some(landlord))
        .ok_or(ReminderError::NotFound(id))?;
    Ok(ledger.reminders.remove(idx))
}

/// Reminders on the landlord's units ordered by due date, optionally only
/// those due within `(from, until)` inclusive.
pub fn reminders_for_landlord(
    ledger: &Ledger,
    landlord: LandlordId,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<&Reminder> {
    let mut reminders: Vec<&Reminder> = ledger
        .reminders
        .iter()
        .filter(|r| ledger.unit_landlord(r.unit) == Some(landlord))
        .filter(|r| window.is_none_or(|(from, until)| r.due_date >= from && r.due_date <= until))
        .collect();
    reminders.sort_by_key(|r| r.due_date);
    reminders
}
