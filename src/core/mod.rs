pub mod invitations;
pub mod ledger;
pub mod payments;
pub mod reminders;
pub mod report;
pub mod store;

pub use invitations::InvitationRequest;
pub use ledger::{
    read_ledger_json, AgreementId, InvitationId, LandlordId, Ledger, LedgerError, Payment,
    PaymentId, PaymentStatus, PropertyId, ReminderId, TenantId, UnitId,
};
pub use payments::{PaymentDraft, PaymentError};
pub use reminders::ReminderDraft;
pub use report::{LandlordYear, ReportPeriod};
pub use store::{PaymentStore, YtdQuery};
