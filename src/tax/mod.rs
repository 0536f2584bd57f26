pub mod pl;

pub use pl::{assess, compute_tax_for_payment, TaxOutcome, TaxSchedule};
