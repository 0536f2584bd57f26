//! Payments command - record, edit and generate monthly payments

use super::schema::CsvField;
use super::{format_money, read_ledger, LedgerFile};
use crate::core::payments::{
    create_payment, delete_payment, generate_monthly_payments, payments_for_tenant,
    update_payment,
};
use crate::core::{
    AgreementId, Ledger, Payment, PaymentDraft, PaymentError, PaymentId, PaymentStatus, TenantId,
};
use crate::utils::write_csv;
use chrono::{Datelike, NaiveDate};
use clap::{Args, Subcommand, ValueEnum};
use rentax_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct PaymentsCommand {
    #[command(subcommand)]
    action: PaymentsAction,
}

#[derive(Subcommand, Debug)]
enum PaymentsAction {
    /// Record a payment and compute its tax
    Add {
        #[command(flatten)]
        file: LedgerFile,
        #[command(flatten)]
        fields: PaymentFields,
    },
    /// Edit a payment and recompute its tax; fields left out keep their stored values
    Update {
        #[command(flatten)]
        file: LedgerFile,
        /// Payment id
        #[arg(long)]
        id: PaymentId,
        #[command(flatten)]
        fields: PaymentFields,
    },
    /// Delete a payment (other payments keep their stored tax)
    Delete {
        #[command(flatten)]
        file: LedgerFile,
        /// Payment id
        #[arg(long)]
        id: PaymentId,
    },
    /// Generate the month's payments from active rental agreements
    Generate {
        #[command(flatten)]
        file: LedgerFile,
        #[arg(short, long)]
        year: i32,
        /// Month (1-12)
        #[arg(short, long)]
        month: u32,
        /// Day of the month the payments are due
        #[arg(long, default_value_t = 5)]
        due_day: u32,
        /// Reset existing payments for the month from their agreements
        #[arg(long)]
        overwrite: bool,
    },
    /// List stored payments
    List {
        /// JSON ledger file ("-" for stdin)
        #[arg(short, long)]
        ledger: PathBuf,
        #[arg(short, long)]
        year: Option<i32>,
        /// Month (1-12), needs --year
        #[arg(short, long, requires = "year")]
        month: Option<u32>,
        /// Only this tenant's payments, newest first
        #[arg(short, long)]
        tenant: Option<TenantId>,
        /// Output as CSV instead of formatted table
        #[arg(long)]
        csv: bool,
    },
}

/// Payment fields. On add, charges left out are taken from the agreement; on
/// update, anything left out keeps its stored value.
#[derive(Args, Debug)]
struct PaymentFields {
    /// Rental agreement the payment belongs to
    #[arg(short, long)]
    agreement: Option<AgreementId>,
    /// Due date (YYYY-MM-DD), required when adding
    #[arg(short, long)]
    due: Option<NaiveDate>,
    /// Date paid (YYYY-MM-DD)
    #[arg(long)]
    paid: Option<NaiveDate>,
    #[arg(long)]
    base_rent: Option<Decimal>,
    #[arg(long)]
    coop_fee: Option<Decimal>,
    #[arg(long)]
    electricity: Option<Decimal>,
    #[arg(long)]
    gas: Option<Decimal>,
    #[arg(long)]
    other_fees: Option<Decimal>,
    /// Defaults to pending when adding
    #[arg(long, value_enum)]
    status: Option<PaymentStatusArg>,
    #[arg(long)]
    invoice_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum PaymentStatusArg {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl From<PaymentStatusArg> for PaymentStatus {
    fn from(arg: PaymentStatusArg) -> Self {
        match arg {
            PaymentStatusArg::Pending => PaymentStatus::Pending,
            PaymentStatusArg::Paid => PaymentStatus::Paid,
            PaymentStatusArg::Overdue => PaymentStatus::Overdue,
            PaymentStatusArg::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

impl PaymentFields {
    /// Draft for a new payment, seeded from the agreement when it exists
    fn new_draft(&self, ledger: &Ledger) -> anyhow::Result<PaymentDraft> {
        let Some(due) = self.due else {
            anyhow::bail!("--due is required when adding a payment");
        };
        let base = match self.agreement.and_then(|a| ledger.agreement(a)) {
            Some(a) => PaymentDraft::from_agreement(a, due),
            None => PaymentDraft {
                rental_agreement: self.agreement,
                date_due: due,
                date_paid: None,
                base_rent: Decimal::ZERO,
                coop_fee: Decimal::ZERO,
                electricity: Decimal::ZERO,
                gas: Decimal::ZERO,
                other_fees: Decimal::ZERO,
                status: PaymentStatus::Pending,
                invoice_url: None,
            },
        };
        Ok(self.override_fields(base))
    }

    /// Draft for an edit, seeded from the stored payment
    fn edit_draft(&self, ledger: &Ledger, id: PaymentId) -> anyhow::Result<PaymentDraft> {
        let stored = ledger.payment(id).ok_or(PaymentError::NotFound(id))?;
        let Some(due) = self.due.or(stored.date_due) else {
            anyhow::bail!("payment {} has no due date, pass --due", id);
        };
        Ok(self.override_fields(PaymentDraft::from_payment(stored, due)))
    }

    fn override_fields(&self, mut draft: PaymentDraft) -> PaymentDraft {
        if let Some(v) = self.agreement {
            draft.rental_agreement = Some(v);
        }
        if let Some(v) = self.due {
            draft.date_due = v;
        }
        if let Some(v) = self.paid {
            draft.date_paid = Some(v);
        }
        if let Some(v) = self.base_rent {
            draft.base_rent = v;
        }
        if let Some(v) = self.coop_fee {
            draft.coop_fee = v;
        }
        if let Some(v) = self.electricity {
            draft.electricity = v;
        }
        if let Some(v) = self.gas {
            draft.gas = v;
        }
        if let Some(v) = self.other_fees {
            draft.other_fees = v;
        }
        if let Some(v) = self.status {
            draft.status = v.into();
        }
        if let Some(v) = &self.invoice_url {
            draft.invoice_url = Some(v.clone());
        }
        draft
    }
}

impl PaymentsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match &self.action {
            PaymentsAction::Add { file, fields } => {
                let mut ledger = file.load()?;
                let draft = fields.new_draft(&ledger)?;
                let id = create_payment(&mut ledger, draft)?;
                file.save(&ledger)?;
                file.report(describe(&ledger, id));
            }
            PaymentsAction::Update { file, id, fields } => {
                let mut ledger = file.load()?;
                let draft = fields.edit_draft(&ledger, *id)?;
                update_payment(&mut ledger, *id, draft)?;
                file.save(&ledger)?;
                file.report(describe(&ledger, *id));
            }
            PaymentsAction::Delete { file, id } => {
                let mut ledger = file.load()?;
                let removed = delete_payment(&mut ledger, *id)?;
                file.save(&ledger)?;
                file.report(format!(
                    "Deleted payment {} due {}",
                    id,
                    removed.date_due.map_or("-".to_string(), |d| d.to_string())
                ));
            }
            PaymentsAction::Generate {
                file,
                year,
                month,
                due_day,
                overwrite,
            } => {
                let mut ledger = file.load()?;
                let summary = generate_monthly_payments(&mut ledger, *year, *month, *due_day, *overwrite)?;
                file.save(&ledger)?;
                file.report(format!(
                    "Payments generated for {}-{:02} (due {}): created={}, updated={}, skipped={}",
                    year,
                    month,
                    summary.due_date.map_or_else(String::new, |d| d.to_string()),
                    summary.created,
                    summary.updated,
                    summary.skipped
                ));
            }
            PaymentsAction::List {
                ledger,
                year,
                month,
                tenant,
                csv,
            } => {
                let ledger = read_ledger(ledger)?;
                let payments: Vec<&Payment> = match tenant {
                    Some(t) => payments_for_tenant(&ledger, *t),
                    None => {
                        let mut all: Vec<&Payment> = ledger.payments.iter().collect();
                        all.sort_by_key(|p| (p.date_due, p.id));
                        all
                    }
                };
                let rows: Vec<PaymentRow> = payments
                    .into_iter()
                    .filter(|p| year.is_none_or(|y| p.date_due.is_some_and(|d| d.year() == y)))
                    .filter(|p| month.is_none_or(|m| p.date_due.is_some_and(|d| d.month() == m)))
                    .map(|p| PaymentRow::new(&ledger, p))
                    .collect();

                if *csv {
                    write_csv(&rows, io::stdout())?;
                } else if rows.is_empty() {
                    println!("No payments found matching filters");
                } else {
                    let table = Table::new(&rows)
                        .with(Style::rounded())
                        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                        .to_string();
                    println!("{}", table);
                }
            }
        }
        Ok(())
    }
}

fn describe(ledger: &Ledger, id: PaymentId) -> String {
    match ledger.payment(id) {
        Some(p) => format!(
            "Payment {}: base {} tax {} ({}) total {}",
            id,
            format_money(p.base_rent_or_zero()),
            format_money(p.tax_amount),
            p.tax_rate_with_sign(),
            format_money(p.total_amount)
        ),
        None => format!("Payment {}", id),
    }
}

/// Row for payment listings (table and CSV)
#[derive(Debug, Clone, Tabled, Serialize, CsvSchema)]
pub struct PaymentRow {
    /// Payment identifier
    #[tabled(rename = "#")]
    pub id: String,

    /// Due date (YYYY-MM-DD)
    #[tabled(rename = "Due")]
    pub date_due: String,

    /// Date paid, empty when unpaid
    #[tabled(rename = "Paid")]
    pub date_paid: String,

    /// Rental agreement identifier
    #[tabled(rename = "Agreement")]
    pub agreement: String,

    /// Tenant name
    #[tabled(rename = "Tenant")]
    pub tenant: String,

    /// Taxable base rent
    #[tabled(rename = "Base Rent")]
    pub base_rent: String,

    /// Housing cooperative fee
    #[tabled(rename = "Coop")]
    pub coop_fee: String,

    /// Utilities: electricity + gas
    #[tabled(rename = "Utilities")]
    pub utilities: String,

    /// Other monthly fees
    #[tabled(rename = "Other")]
    pub other_fees: String,

    /// Effective tax rate in percent
    #[tabled(rename = "Tax %")]
    pub tax_rate: String,

    /// Tax on the base rent
    #[tabled(rename = "Tax")]
    pub tax_amount: String,

    /// Charges plus tax
    #[tabled(rename = "Total")]
    pub total_amount: String,

    /// Pending, Paid, Overdue or Cancelled
    #[tabled(rename = "Status")]
    pub status: String,
}

impl PaymentRow {
    fn new(ledger: &Ledger, p: &Payment) -> Self {
        PaymentRow {
            id: p.id.map_or_else(String::new, |id| id.to_string()),
            date_due: p.date_due.map_or_else(String::new, |d| d.to_string()),
            date_paid: p.date_paid.map_or_else(String::new, |d| d.to_string()),
            agreement: p.rental_agreement.map_or_else(String::new, |a| a.to_string()),
            tenant: ledger
                .payment_tenant(p)
                .map_or_else(String::new, |t| t.name.clone()),
            base_rent: format_money(p.base_rent_or_zero()),
            coop_fee: format_money(p.coop_fee),
            utilities: format_money(p.electricity + p.gas),
            other_fees: format_money(p.other_fees),
            tax_rate: p.tax_rate_display(),
            tax_amount: format_money(p.tax_amount),
            total_amount: format_money(p.total_amount),
            status: format!("{:?}", p.status),
        }
    }
}
