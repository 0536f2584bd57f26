//! Tax command - show how each payment's rental tax is computed

use super::{format_money, LedgerFile};
use crate::core::payments::recompute_taxes;
use crate::core::report::landlord_years;
use crate::core::{LandlordId, Ledger, LandlordYear, Payment, PaymentStore};
use crate::tax::assess;
use crate::utils::write_csv;
use chrono::Datelike;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct TaxCommand {
    #[command(flatten)]
    file: LedgerFile,

    /// Tax year (calendar year of the due date)
    #[arg(short, long)]
    year: Option<i32>,

    /// Only payments of this landlord
    #[arg(long)]
    landlord: Option<LandlordId>,

    /// Recompute and store tax for every payment in due-date order, then
    /// write the ledger instead of printing the breakdown
    #[arg(long)]
    recompute: bool,

    /// Output as JSON instead of formatted table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output the payment breakdown as CSV
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct TaxRow {
    #[tabled(rename = "#")]
    id: String,
    #[tabled(rename = "Due")]
    date_due: String,
    #[tabled(rename = "Landlord")]
    landlord: String,
    #[tabled(rename = "Base Rent")]
    base_rent: String,
    #[tabled(rename = "YTD Before")]
    ytd_before: String,
    #[tabled(rename = "Low Band")]
    taxed_at_low: String,
    #[tabled(rename = "High Band")]
    taxed_at_high: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "Stored")]
    stored_tax: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Debug, Serialize)]
struct TaxOutput {
    payments: Vec<TaxRow>,
    landlords: Vec<LandlordYear>,
}

impl TaxCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut ledger = self.file.load()?;

        if self.recompute {
            let changed = recompute_taxes(&mut ledger, self.year);
            self.file.save(&ledger)?;
            self.file
                .report(format!("Recomputed tax: {} payment(s) changed", changed));
            return Ok(());
        }

        let rows = self.rows(&ledger);
        let years: Vec<LandlordYear> = match self.year {
            Some(year) => landlord_years(&ledger, year)
                .into_iter()
                .filter(|l| self.landlord.is_none_or(|id| l.landlord == id))
                .collect(),
            None => Vec::new(),
        };

        if self.json {
            let output = TaxOutput {
                payments: rows,
                landlords: years,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }
        if self.csv {
            return write_csv(&rows, io::stdout());
        }

        if rows.is_empty() {
            println!("No payments found matching filters");
        } else {
            let table = Table::new(&rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }

        for year in &years {
            println!();
            println!("{} ({})", year.name, year.year);
            println!("  Payments:            {}", year.payments);
            println!("  Base rent:           {}", format_money(year.base));
            println!("  Tax:                 {}", format_money(year.tax));
            println!("  Low band remaining:  {}", format_money(year.remaining_low_band));
            if year.threshold_crossed {
                println!("  Threshold crossed, further rent taxed at the high rate");
            }
        }
        Ok(())
    }

    fn rows(&self, ledger: &Ledger) -> Vec<TaxRow> {
        let mut payments: Vec<&Payment> = ledger
            .payments
            .iter()
            .filter(|p| {
                self.year
                    .is_none_or(|y| p.date_due.is_some_and(|d| d.year() == y))
            })
            .filter(|p| {
                self.landlord
                    .is_none_or(|l| ledger.payment_owned_by(p, l))
            })
            .collect();
        payments.sort_by_key(|p| (p.date_due, p.id));

        payments
            .into_iter()
            .map(|p| {
                let outcome = assess(p, ledger);
                let (rate, tax) = outcome.rate_and_amount();
                let assessment = outcome.assessment();
                let landlord = p
                    .rental_agreement
                    .and_then(|a| ledger.resolve_landlord(a))
                    .map_or_else(String::new, |l| l.name.clone());
                let note = match outcome.reason() {
                    Some(reason) => reason,
                    None if tax != p.tax_amount => "stale".to_string(),
                    None => String::new(),
                };
                TaxRow {
                    id: p.id.map_or_else(String::new, |id| id.to_string()),
                    date_due: p.date_due.map_or_else(String::new, |d| d.to_string()),
                    landlord,
                    base_rent: format_money(p.base_rent_or_zero()),
                    ytd_before: assessment.map_or_else(String::new, |a| format_money(a.ytd_before)),
                    taxed_at_low: assessment.map_or_else(String::new, |a| format_money(a.taxed_at_low)),
                    taxed_at_high: assessment.map_or_else(String::new, |a| format_money(a.taxed_at_high)),
                    rate: format!("{:.2}%", rate * Decimal::ONE_HUNDRED),
                    tax: format_money(tax),
                    stored_tax: format_money(p.tax_amount),
                    note,
                }
            })
            .collect()
    }
}
