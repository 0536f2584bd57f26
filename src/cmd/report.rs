//! Report command - per-month income and tax totals for a period

use super::{format_money, read_ledger};
use crate::core::report::{period_report, MonthTotals};
use crate::core::{LandlordId, ReportPeriod};
use crate::utils::write_csv;
use clap::Args;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// JSON ledger file ("-" for stdin)
    #[arg(short, long)]
    ledger: PathBuf,

    /// Calendar year to report
    #[arg(short, long)]
    year: i32,

    /// First month of the period (1-12)
    #[arg(long)]
    start_month: Option<u32>,

    /// Last month of the period (1-12)
    #[arg(long)]
    end_month: Option<u32>,

    /// Report the whole year, ignoring the month bounds
    #[arg(long)]
    full_year: bool,

    /// Only payments of this landlord
    #[arg(long)]
    landlord: Option<LandlordId>,

    /// Output as JSON instead of formatted table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ReportRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Payments")]
    payments: usize,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&MonthTotals> for ReportRow {
    fn from(m: &MonthTotals) -> Self {
        ReportRow {
            month: m.name.to_string(),
            payments: m.totals.count,
            income: format_money(m.totals.income),
            tax: format_money(m.totals.tax),
            total: format_money(m.totals.total),
        }
    }
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let ledger = read_ledger(&self.ledger)?;
        let period = ReportPeriod::new(self.year, self.start_month, self.end_month, self.full_year);
        let report = period_report(&ledger, period, self.landlord);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        let mut rows: Vec<ReportRow> = report.months.iter().map(ReportRow::from).collect();
        if self.csv {
            write_csv(&rows, io::stdout())?;
            return Ok(());
        }

        rows.push(ReportRow {
            month: "Total".to_string(),
            payments: report.grand.count,
            income: format_money(report.grand.income),
            tax: format_money(report.grand.tax),
            total: format_money(report.grand.total),
        });

        println!();
        println!("RENTAL INCOME REPORT ({})", report.period);
        println!();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}
