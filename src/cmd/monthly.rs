//! Monthly command - one month's payments grouped by property and tenant

use super::{format_money, read_ledger};
use crate::core::report::monthly_view;
use crate::utils::month_name;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MonthlyCommand {
    /// JSON ledger file ("-" for stdin)
    #[arg(short, long)]
    ledger: PathBuf,

    #[arg(short, long)]
    year: i32,

    /// Month (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl MonthlyCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let ledger = read_ledger(&self.ledger)?;
        let view = monthly_view(&ledger, self.year, self.month);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
            return Ok(());
        }

        println!();
        println!("PAYMENTS FOR {} {}", month_name(self.month).to_uppercase(), self.year);
        println!();

        if view.groups.is_empty() {
            println!("No payments due this month.");
            return Ok(());
        }

        for group in &view.groups {
            println!("{}", group.label);
            for tenant in &group.tenants {
                println!("  {}", tenant.name);
                for id in &tenant.payments {
                    let Some(payment) = ledger.payment(*id) else { continue };
                    println!(
                        "    #{:<5} due {}  base {:>10}  tax {:>9} ({:>6})  total {:>10}  {:?}",
                        id,
                        payment.date_due.map_or_else(String::new, |d| d.to_string()),
                        format_money(payment.base_rent_or_zero()),
                        format_money(payment.tax_amount),
                        payment.tax_rate_with_sign(),
                        format_money(payment.total_amount),
                        payment.status
                    );
                }
                println!("    Tenant total: {}", format_money(tenant.tenant_total));
            }
            println!("  Property total: {}", format_money(group.property_total));
            println!();
        }

        println!("Total income: {}", format_money(view.total_income));
        println!("Total tax:    {}", format_money(view.total_tax));
        Ok(())
    }
}
