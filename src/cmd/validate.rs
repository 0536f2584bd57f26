//! Validate command - surface ledger problems without producing reports

use super::{format_money, read_ledger};
use crate::core::{Ledger, LedgerError};
use crate::tax::{assess, compute_tax_for_payment, TaxOutcome};
use chrono::Datelike;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// JSON ledger file ("-" for stdin)
    #[arg(short, long)]
    ledger: PathBuf,

    /// Only check payments due in this year
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    scope: String,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let ledger = read_ledger(&self.ledger)?;
        let issues = collect_issues(&ledger, self.year);
        let scope = self.year.map_or("All Years".to_string(), |y| y.to_string());

        if self.json {
            let output = ValidationOutput {
                scope,
                issue_count: issues.len(),
                issues: issues.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&issues, &scope);
        }

        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn collect_issues(ledger: &Ledger, year: Option<i32>) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = ledger
        .validate()
        .into_iter()
        .map(|e| ValidationIssue {
            issue_type: integrity_type_name(&e),
            message: e.to_string(),
        })
        .collect();

    let mut payments: Vec<_> = ledger
        .payments
        .iter()
        .filter(|p| year.is_none_or(|y| p.date_due.is_some_and(|d| d.year() == y)))
        .collect();
    payments.sort_by_key(|p| (p.date_due, p.id));

    for payment in payments {
        let label = payment
            .id
            .map_or_else(|| "unsaved payment".to_string(), |id| format!("payment {id}"));
        let outcome = assess(payment, ledger);
        if matches!(outcome, TaxOutcome::Unresolvable(_)) {
            issues.push(ValidationIssue {
                issue_type: "Unresolvable",
                message: format!(
                    "{}: tax cannot be determined ({})",
                    label,
                    outcome.reason().unwrap_or_default()
                ),
            });
            continue;
        }
        let (rate, tax) = compute_tax_for_payment(payment, ledger);
        if rate != payment.tax_rate || tax != payment.tax_amount {
            issues.push(ValidationIssue {
                issue_type: "StaleTax",
                message: format!(
                    "{}: stored tax {} differs from recomputed {}",
                    label,
                    format_money(payment.tax_amount),
                    format_money(tax)
                ),
            });
        }
        if payment.total_amount != payment.subtotal() + payment.tax_amount {
            issues.push(ValidationIssue {
                issue_type: "TotalMismatch",
                message: format!(
                    "{}: total {} is not charges {} plus tax {}",
                    label,
                    format_money(payment.total_amount),
                    format_money(payment.subtotal()),
                    format_money(payment.tax_amount)
                ),
            });
        }
    }
    issues
}

fn integrity_type_name(error: &LedgerError) -> &'static str {
    match error {
        LedgerError::DuplicateId { .. } => "DuplicateId",
        LedgerError::MissingReference { .. } => "MissingReference",
        LedgerError::UnidentifiedPayment(_) => "UnidentifiedPayment",
        LedgerError::UnplacedAgreement(_) => "UnplacedAgreement",
        LedgerError::InvertedAgreement { .. } => "InvertedAgreement",
    }
}

fn print_text(issues: &[ValidationIssue], scope: &str) {
    println!();
    println!("VALIDATION RESULTS ({})", scope);
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();
    for (i, issue) in issues.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, issue.issue_type, issue.message);
    }
    println!();
}
