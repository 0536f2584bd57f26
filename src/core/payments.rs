use super::ledger::{AgreementId, Ledger, Payment, PaymentId, PaymentStatus, RentalAgreement, TenantId};
use super::store::PaymentStore;
use crate::tax::{self, TaxOutcome};
use crate::utils::month_bounds;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment not found: {0}")]
    NotFound(PaymentId),
    #[error("rental agreement not found: {0}")]
    UnknownAgreement(AgreementId),
    #[error("invalid month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// User-entered payment fields. Tax, total and water are derived on save.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub rental_agreement: Option<AgreementId>,
    pub date_due: NaiveDate,
    pub date_paid: Option<NaiveDate>,
    pub base_rent: Decimal,
    pub coop_fee: Decimal,
    pub electricity: Decimal,
    pub gas: Decimal,
    pub other_fees: Decimal,
    pub status: PaymentStatus,
    pub invoice_url: Option<String>,
}

impl PaymentDraft {
    /// Draft carrying the agreement's monthly charges
    pub fn from_agreement(agreement: &RentalAgreement, date_due: NaiveDate) -> Self {
        PaymentDraft {
            rental_agreement: Some(agreement.id),
            date_due,
            date_paid: None,
            base_rent: agreement.base_rent,
            coop_fee: agreement.coop_fee,
            electricity: agreement.electricity,
            gas: agreement.gas,
            other_fees: agreement.other_fees,
            status: PaymentStatus::Pending,
            invoice_url: None,
        }
    }

    /// Draft carrying a stored payment's fields, for partial edits
    pub fn from_payment(payment: &Payment, date_due: NaiveDate) -> Self {
        PaymentDraft {
            rental_agreement: payment.rental_agreement,
            date_due,
            date_paid: payment.date_paid,
            base_rent: payment.base_rent_or_zero(),
            coop_fee: payment.coop_fee,
            electricity: payment.electricity,
            gas: payment.gas,
            other_fees: payment.other_fees,
            status: payment.status,
            invoice_url: payment.invoice_url.clone(),
        }
    }

    fn apply_to(self, payment: &mut Payment) {
        payment.rental_agreement = self.rental_agreement;
        payment.date_due = Some(self.date_due);
        payment.date_paid = self.date_paid;
        payment.base_rent = Some(self.base_rent);
        payment.coop_fee = self.coop_fee;
        payment.electricity = self.electricity;
        payment.water = Decimal::ZERO;
        payment.gas = self.gas;
        payment.other_fees = self.other_fees;
        payment.status = self.status;
        payment.invoice_url = self.invoice_url;
    }
}

/// Outcome of generating a month's payments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub due_date: Option<NaiveDate>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Compute and store tax, then the total (charges before tax plus tax).
pub fn apply_tax<S: PaymentStore + ?Sized>(payment: &mut Payment, store: &S) -> TaxOutcome {
    let outcome = tax::assess(payment, store);
    let (rate, amount) = outcome.rate_and_amount();
    payment.tax_rate = rate;
    payment.tax_amount = amount;
    payment.total_amount = payment.subtotal() + amount;
    outcome
}

fn check_agreement(ledger: &Ledger, agreement: Option<AgreementId>) -> Result<(), PaymentError> {
    match agreement {
        Some(id) if ledger.agreement(id).is_none() => Err(PaymentError::UnknownAgreement(id)),
        _ => Ok(()),
    }
}

fn position(ledger: &Ledger, id: PaymentId) -> Result<usize, PaymentError> {
    ledger
        .payments
        .iter()
        .position(|p| p.id == Some(id))
        .ok_or(PaymentError::NotFound(id))
}

pub fn create_payment(ledger: &mut Ledger, draft: PaymentDraft) -> Result<PaymentId, PaymentError> {
    check_agreement(ledger, draft.rental_agreement)?;

    let mut payment = Payment::default();
    draft.apply_to(&mut payment);
    apply_tax(&mut payment, &*ledger);

    let id = ledger.next_payment_id();
    payment.id = Some(id);
    log::info!(
        "Created payment {} due {:?}: tax {} total {}",
        id,
        payment.date_due,
        payment.tax_amount,
        payment.total_amount
    );
    ledger.payments.push(payment);
    Ok(id)
}

/// Replace a stored payment's fields and recompute its tax. Its own stored row
/// does not count towards its year-to-date base.
pub fn update_payment(
    ledger: &mut Ledger,
    id: PaymentId,
    draft: PaymentDraft,
) -> Result<(), PaymentError> {
    let idx = position(ledger, id)?;
    check_agreement(ledger, draft.rental_agreement)?;

    let mut payment = ledger.payments[idx].clone();
    draft.apply_to(&mut payment);
    apply_tax(&mut payment, &*ledger);
    log::info!("Updated payment {}: tax {} total {}", id, payment.tax_amount, payment.total_amount);
    ledger.payments[idx] = payment;
    Ok(())
}

/// Remove a payment. Sibling payments keep their stored tax.
pub fn delete_payment(ledger: &mut Ledger, id: PaymentId) -> Result<Payment, PaymentError> {
    let idx = position(ledger, id)?;
    log::info!("Deleted payment {}", id);
    Ok(ledger.payments.remove(idx))
}

/// Create the month's payment for every agreement active in that month.
///
/// `due_day` is clamped to the month's length. An agreement that already has a
/// payment on the due date is left alone unless `overwrite` is set, in which case
/// its charges are reset from the agreement and its tax recomputed.
pub fn generate_monthly_payments(
    ledger: &mut Ledger,
    year: i32,
    month: u32,
    due_day: u32,
    overwrite: bool,
) -> Result<GenerationSummary, PaymentError> {
    let (first, last) = month_bounds(year, month).ok_or(PaymentError::InvalidMonth { year, month })?;
    let due = first
        .with_day(due_day.clamp(1, last.day()))
        .ok_or(PaymentError::InvalidMonth { year, month })?;

    let active: Vec<RentalAgreement> = ledger
        .agreements
        .iter()
        .filter(|a| a.is_active_between(first, last))
        .cloned()
        .collect();

    let mut summary = GenerationSummary {
        due_date: Some(due),
        ..GenerationSummary::default()
    };

    for agreement in active {
        let existing = ledger
            .payments
            .iter()
            .position(|p| p.rental_agreement == Some(agreement.id) && p.date_due == Some(due));

        match existing {
            Some(idx) if overwrite => {
                let mut payment = ledger.payments[idx].clone();
                fill_charges(&mut payment, &agreement);
                apply_tax(&mut payment, &*ledger);
                ledger.payments[idx] = payment;
                summary.updated += 1;
            }
            Some(_) => {
                log::debug!("Agreement {} already has a payment due {}", agreement.id, due);
                summary.skipped += 1;
            }
            None => {
                let mut payment = Payment {
                    rental_agreement: Some(agreement.id),
                    date_due: Some(due),
                    ..Payment::default()
                };
                fill_charges(&mut payment, &agreement);
                apply_tax(&mut payment, &*ledger);
                payment.id = Some(ledger.next_payment_id());
                ledger.payments.push(payment);
                summary.created += 1;
            }
        }
    }

    log::info!(
        "Payments generated for {}-{:02}: created={}, updated={}",
        year,
        month,
        summary.created,
        summary.updated
    );
    Ok(summary)
}

fn fill_charges(payment: &mut Payment, agreement: &RentalAgreement) {
    payment.base_rent = Some(agreement.base_rent);
    payment.coop_fee = agreement.coop_fee;
    payment.electricity = agreement.electricity;
    payment.water = Decimal::ZERO;
    payment.gas = agreement.gas;
    payment.other_fees = agreement.other_fees;
}

/// Rewrite every stored payment's tax in due-date order (ties by id), optionally
/// restricted to one year. Returns the number of payments whose tax changed.
pub fn recompute_taxes(ledger: &mut Ledger, year: Option<i32>) -> usize {
    let mut order: Vec<usize> = (0..ledger.payments.len())
        .filter(|&i| {
            let due = ledger.payments[i].date_due;
            year.is_none_or(|y| due.is_some_and(|d| d.year() == y))
        })
        .collect();
    order.sort_by_key(|&i| (ledger.payments[i].date_due, ledger.payments[i].id));

    let mut changed = 0;
    for idx in order {
        let mut payment = ledger.payments[idx].clone();
        apply_tax(&mut payment, &*ledger);
        if payment.tax_amount != ledger.payments[idx].tax_amount
            || payment.tax_rate != ledger.payments[idx].tax_rate
        {
            log::info!(
                "Payment {:?}: tax {} -> {}",
                payment.id,
                ledger.payments[idx].tax_amount,
                payment.tax_amount
            );
            changed += 1;
        }
        ledger.payments[idx] = payment;
    }
    changed
}

/// A tenant's payments, most recent due date first
pub fn payments_for_tenant(ledger: &Ledger, tenant: TenantId) -> Vec<&Payment> {
    let mut payments: Vec<&Payment> = ledger
        .payments
        .iter()
        .filter(|p| ledger.payment_tenant(p).is_some_and(|t| t.id == tenant))
        .collect();
    payments.sort_by(|a, b| b.date_due.cmp(&a.date_due));
    payments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::fixtures::*;
    use rust_decimal_macros::dec;

    fn draft(due: NaiveDate, base_rent: Decimal) -> PaymentDraft {
        PaymentDraft {
            rental_agreement: Some(1),
            date_due: due,
            date_paid: None,
            base_rent,
            coop_fee: dec!(300),
            electricity: dec!(100),
            gas: dec!(50),
            other_fees: dec!(0),
            status: PaymentStatus::Pending,
            invoice_url: None,
        }
    }

    #[test]
    fn create_computes_tax_and_total() {
        let mut ledger = polish_ledger();
        let id = create_payment(&mut ledger, draft(date(2024, 1, 5), dec!(1000))).unwrap();

        let p = ledger.payment(id).unwrap();
        assert_eq!(p.tax_rate, dec!(0.085));
        assert_eq!(p.tax_amount, dec!(85));
        assert_eq!(p.water, Decimal::ZERO);
        assert_eq!(p.total_amount, dec!(1535));
    }

    #[test]
    fn create_rejects_unknown_agreement() {
        let mut ledger = polish_ledger();
        let mut d = draft(date(2024, 1, 5), dec!(1000));
        d.rental_agreement = Some(9);
        assert_eq!(create_payment(&mut ledger, d), Err(PaymentError::UnknownAgreement(9)));
        assert!(ledger.payments.is_empty());
    }

    #[test]
    fn update_is_idempotent() {
        let mut ledger = polish_ledger();
        create_payment(&mut ledger, draft(date(2024, 1, 5), dec!(95000))).unwrap();
        let id = create_payment(&mut ledger, draft(date(2024, 2, 5), dec!(10000))).unwrap();
        let before = ledger.payment(id).unwrap().clone();
        assert_eq!(before.tax_amount, dec!(1050));

        update_payment(&mut ledger, id, draft(date(2024, 2, 5), dec!(10000))).unwrap();
        let after = ledger.payment(id).unwrap();
        assert_eq!(after.tax_amount, before.tax_amount);
        assert_eq!(after.tax_rate, before.tax_rate);
    }

    #[test]
    fn partial_update_keeps_stored_fields() {
        let mut ledger = polish_ledger();
        let mut paid = draft(date(2024, 3, 10), dec!(1000));
        paid.status = PaymentStatus::Paid;
        paid.date_paid = Some(date(2024, 3, 9));
        let id = create_payment(&mut ledger, paid).unwrap();
        assert_eq!(ledger.payment(id).unwrap().tax_amount, dec!(85));

        let stored = ledger.payment(id).unwrap();
        let mut edit = PaymentDraft::from_payment(stored, date(2024, 3, 10));
        edit.base_rent = dec!(2000);
        update_payment(&mut ledger, id, edit).unwrap();

        let p = ledger.payment(id).unwrap();
        assert_eq!(p.rental_agreement, Some(1));
        assert_eq!(p.status, PaymentStatus::Paid);
        assert_eq!(p.date_paid, Some(date(2024, 3, 9)));
        assert_eq!(p.coop_fee, dec!(300));
        assert_eq!(p.tax_amount, dec!(170));
        assert_eq!(p.total_amount, dec!(2000) + dec!(450) + dec!(170));
    }

    #[test]
    fn update_missing_payment() {
        let mut ledger = polish_ledger();
        assert_eq!(
            update_payment(&mut ledger, 3, draft(date(2024, 2, 5), dec!(1))),
            Err(PaymentError::NotFound(3))
        );
    }

    #[test]
    fn delete_does_not_cascade() {
        let mut ledger = polish_ledger();
        let first = create_payment(&mut ledger, draft(date(2024, 1, 5), dec!(100000))).unwrap();
        let second = create_payment(&mut ledger, draft(date(2024, 2, 5), dec!(1000))).unwrap();

        let removed = delete_payment(&mut ledger, first).unwrap();
        assert_eq!(removed.date_due, Some(date(2024, 1, 5)));
        assert_eq!(ledger.payment(second).unwrap().tax_amount, dec!(125));
        assert!(matches!(
            delete_payment(&mut ledger, first),
            Err(PaymentError::NotFound(id)) if id == first
        ));
    }

    #[test]
    fn generation_creates_once_per_agreement() {
        let mut ledger = polish_ledger();
        let summary = generate_monthly_payments(&mut ledger, 2024, 2, 31, false).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.due_date, Some(date(2024, 2, 29)));

        let p = &ledger.payments[0];
        assert_eq!(p.id, Some(1));
        assert_eq!(p.base_rent, Some(dec!(1000)));
        assert_eq!(p.tax_amount, dec!(85));
        assert_eq!(p.total_amount, dec!(1085));

        let again = generate_monthly_payments(&mut ledger, 2024, 2, 31, false).unwrap();
        assert_eq!((again.created, again.updated, again.skipped), (0, 0, 1));
        assert_eq!(ledger.payments.len(), 1);
    }

    #[test]
    fn generation_overwrite_resets_charges() {
        let mut ledger = polish_ledger();
        generate_monthly_payments(&mut ledger, 2024, 3, 5, false).unwrap();
        ledger.payments[0].base_rent = Some(dec!(1));
        ledger.payments[0].status = PaymentStatus::Paid;
        ledger.agreements[0].base_rent = dec!(2000);

        let summary = generate_monthly_payments(&mut ledger, 2024, 3, 5, true).unwrap();
        assert_eq!((summary.created, summary.updated), (0, 1));
        let p = &ledger.payments[0];
        assert_eq!(p.base_rent, Some(dec!(2000)));
        assert_eq!(p.tax_amount, dec!(170));
        assert_eq!(p.status, PaymentStatus::Paid);
    }

    #[test]
    fn generation_skips_inactive_agreements() {
        let mut ledger = polish_ledger();
        ledger.agreements[0].end_date = Some(date(2024, 2, 29));
        let mut later = agreement(2, 1, Some(1), dec!(500));
        later.start_date = Some(date(2024, 3, 31));
        ledger.agreements.push(later);

        let summary = generate_monthly_payments(&mut ledger, 2024, 3, 0, false).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.due_date, Some(date(2024, 3, 1)));
        assert_eq!(ledger.payments[0].rental_agreement, Some(2));
    }

    #[test]
    fn generation_rejects_invalid_month() {
        let mut ledger = polish_ledger();
        assert_eq!(
            generate_monthly_payments(&mut ledger, 2024, 13, 5, false),
            Err(PaymentError::InvalidMonth { year: 2024, month: 13 })
        );
    }

    #[test]
    fn recompute_fixes_out_of_order_entries() {
        let mut ledger = polish_ledger();
        // entered out of order: March first, then January
        create_payment(&mut ledger, draft(date(2024, 3, 5), dec!(60000))).unwrap();
        create_payment(&mut ledger, draft(date(2024, 1, 5), dec!(60000))).unwrap();
        assert_eq!(ledger.payments[0].tax_amount, dec!(5100));

        let changed = recompute_taxes(&mut ledger, Some(2024));
        assert_eq!(changed, 1);
        // 40000 at 8.5% + 20000 at 12.5%
        assert_eq!(ledger.payments[0].tax_amount, dec!(5900));
        assert_eq!(ledger.payments[1].tax_amount, dec!(5100));
        assert_eq!(recompute_taxes(&mut ledger, None), 0);
    }

    #[test]
    fn tenant_payments_newest_first() {
        let mut ledger = polish_ledger();
        create_payment(&mut ledger, draft(date(2024, 1, 5), dec!(1000))).unwrap();
        create_payment(&mut ledger, draft(date(2024, 3, 5), dec!(1000))).unwrap();
        create_payment(&mut ledger, draft(date(2024, 2, 5), dec!(1000))).unwrap();

        let dues: Vec<_> = payments_for_tenant(&ledger, 1)
            .iter()
            .map(|p| p.date_due.unwrap())
            .collect();
        assert_eq!(dues, vec![date(2024, 3, 5), date(2024, 2, 5), date(2024, 1, 5)]);
        assert!(payments_for_tenant(&ledger, 2).is_empty());
    }
}
