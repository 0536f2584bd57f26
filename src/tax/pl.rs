use crate::core::{Payment, PaymentStore, YtdQuery};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Two-bracket flat-rate schedule applied to a landlord's rent per calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSchedule {
    /// Residency country the schedule applies to (ISO 3166-1 alpha-2)
    pub country: &'static str,
    pub low_rate: Decimal,
    pub high_rate: Decimal,
    /// Year-to-date base up to which the low rate applies
    pub threshold: Decimal,
}

impl TaxSchedule {
    /// Polish lump-sum tax on rental income: 8.5% up to 100,000 PLN a year, 12.5% above.
    pub const POLAND: TaxSchedule = TaxSchedule {
        country: "PL",
        low_rate: dec!(0.085),
        high_rate: dec!(0.125),
        threshold: dec!(100000),
    };

    /// Split `base` across the brackets given what has already been taxed this year.
    pub fn split(&self, ytd_before: Decimal, base: Decimal) -> Assessment {
        let remaining_low_band = (self.threshold - ytd_before).max(Decimal::ZERO);
        let taxed_at_low = base.min(remaining_low_band);
        let taxed_at_high = (base - taxed_at_low).max(Decimal::ZERO);

        let tax_amount = taxed_at_low * self.low_rate + taxed_at_high * self.high_rate;
        let effective_rate = if base.is_zero() {
            Decimal::ZERO
        } else {
            tax_amount / base
        };

        Assessment {
            ytd_before,
            taxed_at_low,
            taxed_at_high,
            tax_amount,
            effective_rate,
        }
    }
}

/// Detail of a computed tax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub ytd_before: Decimal,
    pub taxed_at_low: Decimal,
    pub taxed_at_high: Decimal,
    pub tax_amount: Decimal,
    /// `tax_amount / base`, between the two bracket rates when the payment straddles the threshold
    pub effective_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotTaxable {
    /// Landlord has no usable residency code
    NoResidency,
    /// Landlord is resident elsewhere
    ForeignResident(String),
    /// Base rent is missing, zero or negative
    NoTaxableBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolvable {
    NoAgreement,
    NoLandlord,
    NoDueDate,
}

/// Result of assessing one payment.
///
/// Only `Computed` carries tax; callers that need the stored `(rate, amount)`
/// pair use [`TaxOutcome::rate_and_amount`], which is zero for the other variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxOutcome {
    Computed(Assessment),
    NotTaxable(NotTaxable),
    Unresolvable(Unresolvable),
}

impl TaxOutcome {
    pub fn rate_and_amount(&self) -> (Decimal, Decimal) {
        match self {
            TaxOutcome::Computed(a) => (a.effective_rate, a.tax_amount),
            TaxOutcome::NotTaxable(_) | TaxOutcome::Unresolvable(_) => {
                (Decimal::ZERO, Decimal::ZERO)
            }
        }
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            TaxOutcome::Computed(a) => Some(a),
            _ => None,
        }
    }

    /// Short reason for display, `None` when tax was computed
    pub fn reason(&self) -> Option<String> {
        match self {
            TaxOutcome::Computed(_) => None,
            TaxOutcome::NotTaxable(NotTaxable::NoResidency) => Some("no residency".to_string()),
            TaxOutcome::NotTaxable(NotTaxable::ForeignResident(code)) => {
                Some(format!("resident in {code}"))
            }
            TaxOutcome::NotTaxable(NotTaxable::NoTaxableBase) => Some("no base rent".to_string()),
            TaxOutcome::Unresolvable(Unresolvable::NoAgreement) => Some("no agreement".to_string()),
            TaxOutcome::Unresolvable(Unresolvable::NoLandlord) => Some("no landlord".to_string()),
            TaxOutcome::Unresolvable(Unresolvable::NoDueDate) => Some("no due date".to_string()),
        }
    }
}

/// Assess the tax for a payment against the Polish schedule.
///
/// Reads the landlord's earlier payments in the same calendar year through `store`.
/// Payments due on the same day as this one are not counted, nor is the payment's
/// own stored row when it already has an id.
pub fn assess<S: PaymentStore + ?Sized>(payment: &Payment, store: &S) -> TaxOutcome {
    assess_with(&TaxSchedule::POLAND, payment, store)
}

pub fn assess_with<S: PaymentStore + ?Sized>(
    schedule: &TaxSchedule,
    payment: &Payment,
    store: &S,
) -> TaxOutcome {
    let Some(agreement) = payment.rental_agreement else {
        return TaxOutcome::Unresolvable(Unresolvable::NoAgreement);
    };
    let Some(landlord) = store.resolve_landlord(agreement) else {
        log::debug!("Payment {:?}: no landlord for agreement {}", payment.id, agreement);
        return TaxOutcome::Unresolvable(Unresolvable::NoLandlord);
    };

    match landlord.residency() {
        None => return TaxOutcome::NotTaxable(NotTaxable::NoResidency),
        Some(code) if code != schedule.country => {
            return TaxOutcome::NotTaxable(NotTaxable::ForeignResident(code))
        }
        Some(_) => {}
    }

    let base = payment.base_rent_or_zero().max(Decimal::ZERO);
    if base <= Decimal::ZERO {
        return TaxOutcome::NotTaxable(NotTaxable::NoTaxableBase);
    }

    let Some(due) = payment.date_due else {
        return TaxOutcome::Unresolvable(Unresolvable::NoDueDate);
    };

    let ytd_before = store.sum_base_rent(&YtdQuery::before(landlord.id, due, payment.id));
    let assessment = schedule.split(ytd_before, base);
    log::debug!(
        "Payment {:?} landlord {} due {}: base={}, ytd_before={}, low={}, high={}, tax={}",
        payment.id,
        landlord.id,
        due,
        base,
        ytd_before,
        assessment.taxed_at_low,
        assessment.taxed_at_high,
        assessment.tax_amount
    );
    TaxOutcome::Computed(assessment)
}

/// Effective rate and tax amount to store on the payment. Never fails: anything
/// that prevents a computation yields `(0, 0)`.
pub fn compute_tax_for_payment<S: PaymentStore + ?Sized>(
    payment: &Payment,
    store: &S,
) -> (Decimal, Decimal) {
    assess(payment, store).rate_and_amount()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::fixtures::*;
    use crate::core::Ledger;

    fn with_prior(ytd: Decimal) -> Ledger {
        let mut ledger = polish_ledger();
        ledger
            .payments
            .push(payment(Some(1), 1, date(2024, 1, 5), ytd));
        ledger
    }

    fn assert_zero(outcome: (Decimal, Decimal)) {
        assert_eq!(outcome, (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn non_polish_landlord_pays_nothing() {
        for country in [Some("DE"), Some(""), Some("Poland"), None] {
            let mut ledger = polish_ledger();
            ledger.landlords[0].tax_residency_country = country.map(str::to_string);
            let p = payment(None, 1, date(2024, 3, 5), dec!(5000));
            assert_zero(compute_tax_for_payment(&p, &ledger));
        }
    }

    #[test]
    fn residency_is_case_insensitive() {
        let mut ledger = polish_ledger();
        ledger.landlords[0].tax_residency_country = Some("pl".to_string());
        let p = payment(None, 1, date(2024, 3, 5), dec!(1000));
        assert_eq!(compute_tax_for_payment(&p, &ledger), (dec!(0.085), dec!(85)));
    }

    #[test]
    fn padded_residency_code_is_not_polish() {
        let mut ledger = polish_ledger();
        ledger.landlords[0].tax_residency_country = Some(" PL ".to_string());
        let p = payment(None, 1, date(2024, 3, 5), dec!(1000));
        assert_eq!(assess(&p, &ledger), TaxOutcome::NotTaxable(NotTaxable::NoResidency));
        assert_zero(compute_tax_for_payment(&p, &ledger));
    }

    #[test]
    fn zero_or_negative_base_pays_nothing() {
        let ledger = polish_ledger();
        for base in [dec!(0), dec!(-100)] {
            let p = payment(None, 1, date(2024, 3, 5), base);
            assert_eq!(
                assess(&p, &ledger),
                TaxOutcome::NotTaxable(NotTaxable::NoTaxableBase)
            );
        }
        let mut p = payment(None, 1, date(2024, 3, 5), dec!(0));
        p.base_rent = None;
        assert_zero(compute_tax_for_payment(&p, &ledger));
    }

    #[test]
    fn single_low_bracket_payment() {
        let ledger = polish_ledger();
        let p = payment(None, 1, date(2024, 3, 5), dec!(1000));
        assert_eq!(compute_tax_for_payment(&p, &ledger), (dec!(0.085), dec!(85)));
    }

    #[test]
    fn payment_crossing_threshold_is_split() {
        let ledger = with_prior(dec!(95000));
        let p = payment(None, 1, date(2024, 6, 5), dec!(10000));

        let outcome = assess(&p, &ledger);
        let a = outcome.assessment().unwrap();
        assert_eq!(a.ytd_before, dec!(95000));
        assert_eq!(a.taxed_at_low, dec!(5000));
        assert_eq!(a.taxed_at_high, dec!(5000));
        assert_eq!(outcome.rate_and_amount(), (dec!(0.105), dec!(1050)));
    }

    #[test]
    fn payment_fully_in_high_bracket() {
        let ledger = with_prior(dec!(150000));
        let p = payment(None, 1, date(2024, 6, 5), dec!(5000));
        assert_eq!(compute_tax_for_payment(&p, &ledger), (dec!(0.125), dec!(625)));
    }

    #[test]
    fn recompute_excludes_own_row() {
        let mut ledger = with_prior(dec!(95000));
        let mut p = payment(None, 1, date(2024, 6, 5), dec!(10000));
        let first = compute_tax_for_payment(&p, &ledger);

        // stored copy dated earlier, so only the id keeps it out of the sum
        p.id = Some(2);
        let mut stored = p.clone();
        stored.date_due = Some(date(2024, 2, 5));
        ledger.payments.push(stored);

        assert_eq!(compute_tax_for_payment(&p, &ledger), first);
        assert_eq!(compute_tax_for_payment(&p, &ledger), first);
    }

    #[test]
    fn earlier_years_do_not_count() {
        let mut ledger = polish_ledger();
        ledger
            .payments
            .push(payment(Some(1), 1, date(2023, 12, 31), dec!(200000)));
        let p = payment(None, 1, date(2024, 1, 1), dec!(1000));
        assert_eq!(compute_tax_for_payment(&p, &ledger), (dec!(0.085), dec!(85)));
    }

    #[test]
    fn same_day_payments_do_not_see_each_other() {
        let mut ledger = polish_ledger();
        ledger
            .payments
            .push(payment(Some(1), 1, date(2024, 5, 5), dec!(99000)));
        let p = payment(None, 1, date(2024, 5, 5), dec!(10000));

        let outcome = assess(&p, &ledger);
        assert_eq!(outcome.assessment().unwrap().ytd_before, Decimal::ZERO);
        assert_eq!(outcome.rate_and_amount(), (dec!(0.085), dec!(850)));
    }

    #[test]
    fn unresolvable_payments_degrade_to_zero() {
        let ledger = polish_ledger();

        let mut p = payment(None, 1, date(2024, 5, 5), dec!(1000));
        p.rental_agreement = None;
        assert_eq!(assess(&p, &ledger), TaxOutcome::Unresolvable(Unresolvable::NoAgreement));

        p.rental_agreement = Some(42);
        assert_eq!(assess(&p, &ledger), TaxOutcome::Unresolvable(Unresolvable::NoLandlord));

        p.rental_agreement = Some(1);
        p.date_due = None;
        assert_eq!(assess(&p, &ledger), TaxOutcome::Unresolvable(Unresolvable::NoDueDate));
        assert_zero(compute_tax_for_payment(&p, &ledger));
    }

    #[test]
    fn sequence_of_payments_through_the_year() {
        let mut ledger = polish_ledger();
        let mut results = Vec::new();
        for (id, (month, base)) in [(1, dec!(40000)), (2, dec!(40000)), (3, dec!(30000))]
            .into_iter()
            .enumerate()
        {
            let mut p = payment(None, 1, date(2024, month, 1), base);
            let (rate, amount) = compute_tax_for_payment(&p, &ledger);
            p.id = Some(id as u32 + 1);
            p.tax_rate = rate;
            p.tax_amount = amount;
            ledger.payments.push(p);
            results.push((rate, amount));
        }

        assert_eq!(results[0], (dec!(0.085), dec!(3400)));
        assert_eq!(results[1], (dec!(0.085), dec!(3400)));
        assert_eq!(results[2].1, dec!(2950));
        assert_eq!(
            results[2].0.round_dp(20),
            (dec!(2950) / dec!(30000)).round_dp(20)
        );
        assert_eq!(results[2].0.round_dp(5), dec!(0.09833));
    }

    #[test]
    fn reasons_are_reported() {
        let mut ledger = polish_ledger();
        ledger.landlords[0].tax_residency_country = Some("de".to_string());
        let p = payment(None, 1, date(2024, 5, 5), dec!(1000));
        assert_eq!(assess(&p, &ledger).reason().as_deref(), Some("resident in DE"));
    }
}
