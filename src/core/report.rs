use super::ledger::{LandlordId, Ledger, Payment, PaymentId, PropertyId, TenantId};
use crate::tax::TaxSchedule;
use crate::utils::month_name;
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

/// Months of one year covered by a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
    pub start_month: u32,
    pub end_month: u32,
}

impl ReportPeriod {
    /// Whole year when `full_year` is set or either bound is missing; bounds are
    /// clamped to 1..=12 and swapped if reversed.
    pub fn new(year: i32, start_month: Option<u32>, end_month: Option<u32>, full_year: bool) -> Self {
        let (start, end) = match (start_month, end_month) {
            (Some(s), Some(e)) if !full_year && s > 0 && e > 0 => (s.clamp(1, 12), e.clamp(1, 12)),
            _ => (1, 12),
        };
        ReportPeriod {
            year,
            start_month: start.min(end),
            end_month: start.max(end),
        }
    }

    pub fn is_full_year(&self) -> bool {
        self.start_month == 1 && self.end_month == 12
    }

    pub fn contains(&self, payment: &Payment) -> bool {
        payment.date_due.is_some_and(|d| {
            d.year() == self.year && (self.start_month..=self.end_month).contains(&d.month())
        })
    }

    /// "Year 2024" or "January–March 2024"
    pub fn label(&self) -> String {
        if self.is_full_year() {
            format!("Year {}", self.year)
        } else {
            format!(
                "{}\u{2013}{} {}",
                month_name(self.start_month),
                month_name(self.end_month),
                self.year
            )
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub count: usize,
    /// Sum of base rent
    pub income: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    fn add(&mut self, payment: &Payment) {
        self.count += 1;
        self.income += payment.base_rent_or_zero();
        self.tax += payment.tax_amount;
        self.total += payment.total_amount;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthTotals {
    pub month: u32,
    pub name: &'static str,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub period: String,
    /// Every month of the period, including months without payments
    pub months: Vec<MonthTotals>,
    pub grand: Totals,
}

/// Per-month counts and sums of stored payments due within the period,
/// optionally limited to one landlord.
pub fn period_report(ledger: &Ledger, period: ReportPeriod, landlord: Option<LandlordId>) -> PeriodReport {
    let mut months: Vec<MonthTotals> = (period.start_month..=period.end_month)
        .map(|month| MonthTotals {
            month,
            name: month_name(month),
            totals: Totals::default(),
        })
        .collect();
    let mut grand = Totals::default();

    let mut payments: Vec<&Payment> = ledger
        .payments
        .iter()
        .filter(|p| period.contains(p))
        .filter(|p| landlord.is_none_or(|l| ledger.payment_owned_by(p, l)))
        .collect();
    payments.sort_by_key(|p| p.date_due);

    for payment in payments {
        let Some(due) = payment.date_due else { continue };
        let idx = (due.month() - period.start_month) as usize;
        months[idx].totals.add(payment);
        grand.add(payment);
    }

    PeriodReport {
        period: period.label(),
        months,
        grand,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantGroup {
    pub tenant: Option<TenantId>,
    pub name: String,
    pub payments: Vec<PaymentId>,
    pub tenant_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyGroup {
    pub property: Option<PropertyId>,
    pub label: String,
    pub tenants: Vec<TenantGroup>,
    pub property_total: Decimal,
}

/// Payments due in one month grouped by property then tenant
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyView {
    pub year: i32,
    pub month: u32,
    pub groups: Vec<PropertyGroup>,
    pub total_income: Decimal,
    pub total_tax: Decimal,
}

pub fn monthly_view(ledger: &Ledger, year: i32, month: u32) -> MonthlyView {
    let mut view = MonthlyView {
        year,
        month,
        groups: Vec::new(),
        total_income: Decimal::ZERO,
        total_tax: Decimal::ZERO,
    };

    for payment in ledger.payments.iter().filter(|p| p.is_due_in(year, month)) {
        let agreement = payment.rental_agreement.and_then(|a| ledger.agreement(a));
        let property = agreement.and_then(|a| a.property).and_then(|p| ledger.property(p));
        let tenant = agreement.and_then(|a| ledger.tenant(a.tenant));

        let key = property.map(|p| p.id);
        let group_idx = match view.groups.iter().position(|g| g.property == key) {
            Some(idx) => idx,
            None => {
                view.groups.push(PropertyGroup {
                    property: key,
                    label: property.map_or_else(|| "Unassigned".to_string(), |p| p.label()),
                    tenants: Vec::new(),
                    property_total: Decimal::ZERO,
                });
                view.groups.len() - 1
            }
        };
        let group = &mut view.groups[group_idx];

        let tenant_key = tenant.map(|t| t.id);
        let tenant_idx = match group.tenants.iter().position(|t| t.tenant == tenant_key) {
            Some(idx) => idx,
            None => {
                group.tenants.push(TenantGroup {
                    tenant: tenant_key,
                    name: tenant.map_or_else(|| "Unknown".to_string(), |t| t.name.clone()),
                    payments: Vec::new(),
                    tenant_total: Decimal::ZERO,
                });
                group.tenants.len() - 1
            }
        };
        let tenant_group = &mut group.tenants[tenant_idx];

        if let Some(id) = payment.id {
            tenant_group.payments.push(id);
        }
        tenant_group.tenant_total += payment.total_amount;
        group.property_total += payment.total_amount;
        view.total_income += payment.base_rent_or_zero();
        view.total_tax += payment.tax_amount;
    }

    view
}

/// A landlord's position in the tax year
#[derive(Debug, Clone, Serialize)]
pub struct LandlordYear {
    pub landlord: LandlordId,
    pub name: String,
    pub year: i32,
    pub payments: usize,
    pub base: Decimal,
    pub tax: Decimal,
    /// Low-rate band still available
    pub remaining_low_band: Decimal,
    pub threshold_crossed: bool,
}

/// Band position of each Polish-resident landlord. Others pay no tax here
/// and are left out.
pub fn landlord_years(ledger: &Ledger, year: i32) -> Vec<LandlordYear> {
    let schedule = TaxSchedule::POLAND;
    let threshold = schedule.threshold;
    ledger
        .landlords
        .iter()
        .filter(|landlord| landlord.residency().as_deref() == Some(schedule.country))
        .map(|landlord| {
            let mut totals = Totals::default();
            for payment in ledger.payments.iter().filter(|p| {
                p.date_due.is_some_and(|d| d.year() == year)
                    && ledger.payment_owned_by(p, landlord.id)
            }) {
                totals.add(payment);
            }
            LandlordYear {
                landlord: landlord.id,
                name: landlord.name.clone(),
                year,
                payments: totals.count,
                base: totals.income,
                tax: totals.tax,
                remaining_low_band: (threshold - totals.income).max(Decimal::ZERO),
                threshold_crossed: totals.income > threshold,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::fixtures::*;
    use crate::core::payments::{generate_monthly_payments, recompute_taxes};
    use rust_decimal_macros::dec;

    #[test]
    fn period_bounds_are_normalised() {
        assert_eq!(ReportPeriod::new(2024, None, None, false), ReportPeriod { year: 2024, start_month: 1, end_month: 12 });
        assert_eq!(ReportPeriod::new(2024, Some(3), None, false).start_month, 1);
        assert_eq!(ReportPeriod::new(2024, Some(3), Some(5), true).end_month, 12);

        let swapped = ReportPeriod::new(2024, Some(9), Some(4), false);
        assert_eq!((swapped.start_month, swapped.end_month), (4, 9));

        let clamped = ReportPeriod::new(2024, Some(2), Some(15), false);
        assert_eq!((clamped.start_month, clamped.end_month), (2, 12));
    }

    #[test]
    fn period_labels() {
        assert_eq!(ReportPeriod::new(2024, None, None, true).label(), "Year 2024");
        assert_eq!(
            ReportPeriod::new(2024, Some(1), Some(3), false).label(),
            "January\u{2013}March 2024"
        );
    }

    fn year_of_payments() -> Ledger {
        let mut ledger = polish_ledger();
        ledger.agreements[0].base_rent = dec!(10000);
        ledger.agreements[0].coop_fee = dec!(500);
        for month in 1..=12 {
            generate_monthly_payments(&mut ledger, 2024, month, 10, false).unwrap();
        }
        ledger
    }

    #[test]
    fn period_report_sums_by_month() {
        let ledger = year_of_payments();
        let report = period_report(&ledger, ReportPeriod::new(2024, Some(10), Some(12), false), None);

        assert_eq!(report.months.len(), 3);
        assert_eq!(report.months[0].name, "October");
        // October: ytd 90000, 10000 base split 10000 low / 0 high
        assert_eq!(report.months[0].totals.tax, dec!(850));
        // November and December are fully in the high band
        assert_eq!(report.months[1].totals.tax, dec!(1250));
        assert_eq!(report.grand.count, 3);
        assert_eq!(report.grand.income, dec!(30000));
        assert_eq!(report.grand.tax, dec!(3350));
        assert_eq!(report.grand.total, dec!(34850));
    }

    #[test]
    fn period_report_can_filter_by_landlord() {
        let ledger = year_of_payments();
        let period = ReportPeriod::new(2024, None, None, true);
        assert_eq!(period_report(&ledger, period, Some(1)).grand.count, 12);
        let other = period_report(&ledger, period, Some(2));
        assert_eq!(other.grand, Totals::default());
        assert_eq!(other.months.len(), 12);
    }

    #[test]
    fn monthly_view_groups_by_property_and_tenant() {
        let mut ledger = polish_ledger();
        ledger.tenants.push(tenant(2));
        ledger.agreements.push(agreement(2, 2, Some(1), dec!(2000)));
        generate_monthly_payments(&mut ledger, 2024, 4, 5, false).unwrap();
        ledger.payments.push(payment(Some(99), 7, date(2024, 4, 20), dec!(300)));
        recompute_taxes(&mut ledger, None);

        let view = monthly_view(&ledger, 2024, 4);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].tenants.len(), 2);
        assert_eq!(view.groups[0].property_total, dec!(3255));
        assert_eq!(view.groups[1].label, "Unassigned");
        assert_eq!(view.total_income, dec!(3300));
        assert_eq!(view.total_tax, dec!(255));
    }

    #[test]
    fn landlord_year_tracks_threshold() {
        let ledger = year_of_payments();
        let years = landlord_years(&ledger, 2024);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].base, dec!(120000));
        assert!(years[0].threshold_crossed);
        assert_eq!(years[0].remaining_low_band, Decimal::ZERO);
        assert_eq!(years[0].tax, dec!(8500) + dec!(2500));
    }

    #[test]
    fn landlord_year_skips_foreign_landlords() {
        let mut ledger = year_of_payments();
        ledger.landlords.push(landlord(2, Some("DE")));
        ledger.landlords.push(landlord(3, None));
        let years = landlord_years(&ledger, 2024);
        let ids: Vec<_> = years.iter().map(|y| y.landlord).collect();
        assert_eq!(ids, vec![1]);
    }
}
