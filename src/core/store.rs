//! Query seam between the tax engine and wherever payments are kept.

use super::ledger::{AgreementId, Landlord, LandlordId, Ledger, PaymentId};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Filter for the year-to-date base rent aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YtdQuery {
    pub landlord: LandlordId,
    pub year: i32,
    /// Only payments due strictly before this date count
    pub before: NaiveDate,
    /// Payment to leave out of the sum (the one being recomputed)
    pub exclude: Option<PaymentId>,
}

impl YtdQuery {
    pub fn before(landlord: LandlordId, due: NaiveDate, exclude: Option<PaymentId>) -> Self {
        YtdQuery {
            landlord,
            year: due.year(),
            before: due,
            exclude,
        }
    }
}

pub trait PaymentStore {
    /// Owning landlord of an agreement: via its property first, then via unit -> building.
    fn resolve_landlord(&self, agreement: AgreementId) -> Option<&Landlord>;

    /// Sum of `base_rent` over the landlord's payments matching the query.
    /// A payment belongs to the landlord if either its property or its unit's building does.
    fn sum_base_rent(&self, query: &YtdQuery) -> Decimal;
}

impl PaymentStore for Ledger {
    fn resolve_landlord(&self, agreement: AgreementId) -> Option<&Landlord> {
        let agreement = self.agreement(agreement)?;

        let via_property = agreement
            .property
            .and_then(|p| self.property(p))
            .and_then(|p| self.landlord(p.landlord));
        if via_property.is_some() {
            return via_property;
        }

        agreement
            .unit
            .and_then(|u| self.unit_landlord(u))
            .and_then(|l| self.landlord(l))
    }

    fn sum_base_rent(&self, query: &YtdQuery) -> Decimal {
        self.payments
            .iter()
            .filter(|p| query.exclude.is_none_or(|id| p.id != Some(id)))
            .filter(|p| {
                p.date_due
                    .is_some_and(|d| d.year() == query.year && d < query.before)
            })
            .filter(|p| self.payment_owned_by(p, query.landlord))
            .map(|p| p.base_rent_or_zero())
            .sum()
    }
}
