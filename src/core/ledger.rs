use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Write};

pub type LandlordId = u32;
pub type TenantId = u32;
pub type PropertyId = u32;
pub type BuildingId = u32;
pub type UnitId = u32;
pub type AgreementId = u32;
pub type PaymentId = u32;
pub type ReminderId = u32;
pub type InvitationId = u32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: u32 },
    #[error("{kind} {id} references missing {target} {target_id}")]
    MissingReference {
        kind: &'static str,
        id: u32,
        target: &'static str,
        target_id: u32,
    },
    #[error("payment without id (due {0:?})")]
    UnidentifiedPayment(Option<NaiveDate>),
    #[error("agreement {0} has neither a property nor a unit")]
    UnplacedAgreement(AgreementId),
    #[error("agreement {id} ends ({end}) before it starts ({start})")]
    InvertedAgreement {
        id: AgreementId,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Root of the JSON ledger file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Ledger {
    #[serde(default)]
    pub landlords: Vec<Landlord>,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub agreements: Vec<RentalAgreement>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub invitations: Vec<TenantInvitation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Landlord {
    pub id: LandlordId,
    pub name: String,
    #[serde(default)]
    pub contact_info: String,
    /// ISO 3166-1 alpha-2 country code of tax residency (e.g. "PL")
    #[serde(default)]
    pub tax_residency_country: Option<String>,
}

impl Landlord {
    /// Normalised residency code, `None` when missing or not a two-letter code.
    pub fn residency(&self) -> Option<String> {
        let code = self.tax_residency_country.as_deref()?;
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(code.to_ascii_uppercase())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_info: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum PropertyStatus {
    #[default]
    Available,
    Rented,
    Maintenance,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Property {
    pub id: PropertyId,
    pub landlord: LandlordId,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub area_m2: f64,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub current_rent: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub additional_costs: Decimal,
    #[serde(default)]
    pub status: PropertyStatus,
}

impl Property {
    pub fn label(&self) -> String {
        format!("{}, {}", self.address, self.city)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Building {
    pub id: BuildingId,
    pub landlord: LandlordId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum UnitType {
    #[default]
    Apartment,
    Office,
    Commercial,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Unit {
    pub id: UnitId,
    pub building: BuildingId,
    pub number: String,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub area_m2: f64,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub status: PropertyStatus,
}

/// Lease linking a tenant to a property and/or unit, with the agreed monthly charges
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RentalAgreement {
    pub id: AgreementId,
    pub tenant: TenantId,
    #[serde(default)]
    pub property: Option<PropertyId>,
    #[serde(default)]
    pub unit: Option<UnitId>,
    /// Open-ended when missing
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[schemars(with = "f64")]
    pub base_rent: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub coop_fee: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub electricity: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub gas: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub other_fees: Decimal,
}

impl RentalAgreement {
    /// Active at some point between `first` and `last` (inclusive)
    pub fn is_active_between(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| start <= last)
            && self.end_date.is_none_or(|end| end >= first)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

/// One monthly charge for a rental agreement
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Payment {
    /// Assigned when the payment is first stored
    #[serde(default)]
    pub id: Option<PaymentId>,
    /// Kept when the agreement is deleted
    #[serde(default)]
    pub rental_agreement: Option<AgreementId>,
    #[serde(default)]
    pub date_due: Option<NaiveDate>,
    #[serde(default)]
    pub date_paid: Option<NaiveDate>,
    /// Taxable base
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub base_rent: Option<Decimal>,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub coop_fee: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub electricity: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub water: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub gas: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub other_fees: Decimal,
    /// Effective tax rate as a fraction (0.085 for 8.5%)
    #[serde(default)]
    #[schemars(with = "f64")]
    pub tax_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub tax_amount: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub invoice_url: Option<String>,
}

impl Payment {
    pub fn base_rent_or_zero(&self) -> Decimal {
        self.base_rent.unwrap_or(Decimal::ZERO)
    }

    /// Charges before tax. Water is passed through separately and not included.
    pub fn subtotal(&self) -> Decimal {
        self.base_rent_or_zero() + self.coop_fee + self.electricity + self.gas + self.other_fees
    }

    pub fn tax_rate_percent(&self) -> Decimal {
        self.tax_rate * Decimal::ONE_HUNDRED
    }

    /// e.g. "8.50%"
    pub fn tax_rate_with_sign(&self) -> String {
        format!("{}%", self.tax_rate_display())
    }

    /// e.g. "8.50"
    pub fn tax_rate_display(&self) -> String {
        format!("{:.2}", self.tax_rate_percent())
    }

    pub fn is_due_in(&self, year: i32, month: u32) -> bool {
        self.date_due
            .is_some_and(|d| d.year() == year && d.month() == month)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Reminder {
    pub id: ReminderId,
    pub unit: UnitId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schemars(with = "String")]
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TenantInvitation {
    pub id: InvitationId,
    pub email: String,
    pub property: PropertyId,
    pub landlord: LandlordId,
    #[schemars(with = "String")]
    pub created_at: DateTime<Utc>,
    #[schemars(with = "String")]
    pub expires_at: DateTime<Utc>,
    pub token: String,
    #[serde(default)]
    pub status: InvitationStatus,
}

impl TenantInvitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

/// Read a ledger from JSON
pub fn read_ledger_json<R: Read>(reader: R) -> anyhow::Result<Ledger> {
    let ledger: Ledger = serde_json::from_reader(reader)?;
    log::debug!(
        "Read ledger: {} landlords, {} agreements, {} payments",
        ledger.landlords.len(),
        ledger.agreements.len(),
        ledger.payments.len()
    );
    Ok(ledger)
}

impl Ledger {
    pub fn write_json<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn landlord(&self, id: LandlordId) -> Option<&Landlord> {
        self.landlords.iter().find(|l| l.id == id)
    }

    pub fn tenant(&self, id: TenantId) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.id == id)
    }

    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn agreement(&self, id: AgreementId) -> Option<&RentalAgreement> {
        self.agreements.iter().find(|a| a.id == id)
    }

    pub fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == Some(id))
    }

    /// Landlord owning the building the unit sits in
    pub fn unit_landlord(&self, unit: UnitId) -> Option<LandlordId> {
        let unit = self.unit(unit)?;
        self.building(unit.building).map(|b| b.landlord)
    }

    /// True when the agreement belongs to the landlord through its property
    /// or through its unit's building. Either path is enough.
    pub fn agreement_owned_by(&self, agreement: &RentalAgreement, landlord: LandlordId) -> bool {
        let via_property = agreement
            .property
            .and_then(|p| self.property(p))
            .is_some_and(|p| p.landlord == landlord);
        let via_unit = agreement
            .unit
            .and_then(|u| self.unit_landlord(u))
            .is_some_and(|l| l == landlord);
        via_property || via_unit
    }

    pub fn payment_owned_by(&self, payment: &Payment, landlord: LandlordId) -> bool {
        payment
            .rental_agreement
            .and_then(|a| self.agreement(a))
            .is_some_and(|a| self.agreement_owned_by(a, landlord))
    }

    pub fn payment_tenant(&self, payment: &Payment) -> Option<&Tenant> {
        let agreement = self.agreement(payment.rental_agreement?)?;
        self.tenant(agreement.tenant)
    }

    pub fn next_payment_id(&self) -> PaymentId {
        self.payments.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1
    }

    pub fn next_tenant_id(&self) -> TenantId {
        self.tenants.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn next_reminder_id(&self) -> ReminderId {
        self.reminders.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    pub fn next_invitation_id(&self) -> InvitationId {
        self.invitations.iter().map(|i| i.id).max().unwrap_or(0) + 1
    }

    /// Collect integrity problems: duplicate ids and references to records that don't exist.
    pub fn validate(&self) -> Vec<LedgerError> {
        let mut issues = Vec::new();

        check_unique(&mut issues, "landlord", self.landlords.iter().map(|l| l.id));
        check_unique(&mut issues, "tenant", self.tenants.iter().map(|t| t.id));
        check_unique(&mut issues, "property", self.properties.iter().map(|p| p.id));
        check_unique(&mut issues, "building", self.buildings.iter().map(|b| b.id));
        check_unique(&mut issues, "unit", self.units.iter().map(|u| u.id));
        check_unique(&mut issues, "agreement", self.agreements.iter().map(|a| a.id));
        check_unique(&mut issues, "payment", self.payments.iter().filter_map(|p| p.id));
        check_unique(&mut issues, "reminder", self.reminders.iter().map(|r| r.id));
        check_unique(&mut issues, "invitation", self.invitations.iter().map(|i| i.id));

        for property in &self.properties {
            if self.landlord(property.landlord).is_none() {
                issues.push(missing("property", property.id, "landlord", property.landlord));
            }
        }
        for building in &self.buildings {
            if self.landlord(building.landlord).is_none() {
                issues.push(missing("building", building.id, "landlord", building.landlord));
            }
        }
        for unit in &self.units {
            if self.building(unit.building).is_none() {
                issues.push(missing("unit", unit.id, "building", unit.building));
            }
        }
        for agreement in &self.agreements {
            if self.tenant(agreement.tenant).is_none() {
                issues.push(missing("agreement", agreement.id, "tenant", agreement.tenant));
            }
            if let Some(p) = agreement.property.filter(|p| self.property(*p).is_none()) {
                issues.push(missing("agreement", agreement.id, "property", p));
            }
            if let Some(u) = agreement.unit.filter(|u| self.unit(*u).is_none()) {
                issues.push(missing("agreement", agreement.id, "unit", u));
            }
            if agreement.property.is_none() && agreement.unit.is_none() {
                issues.push(LedgerError::UnplacedAgreement(agreement.id));
            }
            if let (Some(start), Some(end)) = (agreement.start_date, agreement.end_date) {
                if end < start {
                    issues.push(LedgerError::InvertedAgreement {
                        id: agreement.id,
                        start,
                        end,
                    });
                }
            }
        }
        for payment in &self.payments {
            let Some(id) = payment.id else {
                issues.push(LedgerError::UnidentifiedPayment(payment.date_due));
                continue;
            };
            if let Some(a) = payment
                .rental_agreement
                .filter(|a| self.agreement(*a).is_none())
            {
                issues.push(missing("payment", id, "agreement", a));
            }
        }
        for reminder in &self.reminders {
            if self.unit(reminder.unit).is_none() {
                issues.push(missing("reminder", reminder.id, "unit", reminder.unit));
            }
        }
        for invitation in &self.invitations {
            if self.property(invitation.property).is_none() {
                issues.push(missing("invitation", invitation.id, "property", invitation.property));
            }
            if self.landlord(invitation.landlord).is_none() {
                issues.push(missing("invitation", invitation.id, "landlord", invitation.landlord));
            }
        }

        issues
    }
}

fn check_unique(issues: &mut Vec<LedgerError>, kind: &'static str, ids: impl Iterator<Item = u32>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(LedgerError::DuplicateId { kind, id });
        }
    }
}

fn missing(kind: &'static str, id: u32, target: &'static str, target_id: u32) -> LedgerError {
    LedgerError::MissingReference {
        kind,
        id,
        target,
        target_id,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn landlord(id: LandlordId, country: Option<&str>) -> Landlord {
        Landlord {
            id,
            name: format!("Landlord {id}"),
            contact_info: String::new(),
            tax_residency_country: country.map(str::to_string),
        }
    }

    pub fn tenant(id: TenantId) -> Tenant {
        Tenant {
            id,
            name: format!("Tenant {id}"),
            email: Some(format!("tenant{id}@example.com")),
            contact_info: String::new(),
        }
    }

    pub fn property(id: PropertyId, landlord: LandlordId) -> Property {
        Property {
            id,
            landlord,
            address: format!("Street {id}"),
            city: "Warszawa".to_string(),
            postal_code: "00-001".to_string(),
            area_m2: 50.0,
            current_rent: Decimal::ZERO,
            additional_costs: Decimal::ZERO,
            status: PropertyStatus::Rented,
        }
    }

    pub fn agreement(id: AgreementId, tenant: TenantId, property: Option<PropertyId>, base_rent: Decimal) -> RentalAgreement {
        RentalAgreement {
            id,
            tenant,
            property,
            unit: None,
            start_date: None,
            end_date: None,
            base_rent,
            coop_fee: Decimal::ZERO,
            electricity: Decimal::ZERO,
            gas: Decimal::ZERO,
            other_fees: Decimal::ZERO,
        }
    }

    pub fn payment(id: Option<PaymentId>, agreement: AgreementId, due: NaiveDate, base_rent: Decimal) -> Payment {
        Payment {
            id,
            rental_agreement: Some(agreement),
            date_due: Some(due),
            base_rent: Some(base_rent),
            ..Payment::default()
        }
    }

    /// One PL landlord (1) with a property (1), a tenant (1) and an agreement (1).
    pub fn polish_ledger() -> Ledger {
        Ledger {
            landlords: vec![landlord(1, Some("PL"))],
            tenants: vec![tenant(1)],
            properties: vec![property(1, 1)],
            agreements: vec![agreement(1, 1, Some(1), Decimal::from(1000))],
            ..Ledger::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn residency_is_normalised() {
        assert_eq!(landlord(1, Some("pl")).residency().as_deref(), Some("PL"));
        assert_eq!(landlord(1, Some(" PL ")).residency(), None);
        assert_eq!(landlord(1, Some("POL")).residency(), None);
        assert_eq!(landlord(1, Some("")).residency(), None);
        assert_eq!(landlord(1, None).residency(), None);
    }

    #[test]
    fn subtotal_excludes_water() {
        let payment = Payment {
            base_rent: Some(dec!(2000)),
            coop_fee: dec!(300),
            electricity: dec!(100),
            water: dec!(80),
            gas: dec!(50),
            other_fees: dec!(20),
            ..Payment::default()
        };
        assert_eq!(payment.subtotal(), dec!(2470));
    }

    #[test]
    fn tax_rate_formatting() {
        let payment = Payment {
            tax_rate: dec!(0.085),
            ..Payment::default()
        };
        assert_eq!(payment.tax_rate_percent(), dec!(8.5));
        assert_eq!(payment.tax_rate_display(), "8.50");
        assert_eq!(payment.tax_rate_with_sign(), "8.50%");
    }

    #[test]
    fn agreement_activity_window() {
        let mut a = agreement(1, 1, Some(1), dec!(1000));
        assert!(a.is_active_between(date(2024, 3, 1), date(2024, 3, 31)));

        a.start_date = Some(date(2024, 4, 1));
        assert!(!a.is_active_between(date(2024, 3, 1), date(2024, 3, 31)));

        a.start_date = Some(date(2024, 1, 1));
        a.end_date = Some(date(2024, 2, 29));
        assert!(!a.is_active_between(date(2024, 3, 1), date(2024, 3, 31)));

        a.end_date = Some(date(2024, 3, 1));
        assert!(a.is_active_between(date(2024, 3, 1), date(2024, 3, 31)));
    }

    #[test]
    fn ownership_matches_either_path() {
        let mut ledger = polish_ledger();
        ledger.landlords.push(landlord(2, Some("PL")));
        ledger.buildings.push(Building {
            id: 1,
            landlord: 2,
            name: "Block A".to_string(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
        });
        ledger.units.push(Unit {
            id: 1,
            building: 1,
            number: "1A".to_string(),
            floor: Some(1),
            area_m2: 40.0,
            unit_type: UnitType::Apartment,
            status: PropertyStatus::Rented,
        });
        ledger.agreements[0].unit = Some(1);

        let agreement = ledger.agreement(1).unwrap();
        assert!(ledger.agreement_owned_by(agreement, 1));
        assert!(ledger.agreement_owned_by(agreement, 2));
        assert!(!ledger.agreement_owned_by(agreement, 3));
    }

    #[test]
    fn validate_reports_integrity_issues() {
        let mut ledger = polish_ledger();
        ledger.tenants.push(tenant(1));
        ledger.agreements.push(agreement(2, 9, None, dec!(500)));
        ledger.payments.push(payment(None, 1, date(2024, 1, 5), dec!(1000)));
        ledger.payments.push(payment(Some(1), 7, date(2024, 1, 5), dec!(1000)));

        let issues = ledger.validate();
        assert!(issues.contains(&LedgerError::DuplicateId { kind: "tenant", id: 1 }));
        assert!(issues.contains(&missing("agreement", 2, "tenant", 9)));
        assert!(issues.contains(&LedgerError::UnplacedAgreement(2)));
        assert!(issues.contains(&LedgerError::UnidentifiedPayment(Some(date(2024, 1, 5)))));
        assert!(issues.contains(&missing("payment", 1, "agreement", 7)));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn next_ids_follow_the_highest_existing() {
        let mut ledger = polish_ledger();
        assert_eq!(ledger.next_payment_id(), 1);
        ledger.payments.push(payment(Some(7), 1, date(2024, 1, 5), dec!(1)));
        ledger.payments.push(payment(Some(3), 1, date(2024, 2, 5), dec!(1)));
        assert_eq!(ledger.next_payment_id(), 8);
        assert_eq!(ledger.next_tenant_id(), 2);
    }

    #[test]
    fn reads_amounts_from_numbers_and_strings() {
        let json = r#"{
            "landlords": [{"id": 1, "name": "Anna", "tax_residency_country": "PL"}],
            "payments": [{"id": 1, "rental_agreement": null, "date_due": "2024-01-05", "base_rent": "1500.50", "coop_fee": 200}]
        }"#;
        let ledger = read_ledger_json(json.as_bytes()).unwrap();
        assert_eq!(ledger.payments[0].base_rent, Some(dec!(1500.50)));
        assert_eq!(ledger.payments[0].coop_fee, dec!(200));
        assert_eq!(ledger.payments[0].status, PaymentStatus::Pending);
        assert!(ledger.tenants.is_empty());
    }
}
