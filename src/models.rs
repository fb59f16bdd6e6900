// 🧾 Record Types - strict schema for the three input tables
// Rows reach these types only after passing the loader's validation.

use crate::period::Period;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Months per year, used to annualize MRR.
pub const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Largest accepted MRR or payment magnitude (one trillion). Rows above it are
/// rejected at load so annualizing and summing cannot overflow `Decimal`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

// ============================================================================
// SEGMENT
// ============================================================================

/// Customer segment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Enterprise,
    #[serde(rename = "Mid-Market")]
    MidMarket,
    #[serde(rename = "SMB")]
    Smb,
    Unknown,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Enterprise,
        Segment::MidMarket,
        Segment::Smb,
        Segment::Unknown,
    ];

    /// Human-readable label, also the JSON key
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Enterprise => "Enterprise",
            Segment::MidMarket => "Mid-Market",
            Segment::Smb => "SMB",
            Segment::Unknown => "Unknown",
        }
    }

    /// Lenient classification: case, spaces and hyphens are ignored.
    /// Returns `None` for labels that name no known segment.
    pub fn classify(raw: &str) -> Option<Segment> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "enterprise" => Some(Segment::Enterprise),
            "midmarket" | "mid" | "mm" => Some(Segment::MidMarket),
            "smb" | "smallbusiness" => Some(Segment::Smb),
            "" | "unknown" => Some(Segment::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// CUSTOMER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub company_name: Option<String>,
    pub segment: Segment,
    pub signup_date: NaiveDate,
    pub churn_date: Option<NaiveDate>,
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Upgraded,
    Downgraded,
}

impl SubscriptionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" | "canceled" | "churned" => Some(SubscriptionStatus::Cancelled),
            "upgraded" => Some(SubscriptionStatus::Upgraded),
            "downgraded" => Some(SubscriptionStatus::Downgraded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Source id, or `line:<n>` when the file carries none
    pub id: String,
    pub customer_id: String,
    pub mrr: Decimal,
    pub start_date: NaiveDate,
    /// First day the subscription no longer bills
    pub end_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    /// Active on `date`: started on or before it and not yet ended.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| end > date)
    }

    pub fn annual_amount(&self) -> Decimal {
        self.mrr * MONTHS_PER_YEAR
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub recognized_period: Period,
}

// ============================================================================
// TESTS
// ============================================================================
