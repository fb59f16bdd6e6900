// 📂 Data Loader - CSV → strict records
//
// Rows are read as raw strings first, then converted into the strict schema
// in models.rs. Rows that fail conversion are quarantined as warnings and
// never reach the calculator.

use crate::error::{ArrError, Result};
use crate::models::{
    Customer, Segment, Subscription, SubscriptionStatus, Transaction, MAX_AMOUNT,
};
use crate::period::{Period, PeriodRange};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Accepted file names per table, in lookup order
pub const CUSTOMER_FILES: [&str; 2] = ["customers.csv", "saas_customers.csv"];
pub const SUBSCRIPTION_FILES: [&str; 2] = ["subscriptions.csv", "saas_subscriptions.csv"];
pub const TRANSACTION_FILES: [&str; 2] = ["transactions.csv", "saas_transactions.csv"];

// ============================================================================
// RAW ROWS
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCustomer {
    #[serde(default)]
    customer_id: String,
    #[serde(default)]
    company_name: String,
    #[serde(default, alias = "customer_segment")]
    segment: String,
    #[serde(default)]
    signup_date: String,
    #[serde(default)]
    churn_date: String,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    #[serde(default)]
    subscription_id: String,
    #[serde(default)]
    customer_id: String,
    #[serde(default, alias = "mrr")]
    mrr_amount: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(default)]
    transaction_id: String,
    #[serde(default)]
    customer_id: String,
    #[serde(default, alias = "payment_date")]
    transaction_date: String,
    #[serde(default, alias = "payment_amount")]
    amount: String,
    #[serde(default, alias = "year_month")]
    recognized_period: String,
}

// ============================================================================
// LOAD WARNINGS
// ============================================================================

/// A row that was skipped or adjusted during loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadWarning {
    pub table: String,
    pub line: usize,
    pub message: String,
}

impl From<ArrError> for LoadWarning {
    fn from(err: ArrError) -> Self {
        match err {
            ArrError::MalformedRecord { table, line, reason } => LoadWarning {
                table: table.to_string(),
                line,
                message: reason,
            },
            other => LoadWarning {
                table: String::new(),
                line: 0,
                message: other.to_string(),
            },
        }
    }
}

// ============================================================================
// DATA SNAPSHOT
// ============================================================================

/// Immutable view of the three input tables.
///
/// Built once and shared read-only; every computation borrows from it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSnapshot {
    pub customers: Vec<Customer>,
    pub subscriptions: Vec<Subscription>,
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<LoadWarning>,
    /// SHA-256 over the raw input bytes
    pub fingerprint: String,
}

impl DataSnapshot {
    /// Load the three CSV files from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let customers_path = resolve_file(dir, &CUSTOMER_FILES)?;
        let subscriptions_path = resolve_file(dir, &SUBSCRIPTION_FILES)?;
        let transactions_path = resolve_file(dir, &TRANSACTION_FILES)?;

        let customers = std::fs::read(&customers_path)?;
        let subscriptions = std::fs::read(&subscriptions_path)?;
        let transactions = std::fs::read(&transactions_path)?;

        let snapshot = Self::from_csv(&customers, &subscriptions, &transactions)?;

        info!(
            dir = %dir.display(),
            customers = snapshot.customers.len(),
            subscriptions = snapshot.subscriptions.len(),
            transactions = snapshot.transactions.len(),
            warnings = snapshot.warnings.len(),
            "loaded data snapshot"
        );

        Ok(snapshot)
    }

    /// Parse the three tables from in-memory CSV bytes.
    pub fn from_csv(
        customers_csv: &[u8],
        subscriptions_csv: &[u8],
        transactions_csv: &[u8],
    ) -> Result<Self> {
        let mut warnings = Vec::new();

        let customers = parse_customers(customers_csv, &mut warnings)?;
        let subscriptions = parse_subscriptions(subscriptions_csv, &mut warnings)?;
        let transactions = parse_transactions(transactions_csv, &mut warnings)?;

        for w in &warnings {
            warn!(table = %w.table, line = w.line, "{}", w.message);
        }

        let mut hasher = Sha256::new();
        for table in [customers_csv, subscriptions_csv, transactions_csv] {
            hasher.update(table);
            hasher.update([0u8]);
        }
        let fingerprint = format!("{:x}", hasher.finalize());

        Ok(DataSnapshot {
            customers,
            subscriptions,
            transactions,
            warnings,
            fingerprint,
        })
    }

    /// Month span covered by subscription history: earliest start month to
    /// the latest month touched by any start or end date.
    pub fn default_range(&self) -> Option<PeriodRange> {
        let start = self
            .subscriptions
            .iter()
            .map(|s| Period::of(s.start_date))
            .min()?;
        let end = self
            .subscriptions
            .iter()
            .flat_map(|s| std::iter::once(s.start_date).chain(s.end_date))
            .map(Period::of)
            .max()?;
        PeriodRange::new(start, end).ok()
    }

    /// Resolve optional `YYYY-MM` bounds against the data span.
    ///
    /// A missing bound falls back to the data span (or to the other bound when
    /// there is no data). Returns `None` only when both are missing and there is
    /// no subscription history.
    pub fn resolve_range(&self, from: Option<&str>, to: Option<&str>) -> Result<Option<PeriodRange>> {
        let from = from.map(str::parse::<Period>).transpose()?;
        let to = to.map(str::parse::<Period>).transpose()?;
        let span = self.default_range();

        let start = from.or(span.map(|r| r.start())).or(to);
        let end = to.or(span.map(|r| r.end())).or(from);

        match (start, end) {
            (Some(start), Some(end)) => PeriodRange::new(start, end).map(Some),
            _ => Ok(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.subscriptions.is_empty() && self.transactions.is_empty()
    }
}

fn resolve_file(dir: &Path, candidates: &[&str]) -> Result<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| ArrError::MissingDataFile(dir.join(candidates[0])))
}

// ============================================================================
// TABLE PARSING
// ============================================================================

/// Read every row of a table as raw strings, paired with its file line.
///
/// A bad header aborts the load; a bad row is quarantined.
fn read_rows<R: Read, T: DeserializeOwned>(
    reader: R,
    table: &'static str,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<(usize, T)>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        // +2 because: 1-indexed + header row
        let fallback_line = idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warnings.push(LoadWarning {
                    table: table.to_string(),
                    line: fallback_line,
                    message: format!("unreadable row: {}", e),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        match record.deserialize::<T>(Some(&headers)) {
            Ok(row) => rows.push((line, row)),
            Err(e) => warnings.push(LoadWarning {
                table: table.to_string(),
                line,
                message: format!("unreadable row: {}", e),
            }),
        }
    }

    Ok(rows)
}

fn parse_customers(bytes: &[u8], warnings: &mut Vec<LoadWarning>) -> Result<Vec<Customer>> {
    let mut seen = HashSet::new();
    let mut customers = Vec::new();

    for (line, raw) in read_rows::<_, RawCustomer>(bytes, "customers", warnings)? {
        match customer_from_raw(raw, line, warnings) {
            Ok(customer) => {
                if seen.insert(customer.id.clone()) {
                    customers.push(customer);
                } else {
                    warnings.push(LoadWarning {
                        table: "customers".to_string(),
                        line,
                        message: format!("duplicate customer id '{}' ignored", customer.id),
                    });
                }
            }
            Err(e) => warnings.push(e.into()),
        }
    }

    Ok(customers)
}

fn parse_subscriptions(bytes: &[u8], warnings: &mut Vec<LoadWarning>) -> Result<Vec<Subscription>> {
    let rows = read_rows::<_, RawSubscription>(bytes, "subscriptions", warnings)?;
    let mut subscriptions = Vec::with_capacity(rows.len());

    for (line, raw) in rows {
        match subscription_from_raw(raw, line) {
            Ok(sub) => subscriptions.push(sub),
            Err(e) => warnings.push(e.into()),
        }
    }

    Ok(subscriptions)
}

fn parse_transactions(bytes: &[u8], warnings: &mut Vec<LoadWarning>) -> Result<Vec<Transaction>> {
    let rows = read_rows::<_, RawTransaction>(bytes, "transactions", warnings)?;
    let mut transactions = Vec::with_capacity(rows.len());

    for (line, raw) in rows {
        match transaction_from_raw(raw, line) {
            Ok(tx) => transactions.push(tx),
            Err(e) => warnings.push(e.into()),
        }
    }

    Ok(transactions)
}

// ============================================================================
// ROW CONVERSION
// ============================================================================

fn malformed(table: &'static str, line: usize, reason: String) -> ArrError {
    ArrError::MalformedRecord { table, line, reason }
}

fn customer_from_raw(
    raw: RawCustomer,
    line: usize,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Customer> {
    const TABLE: &str = "customers";

    if raw.customer_id.is_empty() {
        return Err(malformed(TABLE, line, "missing customer_id".to_string()));
    }

    let signup_date = parse_date(&raw.signup_date).ok_or_else(|| {
        malformed(TABLE, line, format!("bad signup_date '{}'", raw.signup_date))
    })?;
    let churn_date = parse_optional_date(&raw.churn_date)
        .map_err(|_| malformed(TABLE, line, format!("bad churn_date '{}'", raw.churn_date)))?;

    let segment = Segment::classify(&raw.segment).unwrap_or_else(|| {
        warnings.push(LoadWarning {
            table: TABLE.to_string(),
            line,
            message: format!("unrecognized segment '{}' treated as Unknown", raw.segment),
        });
        Segment::Unknown
    });

    Ok(Customer {
        id: raw.customer_id,
        company_name: (!raw.company_name.is_empty()).then_some(raw.company_name),
        segment,
        signup_date,
        churn_date,
    })
}

fn subscription_from_raw(raw: RawSubscription, line: usize) -> Result<Subscription> {
    const TABLE: &str = "subscriptions";

    if raw.customer_id.is_empty() {
        return Err(malformed(TABLE, line, "missing customer_id".to_string()));
    }

    let mrr = parse_amount(&raw.mrr_amount)
        .ok_or_else(|| malformed(TABLE, line, format!("bad mrr_amount '{}'", raw.mrr_amount)))?;
    if mrr.is_sign_negative() && !mrr.is_zero() {
        return Err(malformed(TABLE, line, format!("negative mrr_amount {}", mrr)));
    }
    if mrr > MAX_AMOUNT {
        return Err(malformed(TABLE, line, format!("mrr_amount {} exceeds {}", mrr, MAX_AMOUNT)));
    }

    let start_date = parse_date(&raw.start_date)
        .ok_or_else(|| malformed(TABLE, line, format!("bad start_date '{}'", raw.start_date)))?;
    let end_date = parse_optional_date(&raw.end_date)
        .map_err(|_| malformed(TABLE, line, format!("bad end_date '{}'", raw.end_date)))?;

    if let Some(end) = end_date {
        if end < start_date {
            return Err(malformed(
                TABLE,
                line,
                format!("end_date {} precedes start_date {}", end, start_date),
            ));
        }
    }

    let status = if raw.status.is_empty() {
        if end_date.is_some() {
            SubscriptionStatus::Cancelled
        } else {
            SubscriptionStatus::Active
        }
    } else {
        SubscriptionStatus::parse(&raw.status)
            .ok_or_else(|| malformed(TABLE, line, format!("unknown status '{}'", raw.status)))?
    };

    let id = if raw.subscription_id.is_empty() {
        format!("line:{}", line)
    } else {
        raw.subscription_id
    };

    Ok(Subscription {
        id,
        customer_id: raw.customer_id,
        mrr,
        start_date,
        end_date,
        status,
    })
}

fn transaction_from_raw(raw: RawTransaction, line: usize) -> Result<Transaction> {
    const TABLE: &str = "transactions";

    if raw.customer_id.is_empty() {
        return Err(malformed(TABLE, line, "missing customer_id".to_string()));
    }

    let payment_date = parse_date(&raw.transaction_date).ok_or_else(|| {
        malformed(TABLE, line, format!("bad transaction_date '{}'", raw.transaction_date))
    })?;
    let amount = parse_amount(&raw.amount)
        .ok_or_else(|| malformed(TABLE, line, format!("bad amount '{}'", raw.amount)))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(malformed(TABLE, line, format!("amount {} exceeds {}", amount, MAX_AMOUNT)));
    }

    let recognized_period = if raw.recognized_period.is_empty() {
        Period::of(payment_date)
    } else {
        raw.recognized_period.parse().map_err(|_| {
            malformed(
                TABLE,
                line,
                format!("bad recognized_period '{}'", raw.recognized_period),
            )
        })?
    };

    let id = if raw.transaction_id.is_empty() {
        format!("line:{}", line)
    } else {
        raw.transaction_id
    };

    Ok(Transaction {
        id,
        customer_id: raw.customer_id,
        payment_date,
        amount,
        recognized_period,
    })
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// Parse an ISO date, a pandas timestamp, or MM/DD/YYYY.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

/// Empty (or pandas `NaT`/`nan`) means absent; anything else must parse.
fn parse_optional_date(raw: &str) -> std::result::Result<Option<NaiveDate>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nat") || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    parse_date(trimmed).map(Some).ok_or(())
}

/// Parse a fixed-point amount, tolerating `$` and thousands separators.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    const CUSTOMERS: &str = "customer_id,company_name,segment,signup_date,churn_date
c1,Acme,Enterprise,2024-01-01,
c2,Globex,mid-market,01/15/2024,
c3,Initech,Strategic,2024-02-01,2024-06-01
";

    const SUBSCRIPTIONS: &str = "subscription_id,customer_id,mrr_amount,start_date,end_date,status
s1,c1,\"$1,000.00\",2024-01-01,2024-02-15,upgraded
s2,c1,1500,2024-02-15,,active
s3,c2,250.50,2024-01-15 00:00:00,NaT,
";

    const TRANSACTIONS: &str = "transaction_id,customer_id,transaction_date,amount,recognized_period
t1,c1,2024-01-05,1000,
t2,c1,2024-02-01,1000,2024-01
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_valid_tables() {
        let snapshot = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            SUBSCRIPTIONS.as_bytes(),
            TRANSACTIONS.as_bytes(),
        )
        .unwrap();

        assert_eq!(snapshot.customers.len(), 3);
        assert_eq!(snapshot.customers[1].segment, Segment::MidMarket);
        assert_eq!(snapshot.customers[1].signup_date, date(2024, 1, 15));
        assert_eq!(snapshot.customers[2].churn_date, Some(date(2024, 6, 1)));

        assert_eq!(snapshot.subscriptions.len(), 3);
        assert_eq!(snapshot.subscriptions[0].mrr, dec!(1000.00));
        assert_eq!(snapshot.subscriptions[2].start_date, date(2024, 1, 15));
        assert_eq!(snapshot.subscriptions[2].end_date, None);
        assert_eq!(snapshot.subscriptions[2].status, SubscriptionStatus::Active);

        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.transactions[0].recognized_period.to_string(), "2024-01");
        assert_eq!(snapshot.transactions[1].recognized_period.to_string(), "2024-01");
    }

    #[test]
    fn test_unrecognized_segment_becomes_unknown_with_warning() {
        let snapshot = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            SUBSCRIPTIONS.as_bytes(),
            TRANSACTIONS.as_bytes(),
        )
        .unwrap();

        assert_eq!(snapshot.customers[2].segment, Segment::Unknown);
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.warnings[0].table, "customers");
        assert_eq!(snapshot.warnings[0].line, 4);
    }

    #[test]
    fn test_malformed_rows_are_quarantined() {
        let subscriptions = "subscription_id,customer_id,mrr_amount,start_date,end_date,status
s1,c1,abc,2024-01-01,,active
s2,c1,100,not-a-date,,active
s3,c1,100,2024-03-01,2024-02-01,cancelled
s4,c1,-5,2024-01-01,,active
s5,c1,100,2024-01-01,,paused
s6,c1,100,2024-01-01,,active
";
        let snapshot = DataSnapshot::from_csv(
            b"customer_id,segment,signup_date\nc1,SMB,2024-01-01\n",
            subscriptions.as_bytes(),
            b"customer_id,transaction_date,amount\nc1,2024-01-01,oops\n",
        )
        .unwrap();

        assert_eq!(snapshot.subscriptions.len(), 1);
        assert_eq!(snapshot.subscriptions[0].id, "s6");
        assert!(snapshot.transactions.is_empty());

        let lines: Vec<(String, usize)> = snapshot
            .warnings
            .iter()
            .map(|w| (w.table.clone(), w.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("subscriptions".to_string(), 2),
                ("subscriptions".to_string(), 3),
                ("subscriptions".to_string(), 4),
                ("subscriptions".to_string(), 5),
                ("subscriptions".to_string(), 6),
                ("transactions".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_out_of_range_amounts_are_quarantined() {
        let snapshot = DataSnapshot::from_csv(
            b"customer_id,segment,signup_date\nc1,SMB,2024-01-01\n",
            b"customer_id,mrr_amount,start_date\n\
c1,10000000000000000000000000000,2024-01-01\n\
c1,1000000000000.01,2024-01-01\n\
c1,1000000000000,2024-01-01\n",
            b"customer_id,transaction_date,amount\n\
c1,2024-01-01,-10000000000000000000000000000\n\
c1,2024-01-01,99.50\n",
        )
        .unwrap();

        assert_eq!(snapshot.subscriptions.len(), 1);
        assert_eq!(snapshot.subscriptions[0].mrr, dec!(1000000000000));
        assert_eq!(snapshot.transactions.len(), 1);

        let lines: Vec<(&str, usize)> = snapshot
            .warnings
            .iter()
            .map(|w| (w.table.as_str(), w.line))
            .collect();
        assert_eq!(
            lines,
            vec![("subscriptions", 2), ("subscriptions", 3), ("transactions", 2)]
        );
        assert!(snapshot.warnings[0].message.contains("exceeds"));

        let range = PeriodRange::parse("2024-01", "2024-01").unwrap();
        let snapshots = crate::rollforward::compute_monthly_snapshots(
            &snapshot.customers,
            &snapshot.subscriptions,
            &range,
        )
        .unwrap();
        assert_eq!(snapshots[0].ending, dec!(12000000000000));
    }

    #[test]
    fn test_duplicate_customer_keeps_first() {
        let snapshot = DataSnapshot::from_csv(
            b"customer_id,segment,signup_date\nc1,SMB,2024-01-01\nc1,Enterprise,2024-01-01\n",
            b"customer_id,mrr_amount,start_date\n",
            b"customer_id,transaction_date,amount\n",
        )
        .unwrap();

        assert_eq!(snapshot.customers.len(), 1);
        assert_eq!(snapshot.customers[0].segment, Segment::Smb);
        assert!(snapshot.warnings[0].message.contains("duplicate"));
    }

    #[test]
    fn test_missing_ids_fall_back_to_line_numbers() {
        let snapshot = DataSnapshot::from_csv(
            b"customer_id,segment,signup_date\nc1,SMB,2024-01-01\n",
            b"customer_id,mrr_amount,start_date\nc1,10,2024-01-01\n",
            b"customer_id,transaction_date,amount\nc1,2024-01-01,10\n",
        )
        .unwrap();

        assert_eq!(snapshot.subscriptions[0].id, "line:2");
        assert_eq!(snapshot.transactions[0].id, "line:2");
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let a = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            SUBSCRIPTIONS.as_bytes(),
            TRANSACTIONS.as_bytes(),
        )
        .unwrap();
        let b = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            SUBSCRIPTIONS.as_bytes(),
            TRANSACTIONS.as_bytes(),
        )
        .unwrap();
        let c = DataSnapshot::from_csv(CUSTOMERS.as_bytes(), SUBSCRIPTIONS.as_bytes(), b"")
            .unwrap();

        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_default_range_spans_starts_and_ends() {
        let snapshot = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            b"customer_id,mrr_amount,start_date,end_date\nc1,10,2024-01-10,2024-03-01\nc2,10,2024-02-01,\n",
            b"",
        )
        .unwrap();

        let range = snapshot.default_range().unwrap();
        assert_eq!(range.start().to_string(), "2024-01");
        assert_eq!(range.end().to_string(), "2024-03");

        assert!(DataSnapshot::default().default_range().is_none());
    }

    #[test]
    fn test_resolve_range_fills_missing_bounds() {
        let snapshot = DataSnapshot::from_csv(
            CUSTOMERS.as_bytes(),
            SUBSCRIPTIONS.as_bytes(),
            TRANSACTIONS.as_bytes(),
        )
        .unwrap();

        let full = snapshot.resolve_range(None, None).unwrap().unwrap();
        assert_eq!(full.to_string(), "2024-01..2024-02");

        let explicit = snapshot.resolve_range(Some("2023-06"), Some("2024-06")).unwrap().unwrap();
        assert_eq!(explicit.len(), 13);

        let open_end = snapshot.resolve_range(Some("2024-02"), None).unwrap().unwrap();
        assert_eq!(open_end.to_string(), "2024-02..2024-02");

        assert!(matches!(
            snapshot.resolve_range(Some("2024-05"), Some("2024-01")),
            Err(ArrError::InvalidRange { .. })
        ));
        assert!(matches!(
            snapshot.resolve_range(Some("May"), None),
            Err(ArrError::InvalidPeriod(_))
        ));

        let empty = DataSnapshot::default();
        assert!(empty.resolve_range(None, None).unwrap().is_none());
        let single = empty.resolve_range(None, Some("2024-03")).unwrap().unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_load_dir_reads_files_and_reports_missing() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("customers.csv"), CUSTOMERS).unwrap();
        std::fs::write(tmp.path().join("saas_subscriptions.csv"), SUBSCRIPTIONS).unwrap();

        let err = DataSnapshot::load_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, ArrError::MissingDataFile(ref p) if p.ends_with("transactions.csv")));

        std::fs::write(tmp.path().join("transactions.csv"), TRANSACTIONS).unwrap();
        let snapshot = DataSnapshot::load_dir(tmp.path()).unwrap();
        assert_eq!(snapshot.customers.len(), 3);
        assert_eq!(snapshot.subscriptions.len(), 3);
        assert_eq!(snapshot.transactions.len(), 2);
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$1,234.50"), Some(dec!(1234.50)));
        assert_eq!(parse_amount("-45.99"), Some(dec!(-45.99)));
        assert_eq!(parse_amount("1e3"), Some(dec!(1000)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("twelve"), None);
    }
}
