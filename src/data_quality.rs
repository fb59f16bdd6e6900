// ✅ Data Quality Engine - sanity checks over inputs and computed metrics
//
// Dataset rules look for records that load fine but will distort ARR.
// Metric rules flag results that fall outside realistic SaaS ranges.

use crate::kpi::{compute_kpis, growth_rate, ArrKpis};
use crate::loader::DataSnapshot;
use crate::models::{Segment, SubscriptionStatus};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::rollforward::{compute_monthly_snapshots, MonthlyArrSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Metrics built on this data are wrong
    Warning,  // Metrics are questionable
    Info,     // Worth a look, no effect on totals
}

/// Outcome of one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule_name: String,
    pub passed: bool,
    pub issue_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub rule_name: String,
    /// Table and record the issue points at, e.g. `subscriptions/s-12`
    pub location: String,
    pub issue: String,
    pub recommendation: String,
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub validations: Vec<ValidationResult>,
    pub issues: Vec<QualityIssue>,
    pub passed_count: usize,
    pub failed_count: usize,
    /// Bridge check behind the `rollforward_reconciles` rule, when it ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationReport>,
}

impl QualityReport {
    fn record(&mut self, rule_name: &str, issues: Vec<QualityIssue>) {
        let passed = issues.is_empty();
        if passed {
            self.passed_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.validations.push(ValidationResult {
            rule_name: rule_name.to_string(),
            passed,
            issue_count: issues.len(),
        });
        self.issues.extend(issues);
    }

    pub fn merge(mut self, other: QualityReport) -> QualityReport {
        self.validations.extend(other.validations);
        self.issues.extend(other.issues);
        self.passed_count += other.passed_count;
        self.failed_count += other.failed_count;
        self.reconciliation = self.reconciliation.or(other.reconciliation);
        self
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rules passed, {} failed | {} critical, {} warnings, {} info",
            self.passed_count,
            self.failed_count,
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.count(Severity::Info)
        )
    }
}

fn issue(
    severity: Severity,
    rule_name: &str,
    location: String,
    issue: String,
    recommendation: &str,
) -> QualityIssue {
    QualityIssue {
        severity,
        rule_name: rule_name.to_string(),
        location,
        issue,
        recommendation: recommendation.to_string(),
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Realistic ARR per customer band
    min_arr_per_customer: Decimal,
    max_arr_per_customer: Decimal,

    /// Realistic average monthly growth band (fractions)
    min_average_growth: Decimal,
    max_average_growth: Decimal,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            min_arr_per_customer: Decimal::new(300, 0),
            max_arr_per_customer: Decimal::new(10_000, 0),
            min_average_growth: Decimal::new(-5, 2),
            max_average_growth: Decimal::new(30, 2),
        }
    }

    /// Run every dataset rule against a loaded snapshot.
    pub fn validate(&self, data: &DataSnapshot) -> QualityReport {
        let mut report = QualityReport::default();

        report.record("load_warnings", self.check_load_warnings(data));
        report.record("customer_references", self.check_references(data));
        report.record("zero_mrr", self.check_zero_mrr(data));
        report.record("cancelled_without_end", self.check_cancelled_without_end(data));
        report.record("activity_after_churn", self.check_activity_after_churn(data));
        report.record("overlapping_subscriptions", self.check_overlaps(data));
        report.record("unknown_segment", self.check_unknown_segments(data));
        report.record("negative_payments", self.check_negative_payments(data));

        report
    }

    /// Run the metric rules against a computed series.
    pub fn validate_metrics(&self, snapshots: &[MonthlyArrSnapshot]) -> QualityReport {
        let mut report = QualityReport::default();
        let kpis = compute_kpis(snapshots);

        let reconciliation = ReconciliationEngine::new().reconcile(snapshots);

        report.record("rollforward_reconciles", self.check_reconciliation(&reconciliation));
        report.record("arr_per_customer_range", self.check_arr_per_customer(&kpis));
        report.record("average_growth_range", self.check_average_growth(snapshots));

        report.reconciliation = Some(reconciliation);
        report
    }

    /// Dataset rules, plus the metric rules over the full data span when the
    /// rollforward computes. A broken customer reference stops the metric
    /// rules but already shows up as a critical dataset issue.
    pub fn validate_all(&self, data: &DataSnapshot) -> QualityReport {
        let report = self.validate(data);
        let Some(range) = data.default_range() else {
            return report.merge(self.validate_metrics(&[]));
        };
        match compute_monthly_snapshots(&data.customers, &data.subscriptions, &range) {
            Ok(snapshots) => report.merge(self.validate_metrics(&snapshots)),
            Err(e) => {
                warn!(error = %e, "metric rules skipped: rollforward failed");
                report
            }
        }
    }

    // ========================================================================
    // DATASET RULES
    // ========================================================================

    fn check_load_warnings(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        data.warnings
            .iter()
            .map(|w| {
                issue(
                    Severity::Warning,
                    "load_warnings",
                    format!("{}/line:{}", w.table, w.line),
                    w.message.clone(),
                    "Fix the source row and reload",
                )
            })
            .collect()
    }

    fn check_references(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        let known: HashSet<&str> = data.customers.iter().map(|c| c.id.as_str()).collect();
        let mut issues = Vec::new();

        for sub in &data.subscriptions {
            if !known.contains(sub.customer_id.as_str()) {
                issues.push(issue(
                    Severity::Critical,
                    "customer_references",
                    format!("subscriptions/{}", sub.id),
                    format!("References unknown customer {}", sub.customer_id),
                    "Add the customer row or remove the subscription",
                ));
            }
        }
        for tx in &data.transactions {
            if !known.contains(tx.customer_id.as_str()) {
                issues.push(issue(
                    Severity::Critical,
                    "customer_references",
                    format!("transactions/{}", tx.id),
                    format!("References unknown customer {}", tx.customer_id),
                    "Add the customer row or remove the transaction",
                ));
            }
        }

        issues
    }

    fn check_zero_mrr(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        data.subscriptions
            .iter()
            .filter(|s| s.mrr.is_zero())
            .map(|s| {
                issue(
                    Severity::Warning,
                    "zero_mrr",
                    format!("subscriptions/{}", s.id),
                    "MRR is zero".to_string(),
                    "Verify the subscription amount is correct",
                )
            })
            .collect()
    }

    fn check_cancelled_without_end(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        data.subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Cancelled && s.end_date.is_none())
            .map(|s| {
                issue(
                    Severity::Warning,
                    "cancelled_without_end",
                    format!("subscriptions/{}", s.id),
                    "Cancelled subscription has no end date and still counts toward ARR".to_string(),
                    "Set end_date to the first non-billing day",
                )
            })
            .collect()
    }

    fn check_activity_after_churn(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        let churn_dates: HashMap<&str, _> = data
            .customers
            .iter()
            .filter_map(|c| c.churn_date.map(|d| (c.id.as_str(), d)))
            .collect();

        data.subscriptions
            .iter()
            .filter_map(|s| {
                let churned_on = *churn_dates.get(s.customer_id.as_str())?;
                let bills_after = s.end_date.map_or(true, |end| end > churned_on);
                bills_after.then(|| {
                    issue(
                        Severity::Warning,
                        "activity_after_churn",
                        format!("subscriptions/{}", s.id),
                        format!(
                            "Still billing after customer {} churned on {}",
                            s.customer_id, churned_on
                        ),
                        "Align the subscription end_date with the customer's churn_date",
                    )
                })
            })
            .collect()
    }

    fn check_overlaps(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        let mut by_customer: BTreeMap<&str, Vec<_>> = BTreeMap::new();
        for sub in &data.subscriptions {
            by_customer.entry(sub.customer_id.as_str()).or_default().push(sub);
        }

        let mut issues = Vec::new();
        for (customer_id, mut subs) in by_customer {
            subs.sort_by_key(|s| s.start_date);
            for pair in subs.windows(2) {
                let overlaps = pair[0].end_date.map_or(true, |end| end > pair[1].start_date);
                if overlaps {
                    issues.push(issue(
                        Severity::Info,
                        "overlapping_subscriptions",
                        format!("subscriptions/{}", pair[1].id),
                        format!(
                            "Overlaps {} for customer {}; both count toward ARR",
                            pair[0].id, customer_id
                        ),
                        "Confirm the customer holds both plans at once",
                    ));
                }
            }
        }
        issues
    }

    fn check_unknown_segments(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        data.customers
            .iter()
            .filter(|c| c.segment == Segment::Unknown)
            .map(|c| {
                issue(
                    Severity::Info,
                    "unknown_segment",
                    format!("customers/{}", c.id),
                    "No segment classification".to_string(),
                    "Classify as Enterprise, Mid-Market or SMB",
                )
            })
            .collect()
    }

    fn check_negative_payments(&self, data: &DataSnapshot) -> Vec<QualityIssue> {
        data.transactions
            .iter()
            .filter(|t| t.amount < Decimal::ZERO)
            .map(|t| {
                issue(
                    Severity::Info,
                    "negative_payments",
                    format!("transactions/{}", t.id),
                    format!("Negative payment ${:.2} treated as a refund", t.amount),
                    "Confirm the refund is intentional",
                )
            })
            .collect()
    }

    // ========================================================================
    // METRIC RULES
    // ========================================================================

    fn check_reconciliation(&self, reconciliation: &ReconciliationReport) -> Vec<QualityIssue> {
        reconciliation
            .discrepancies
            .iter()
            .map(|d| {
                issue(
                    Severity::Critical,
                    "rollforward_reconciles",
                    format!("rollforward/{}", d.period),
                    d.description(),
                    "Recompute the rollforward from source data",
                )
            })
            .collect()
    }

    fn check_arr_per_customer(&self, kpis: &ArrKpis) -> Vec<QualityIssue> {
        let Some(per_customer) = kpis.arr_per_customer else {
            return Vec::new();
        };
        if per_customer >= self.min_arr_per_customer && per_customer <= self.max_arr_per_customer {
            return Vec::new();
        }
        vec![issue(
            Severity::Info,
            "arr_per_customer_range",
            "kpis/arr_per_customer".to_string(),
            format!(
                "ARR per customer ${:.2} outside ${}-${}",
                per_customer, self.min_arr_per_customer, self.max_arr_per_customer
            ),
            "Check for mis-scaled MRR amounts",
        )]
    }

    fn check_average_growth(&self, snapshots: &[MonthlyArrSnapshot]) -> Vec<QualityIssue> {
        let rates: Vec<Decimal> = snapshots
            .iter()
            .filter_map(|s| growth_rate(s.starting, s.ending))
            .collect();
        if rates.is_empty() {
            return Vec::new();
        }

        let average = rates.iter().sum::<Decimal>() / Decimal::from(rates.len());
        if average >= self.min_average_growth && average <= self.max_average_growth {
            return Vec::new();
        }
        vec![issue(
            Severity::Warning,
            "average_growth_range",
            "kpis/monthly_growth_rate".to_string(),
            format!(
                "Average monthly growth {:.1}% is outside {}%..{}%",
                average * Decimal::ONE_HUNDRED,
                self.min_average_growth * Decimal::ONE_HUNDRED,
                self.max_average_growth * Decimal::ONE_HUNDRED
            ),
            "Check for missing months or duplicated subscriptions",
        )]
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadWarning;
    use crate::period::PeriodRange;
    use crate::rollforward::tests::{customer, date, lifecycle, subscription};
    use rust_decimal_macros::dec;

    fn snapshot_of(
        customers: Vec<crate::models::Customer>,
        subscriptions: Vec<crate::models::Subscription>,
    ) -> DataSnapshot {
        DataSnapshot {
            customers,
            subscriptions,
            ..DataSnapshot::default()
        }
    }

    fn issues_for<'a>(report: &'a QualityReport, rule: &str) -> Vec<&'a QualityIssue> {
        report.issues.iter().filter(|i| i.rule_name == rule).collect()
    }

    #[test]
    fn test_clean_dataset_passes() {
        let customers = vec![customer("1", Segment::Smb)];
        let subscriptions = vec![subscription("s1", "1", dec!(1000), "2024-01-01", None)];

        let report = DataQualityEngine::new().validate(&snapshot_of(customers, subscriptions));

        println!("Report: {}", report.summary());
        assert!(report.issues.is_empty());
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.passed_count, report.validations.len());
    }

    #[test]
    fn test_orphan_subscription_is_critical() {
        let subscriptions = vec![subscription("s1", "ghost", dec!(10), "2024-01-01", None)];

        let report = DataQualityEngine::new().validate(&snapshot_of(vec![], subscriptions));

        assert!(report.has_critical_issues());
        assert_eq!(issues_for(&report, "customer_references")[0].location, "subscriptions/s1");
    }

    #[test]
    fn test_cancelled_without_end_and_zero_mrr() {
        let customers = vec![customer("1", Segment::Smb)];
        let mut cancelled = subscription("s1", "1", dec!(0), "2024-01-01", None);
        cancelled.status = SubscriptionStatus::Cancelled;

        let report = DataQualityEngine::new().validate(&snapshot_of(customers, vec![cancelled]));

        assert_eq!(issues_for(&report, "zero_mrr").len(), 1);
        assert_eq!(issues_for(&report, "cancelled_without_end").len(), 1);
        assert_eq!(report.count(Severity::Warning), 2);
    }

    #[test]
    fn test_activity_after_churn_and_overlap() {
        let mut churned = customer("1", Segment::Unknown);
        churned.churn_date = Some(date("2024-02-01"));
        let subscriptions = vec![
            subscription("s1", "1", dec!(100), "2024-01-01", Some("2024-03-01")),
            subscription("s2", "1", dec!(50), "2024-02-15", None),
        ];

        let report = DataQualityEngine::new().validate(&snapshot_of(vec![churned], subscriptions));

        assert_eq!(issues_for(&report, "activity_after_churn").len(), 2);
        assert_eq!(issues_for(&report, "overlapping_subscriptions").len(), 1);
        assert_eq!(issues_for(&report, "unknown_segment").len(), 1);
    }

    #[test]
    fn test_load_warnings_surface_as_issues() {
        let data = DataSnapshot {
            warnings: vec![LoadWarning {
                table: "transactions".to_string(),
                line: 7,
                message: "bad amount 'x'".to_string(),
            }],
            ..DataSnapshot::default()
        };

        let report = DataQualityEngine::new().validate(&data);

        let issues = issues_for(&report, "load_warnings");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "transactions/line:7");
    }

    #[test]
    fn test_metric_rules_flag_unrealistic_growth() {
        let (customers, subscriptions) = lifecycle();
        let range = PeriodRange::parse("2024-01", "2024-02").unwrap();
        let snapshots = compute_monthly_snapshots(&customers, &subscriptions, &range).unwrap();

        let report = DataQualityEngine::new().validate_metrics(&snapshots);

        // Single month with a growth rate: +50%
        assert_eq!(issues_for(&report, "average_growth_range").len(), 1);
        assert!(issues_for(&report, "rollforward_reconciles").is_empty());
        assert_eq!(issues_for(&report, "arr_per_customer_range").len(), 1);
    }

    #[test]
    fn test_metric_rules_on_empty_series() {
        let report = DataQualityEngine::new().validate_metrics(&[]);
        assert!(report.issues.is_empty());

        let merged = DataQualityEngine::new()
            .validate(&DataSnapshot::default())
            .merge(report);
        assert_eq!(merged.failed_count, 0);
        assert_eq!(merged.validations.len(), 11);
    }

    #[test]
    fn test_validate_all_runs_metric_rules_over_data_span() {
        let (customers, subscriptions) = lifecycle();
        let report = DataQualityEngine::new().validate_all(&snapshot_of(customers, subscriptions));
        assert_eq!(report.validations.len(), 11);
        let reconciliation = report.reconciliation.as_ref().unwrap();
        assert!(reconciliation.is_balanced());
        assert_eq!(reconciliation.months_checked, 3);

        let orphan = vec![subscription("s1", "ghost", dec!(10), "2024-01-01", None)];
        let report = DataQualityEngine::new().validate_all(&snapshot_of(vec![], orphan));
        assert_eq!(report.validations.len(), 8);
        assert!(report.has_critical_issues());
        assert!(report.reconciliation.is_none());
    }
}
