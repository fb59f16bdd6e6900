// ⚖️ Reconciliation Engine - Validate the rollforward bridge
//
// Following the formula:
//   starting + new + expansion - contraction - churned = ending
// and each month opens where the previous one closed.
//
// A snapshot series that fails either check cannot be shown on the
// waterfall: the bars would not add up.

use crate::rollforward::MonthlyArrSnapshot;
use crate::segments::SegmentBreakdown;
use crate::period::Period;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// DISCREPANCIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyCategory {
    /// Buckets do not add up to the ending ARR
    IdentityMismatch,
    /// Starting ARR differs from the previous month's ending ARR
    ContinuityBreak,
    /// Segment totals differ from the ending ARR
    SegmentMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub period: Period,
    pub expected: Decimal,
    pub actual: Decimal,
    pub category: DiscrepancyCategory,
}

impl Discrepancy {
    pub fn difference(&self) -> Decimal {
        (self.actual - self.expected).abs()
    }

    pub fn description(&self) -> String {
        let what = match self.category {
            DiscrepancyCategory::IdentityMismatch => "bridge does not add up",
            DiscrepancyCategory::ContinuityBreak => "starting ARR differs from prior ending",
            DiscrepancyCategory::SegmentMismatch => "segment total differs from ending ARR",
        };
        format!(
            "{}: {} (expected ${:.2}, got ${:.2})",
            self.period, what, self.expected, self.actual
        )
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub months_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_balanced() {
            format!("Rollforward balanced across {} months", self.months_checked)
        } else {
            format!(
                "Rollforward has {} discrepancies across {} months",
                self.discrepancies.len(),
                self.months_checked
            )
        }
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Check the bridge identity for every month and continuity between months.
    pub fn reconcile(&self, snapshots: &[MonthlyArrSnapshot]) -> ReconciliationReport {
        let mut discrepancies = Vec::new();

        for (i, snapshot) in snapshots.iter().enumerate() {
            let calculated = snapshot.starting + snapshot.net_change();
            if calculated != snapshot.ending {
                discrepancies.push(Discrepancy {
                    period: snapshot.period,
                    expected: calculated,
                    actual: snapshot.ending,
                    category: DiscrepancyCategory::IdentityMismatch,
                });
            }

            if let Some(previous) = i.checked_sub(1).map(|j| &snapshots[j]) {
                if previous.ending != snapshot.starting {
                    discrepancies.push(Discrepancy {
                        period: snapshot.period,
                        expected: previous.ending,
                        actual: snapshot.starting,
                        category: DiscrepancyCategory::ContinuityBreak,
                    });
                }
            }
        }

        ReconciliationReport {
            months_checked: snapshots.len(),
            discrepancies,
        }
    }

    /// Check that a segment breakdown accounts for all of a month's ending ARR.
    pub fn reconcile_segments(
        &self,
        breakdown: &SegmentBreakdown,
        snapshot: &MonthlyArrSnapshot,
    ) -> Option<Discrepancy> {
        let segment_sum: Decimal = breakdown.segments.values().map(|t| t.arr).sum();
        (segment_sum != snapshot.ending).then(|| Discrepancy {
            period: snapshot.period,
            expected: snapshot.ending,
            actual: segment_sum,
            category: DiscrepancyCategory::SegmentMismatch,
        })
    }
}

impl Default for ReconciliationEngine {
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
    use crate::period::PeriodRange;
    use crate::rollforward::compute_monthly_snapshots;
    use crate::rollforward::tests::lifecycle;
    use crate::segments::compute_segment_breakdown;
    use rust_decimal_macros::dec;

    fn computed() -> Vec<MonthlyArrSnapshot> {
        let (customers, subscriptions) = lifecycle();
        let range = PeriodRange::parse("2023-12", "2024-04").unwrap();
        compute_monthly_snapshots(&customers, &subscriptions, &range).unwrap()
    }

    #[test]
    fn test_computed_series_is_balanced() {
        let engine = ReconciliationEngine::new();
        let report = engine.reconcile(&computed());

        assert!(report.is_balanced(), "{}", report.summary());
        assert_eq!(report.months_checked, 5);
    }

    #[test]
    fn test_detects_identity_mismatch() {
        let mut snapshots = computed();
        snapshots[1].expansion += dec!(1);

        let report = ReconciliationEngine::new().reconcile(&snapshots);

        assert_eq!(report.discrepancies.len(), 1);
        let d = &report.discrepancies[0];
        assert_eq!(d.category, DiscrepancyCategory::IdentityMismatch);
        assert_eq!(d.difference(), dec!(1));
    }

    #[test]
    fn test_detects_continuity_break() {
        let mut snapshots = computed();
        snapshots[2].starting += dec!(50);
        snapshots[2].ending += dec!(50);

        let report = ReconciliationEngine::new().reconcile(&snapshots);

        assert!(!report.is_balanced());
        assert!(report
            .discrepancies
            .iter()
            .any(|d| d.category == DiscrepancyCategory::ContinuityBreak
                && d.period == snapshots[2].period));
        assert!(!report.discrepancies[0].description().is_empty());
    }

    #[test]
    fn test_segments_reconcile_with_ending_arr() {
        let (customers, subscriptions) = lifecycle();
        let engine = ReconciliationEngine::new();

        for snapshot in computed() {
            let breakdown =
                compute_segment_breakdown(&customers, &subscriptions, snapshot.period).unwrap();
            assert!(engine.reconcile_segments(&breakdown, &snapshot).is_none());
        }
    }

    #[test]
    fn test_segment_mismatch_reported() {
        let (customers, subscriptions) = lifecycle();
        let snapshots = computed();
        let feb = &snapshots[2];
        let mut breakdown = compute_segment_breakdown(&customers, &subscriptions, feb.period).unwrap();
        breakdown.segments.clear();

        let d = ReconciliationEngine::new()
            .reconcile_segments(&breakdown, feb)
            .unwrap();
        assert_eq!(d.category, DiscrepancyCategory::SegmentMismatch);
        assert_eq!(d.expected, dec!(18000));
    }
}
