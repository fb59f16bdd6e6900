// 🧩 Segment Breakdown - ending ARR grouped by customer segment

use crate::error::Result;
use crate::models::{Customer, Segment, Subscription};
use crate::period::Period;
use crate::rollforward::RollforwardEngine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentTotals {
    pub arr: Decimal,
    pub customer_count: usize,
    /// Fraction of total ARR; `None` when total ARR is zero
    pub share: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
    pub period: Period,
    pub total_arr: Decimal,
    /// Always holds every segment, Unknown included
    pub segments: BTreeMap<Segment, SegmentTotals>,
}

impl SegmentBreakdown {
    pub fn get(&self, segment: Segment) -> Option<&SegmentTotals> {
        self.segments.get(&segment)
    }

    pub fn customer_count(&self) -> usize {
        self.segments.values().map(|t| t.customer_count).sum()
    }
}

impl<'a> RollforwardEngine<'a> {
    /// Group each customer's ARR at the end of `period` by segment.
    pub fn segment_breakdown(&self, period: Period) -> SegmentBreakdown {
        let mut segments: BTreeMap<Segment, SegmentTotals> = Segment::ALL
            .iter()
            .map(|s| (*s, SegmentTotals::default()))
            .collect();

        for (customer, arr) in self.customer_arr_at(period) {
            if arr <= Decimal::ZERO {
                continue;
            }
            let totals = segments.entry(customer.segment).or_default();
            totals.arr += arr;
            totals.customer_count += 1;
        }

        let total_arr: Decimal = segments.values().map(|t| t.arr).sum();
        if !total_arr.is_zero() {
            for totals in segments.values_mut() {
                totals.share = Some((totals.arr / total_arr).round_dp(4));
            }
        }

        SegmentBreakdown {
            period,
            total_arr,
            segments,
        }
    }
}

/// Ending ARR and active customer count per segment for one period.
pub fn compute_segment_breakdown(
    customers: &[Customer],
    subscriptions: &[Subscription],
    period: Period,
) -> Result<SegmentBreakdown> {
    let engine = RollforwardEngine::new(customers, subscriptions)?;
    Ok(engine.segment_breakdown(period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodRange;
    use crate::rollforward::compute_monthly_snapshots;
    use crate::rollforward::tests::{customer, subscription};
    use rust_decimal_macros::dec;

    fn portfolio() -> (Vec<Customer>, Vec<Subscription>) {
        let customers = vec![
            customer("e1", Segment::Enterprise),
            customer("e2", Segment::Enterprise),
            customer("m1", Segment::MidMarket),
            customer("s1", Segment::Smb),
            customer("u1", Segment::Unknown),
            customer("gone", Segment::Smb),
        ];
        let subscriptions = vec![
            subscription("a", "e1", dec!(5000), "2024-01-01", None),
            subscription("b", "e2", dec!(2500), "2024-01-01", None),
            subscription("c", "m1", dec!(1000), "2024-01-01", None),
            subscription("d", "s1", dec!(250), "2024-01-01", None),
            subscription("e", "u1", dec!(250), "2024-01-01", None),
            subscription("f", "gone", dec!(100), "2024-01-01", Some("2024-02-01")),
        ];
        (customers, subscriptions)
    }

    #[test]
    fn test_breakdown_groups_by_segment() {
        let (customers, subscriptions) = portfolio();
        let period: Period = "2024-02".parse().unwrap();

        let breakdown = compute_segment_breakdown(&customers, &subscriptions, period).unwrap();

        let enterprise = breakdown.get(Segment::Enterprise).unwrap();
        assert_eq!(enterprise.arr, dec!(90000));
        assert_eq!(enterprise.customer_count, 2);
        assert_eq!(enterprise.share, Some(dec!(0.8333)));

        let smb = breakdown.get(Segment::Smb).unwrap();
        assert_eq!(smb.arr, dec!(3000));
        assert_eq!(smb.customer_count, 1);

        let unknown = breakdown.get(Segment::Unknown).unwrap();
        assert_eq!(unknown.arr, dec!(3000));
        assert_eq!(unknown.customer_count, 1);

        assert_eq!(breakdown.total_arr, dec!(108000));
        assert_eq!(breakdown.customer_count(), 5);
    }

    #[test]
    fn test_breakdown_total_matches_ending_arr() {
        let (customers, subscriptions) = portfolio();
        let range = PeriodRange::parse("2024-01", "2024-03").unwrap();

        let snapshots = compute_monthly_snapshots(&customers, &subscriptions, &range).unwrap();
        for snapshot in &snapshots {
            let breakdown =
                compute_segment_breakdown(&customers, &subscriptions, snapshot.period).unwrap();
            assert_eq!(breakdown.total_arr, snapshot.ending);
            assert_eq!(breakdown.customer_count(), snapshot.active_customers);
        }
    }

    #[test]
    fn test_empty_breakdown_has_every_segment() {
        let period: Period = "2024-01".parse().unwrap();
        let breakdown = compute_segment_breakdown(&[], &[], period).unwrap();

        assert_eq!(breakdown.segments.len(), 4);
        assert_eq!(breakdown.total_arr, dec!(0));
        assert!(breakdown.segments.values().all(|t| t.share.is_none()));

        let json = serde_json::to_value(&breakdown).unwrap();
        assert!(json["segments"].get("Mid-Market").is_some());
        assert!(json["segments"].get("Unknown").is_some());
    }
}
