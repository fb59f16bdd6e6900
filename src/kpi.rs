// 🎯 Headline KPIs derived from a snapshot series

use crate::rollforward::MonthlyArrSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrKpis {
    pub current_arr: Decimal,
    /// Customers with positive ARR at the latest month end; a $0 plan does
    /// not count as active
    pub active_customers: usize,
    /// `None` when there are no active customers
    pub arr_per_customer: Option<Decimal>,
    /// Fraction, e.g. `0.5` for +50%; `None` when the previous ending ARR is zero
    pub monthly_growth_rate: Option<Decimal>,
    pub arr_change: Decimal,
    pub customer_change: i64,
}

impl ArrKpis {
    pub fn summary(&self) -> String {
        let per_customer = self
            .arr_per_customer
            .map(|v| format!("${:.2}", v))
            .unwrap_or_else(|| "n/a".to_string());
        let growth = self
            .monthly_growth_rate
            .map(|g| format!("{:.2}%", g * Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "ARR ${:.2} ({} customers, {} per customer), growth {}",
            self.current_arr, self.active_customers, per_customer, growth
        )
    }
}

/// Month-over-month growth as a fraction, `None` when `previous` is zero.
pub fn growth_rate(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous).round_dp(6))
}

/// Derive the dashboard KPIs from the latest snapshot.
///
/// The previous month's ending ARR is the latest snapshot's starting ARR,
/// which also covers a single-month series.
pub fn compute_kpis(snapshots: &[MonthlyArrSnapshot]) -> ArrKpis {
    let Some(latest) = snapshots.last() else {
        return ArrKpis {
            current_arr: Decimal::ZERO,
            active_customers: 0,
            arr_per_customer: None,
            monthly_growth_rate: None,
            arr_change: Decimal::ZERO,
            customer_change: 0,
        };
    };

    let arr_per_customer = (latest.active_customers > 0)
        .then(|| (latest.ending / Decimal::from(latest.active_customers)).round_dp(2));

    ArrKpis {
        current_arr: latest.ending,
        active_customers: latest.active_customers,
        arr_per_customer,
        monthly_growth_rate: growth_rate(latest.starting, latest.ending),
        arr_change: latest.ending - latest.starting,
        customer_change: latest.active_customers as i64 - latest.starting_customers as i64,
    }
}
