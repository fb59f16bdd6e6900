// 📈 ARR Rollforward - how ARR moved month over month
//
// Following the bridge formula:
//   starting + new + expansion - contraction - churned = ending
//
// ARR for a period is measured on its last day. Each customer's movement is
// classified by comparing its ARR at the prior month end with the current
// month end; a day without any active subscription inside the month splits the
// movement into churn followed by new.

use crate::error::{ArrError, Result};
use crate::models::{Customer, Subscription};
use crate::period::{Period, PeriodRange};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// MONTHLY SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyArrSnapshot {
    pub period: Period,
    pub starting: Decimal,
    pub new: Decimal,
    pub expansion: Decimal,
    /// Positive magnitude
    pub contraction: Decimal,
    /// Positive magnitude
    pub churned: Decimal,
    pub ending: Decimal,
    /// Customers with positive ARR at the prior month end
    pub starting_customers: usize,
    /// Customers with positive ARR at this month end. A customer whose only
    /// active subscriptions bill $0 is not counted, matching the churn rule.
    pub active_customers: usize,
}

impl MonthlyArrSnapshot {
    fn opening(period: Period, starting: Decimal, starting_customers: usize) -> Self {
        MonthlyArrSnapshot {
            period,
            starting,
            new: Decimal::ZERO,
            expansion: Decimal::ZERO,
            contraction: Decimal::ZERO,
            churned: Decimal::ZERO,
            ending: starting,
            starting_customers,
            active_customers: 0,
        }
    }

    pub fn net_change(&self) -> Decimal {
        self.new + self.expansion - self.contraction - self.churned
    }

    /// True when `ending == starting + new + expansion - contraction - churned`.
    pub fn is_balanced(&self) -> bool {
        self.starting + self.net_change() == self.ending
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: start ${:.2} + new ${:.2} + expansion ${:.2} - contraction ${:.2} - churn ${:.2} = end ${:.2}",
            self.period,
            self.starting,
            self.new,
            self.expansion,
            self.contraction,
            self.churned,
            self.ending
        )
    }
}

// ============================================================================
// MOVEMENT CLASSIFICATION
// ============================================================================

/// One customer's contribution to a month's buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    None,
    New(Decimal),
    Expansion(Decimal),
    Contraction(Decimal),
    Churn(Decimal),
    /// Lapsed during the month and came back: churn of the old ARR, new for the current
    ChurnAndReturn { churned: Decimal, new: Decimal },
}

impl Movement {
    /// Classify a customer's ARR change between two month ends.
    ///
    /// Dropping to zero ARR is churn whether or not coverage lapsed.
    pub fn classify(prior: Decimal, current: Decimal, lapsed: bool) -> Movement {
        if prior.is_zero() {
            return if current > Decimal::ZERO {
                Movement::New(current)
            } else {
                Movement::None
            };
        }

        if current.is_zero() {
            return Movement::Churn(prior);
        }

        if lapsed {
            return if current > Decimal::ZERO {
                Movement::ChurnAndReturn {
                    churned: prior,
                    new: current,
                }
            } else {
                Movement::Churn(prior)
            };
        }

        let delta = current - prior;
        if delta > Decimal::ZERO {
            Movement::Expansion(delta)
        } else if delta < Decimal::ZERO {
            Movement::Contraction(-delta)
        } else {
            Movement::None
        }
    }

    fn apply(self, snapshot: &mut MonthlyArrSnapshot) {
        match self {
            Movement::None => {}
            Movement::New(amount) => snapshot.new += amount,
            Movement::Expansion(amount) => snapshot.expansion += amount,
            Movement::Contraction(amount) => snapshot.contraction += amount,
            Movement::Churn(amount) => snapshot.churned += amount,
            Movement::ChurnAndReturn { churned, new } => {
                snapshot.churned += churned;
                snapshot.new += new;
            }
        }
    }
}

// ============================================================================
// ROLLFORWARD ENGINE
// ============================================================================

/// Subscription history indexed by customer.
///
/// Construction validates that every subscription references a known
/// customer. Customers are visited in id order so results are reproducible.
pub struct RollforwardEngine<'a> {
    customers: BTreeMap<&'a str, &'a Customer>,
    subscriptions: BTreeMap<&'a str, Vec<&'a Subscription>>,
}

impl<'a> RollforwardEngine<'a> {
    pub fn new(customers: &'a [Customer], subscriptions: &'a [Subscription]) -> Result<Self> {
        let customers: BTreeMap<&str, &Customer> =
            customers.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut by_customer: BTreeMap<&str, Vec<&Subscription>> = BTreeMap::new();
        for sub in subscriptions {
            if !customers.contains_key(sub.customer_id.as_str()) {
                return Err(ArrError::MissingReference {
                    table: "subscriptions",
                    record: sub.id.clone(),
                    customer_id: sub.customer_id.clone(),
                });
            }
            by_customer
                .entry(sub.customer_id.as_str())
                .or_default()
                .push(sub);
        }

        Ok(RollforwardEngine {
            customers,
            subscriptions: by_customer,
        })
    }

    /// Annualized revenue of `subs` active on the last day of `period`.
    fn arr_at(subs: &[&Subscription], period: Period) -> Decimal {
        let day = period.last_day();
        subs.iter()
            .filter(|s| s.is_active_on(day))
            .map(|s| s.annual_amount())
            .sum()
    }

    /// True when some day of `period` has no active paid subscription.
    fn lapsed_during(subs: &[&Subscription], period: Period) -> bool {
        period.days().any(|day| {
            !subs
                .iter()
                .any(|s| s.mrr > Decimal::ZERO && s.is_active_on(day))
        })
    }

    /// Each customer with subscription history and its ARR at the end of `period`.
    pub fn customer_arr_at(&self, period: Period) -> Vec<(&'a Customer, Decimal)> {
        self.subscriptions
            .iter()
            .filter_map(|(id, subs)| {
                let customer = self.customers.get(id)?;
                Some((*customer, Self::arr_at(subs, period)))
            })
            .collect()
    }

    /// Total ARR at the end of `period`.
    pub fn arr_at_period_end(&self, period: Period) -> Decimal {
        self.subscriptions
            .values()
            .map(|subs| Self::arr_at(subs, period))
            .sum()
    }

    /// One snapshot per month of `range`, in order.
    pub fn snapshots(&self, range: &PeriodRange) -> Vec<MonthlyArrSnapshot> {
        let mut snapshots = Vec::with_capacity(range.len());

        // Full history is available, so the first month opens from real data.
        let before = range.start().prev();
        let mut starting = self.arr_at_period_end(before);

        for period in range.months() {
            let prior_period = period.prev();
            let mut snapshot = MonthlyArrSnapshot::opening(period, starting, 0);
            let mut closing_total = Decimal::ZERO;

            for subs in self.subscriptions.values() {
                let prior = Self::arr_at(subs, prior_period);
                let current = Self::arr_at(subs, period);
                let lapsed = !prior.is_zero() && Self::lapsed_during(subs, period);

                Movement::classify(prior, current, lapsed).apply(&mut snapshot);

                if prior > Decimal::ZERO {
                    snapshot.starting_customers += 1;
                }
                if current > Decimal::ZERO {
                    snapshot.active_customers += 1;
                }
                closing_total += current;
            }

            snapshot.ending = snapshot.starting + snapshot.net_change();
            debug_assert_eq!(snapshot.ending, closing_total);

            debug!(
                period = %period,
                starting = %snapshot.starting,
                ending = %snapshot.ending,
                active = snapshot.active_customers,
                "computed monthly snapshot"
            );

            starting = snapshot.ending;
            snapshots.push(snapshot);
        }

        snapshots
    }
}

/// Monthly ARR rollforward for every month of `range`.
///
/// Fails with `MissingReference` when a subscription names an unknown
/// customer. Range validity is enforced when the `PeriodRange` is built.
pub fn compute_monthly_snapshots(
    customers: &[Customer],
    subscriptions: &[Subscription],
    range: &PeriodRange,
) -> Result<Vec<MonthlyArrSnapshot>> {
    let engine = RollforwardEngine::new(customers, subscriptions)?;
    Ok(engine.snapshots(range))
}

// ============================================================================
// TESTS
// ============================================================================
