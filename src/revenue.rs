// 💵 Recognized Revenue - payments totalled by recognized period

use crate::error::{ArrError, Result};
use crate::models::{Customer, Transaction};
use crate::period::{Period, PeriodRange};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub period: Period,
    pub recognized: Decimal,
    pub payments: usize,
}

/// Sum of transaction amounts per recognized period, one entry per month of
/// `range` (zero-filled). Refunds are negative amounts and reduce the total.
pub fn compute_recognized_revenue(
    customers: &[Customer],
    transactions: &[Transaction],
    range: &PeriodRange,
) -> Result<Vec<MonthlyRevenue>> {
    let known: HashSet<&str> = customers.iter().map(|c| c.id.as_str()).collect();

    let mut totals: BTreeMap<Period, (Decimal, usize)> = range
        .months()
        .map(|p| (p, (Decimal::ZERO, 0)))
        .collect();

    for tx in transactions {
        if !known.contains(tx.customer_id.as_str()) {
            return Err(ArrError::MissingReference {
                table: "transactions",
                record: tx.id.clone(),
                customer_id: tx.customer_id.clone(),
            });
        }
        if let Some((sum, count)) = totals.get_mut(&tx.recognized_period) {
            *sum += tx.amount;
            *count += 1;
        }
    }

    Ok(totals
        .into_iter()
        .map(|(period, (recognized, payments))| MonthlyRevenue {
            period,
            recognized,
            payments,
        })
        .collect())
}
