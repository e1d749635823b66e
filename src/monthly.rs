//! Monthly aggregation of the normalized panel
//!
//! Collapses the cross-store panel into one row per month: summed sales,
//! mean price, and the portfolio-mean factor view consumed by the
//! standardization and attribution stages. All sums run through Trueno
//! vectors over the panel's canonical order, so totals are deterministic.

use crate::factor::Factor;
use crate::panel::{Observation, Panel};
use chrono::NaiveDate;
use serde::Serialize;
use trueno::Vector;

/// Portfolio-level totals for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month: NaiveDate,
    /// Sum of sales over every store reporting that month
    pub total_sales: f64,
    /// Simple mean of avg_price over the stores that reported one;
    /// `None` when no store did (missing prices are never imputed)
    pub mean_price: Option<f64>,
}

/// Per-month portfolio means at the same granularity as the attribution fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyFactorMeans {
    pub month: NaiveDate,
    /// Mean sales per observation in the month
    pub mean_sales: f64,
    /// Mean of each factor over the observations carrying it, in
    /// `Factor::ALL` order; `None` when no observation carried it
    pub factors: [Option<f64>; 5],
}

impl MonthlyFactorMeans {
    pub fn factor(&self, factor: Factor) -> Option<f64> {
        self.factors[factor.index()]
    }
}

/// Contiguous per-month slices of the panel (valid because the panel is
/// sorted by month)
fn month_slices(panel: &Panel) -> Vec<(NaiveDate, &[Observation])> {
    let observations = panel.observations();
    let mut slices = Vec::new();
    let mut start = 0;
    for i in 1..=observations.len() {
        if i == observations.len() || observations[i].month != observations[start].month {
            slices.push((observations[start].month, &observations[start..i]));
            start = i;
        }
    }
    slices
}

fn sum_f32(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Vector::from_slice(values).sum().unwrap_or(0.0) as f64
}

fn mean_f32(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Vector::from_slice(values).mean().unwrap_or(0.0) as f64)
}

/// Aggregate the panel into one row per distinct month, ascending
pub fn aggregate(panel: &Panel) -> Vec<MonthlyAggregate> {
    month_slices(panel)
        .into_iter()
        .map(|(month, group)| {
            let sales: Vec<f32> = group.iter().map(|o| o.sales as f32).collect();
            let prices: Vec<f32> = group
                .iter()
                .filter_map(|o| o.avg_price)
                .map(|p| p as f32)
                .collect();
            MonthlyAggregate {
                month,
                total_sales: sum_f32(&sales),
                mean_price: mean_f32(&prices),
            }
        })
        .collect()
}

/// Month with the highest total sales; earliest month wins ties
pub fn peak_month(aggregates: &[MonthlyAggregate]) -> Option<&MonthlyAggregate> {
    let mut best: Option<&MonthlyAggregate> = None;
    for agg in aggregates {
        match best {
            Some(current) if agg.total_sales <= current.total_sales => {}
            _ => best = Some(agg),
        }
    }
    best
}

/// Percent change of total sales against the previous aggregate entry
///
/// Index-aligned with the input; `None` for the first entry and whenever
/// the previous total is zero.
pub fn month_over_month(aggregates: &[MonthlyAggregate]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(aggregates.len());
    for (i, agg) in aggregates.iter().enumerate() {
        if i == 0 || aggregates[i - 1].total_sales == 0.0 {
            changes.push(None);
        } else {
            let prev = aggregates[i - 1].total_sales;
            changes.push(Some((agg.total_sales - prev) / prev * 100.0));
        }
    }
    changes
}

/// Per-month portfolio means of sales and each factor
pub fn monthly_factor_means(panel: &Panel) -> Vec<MonthlyFactorMeans> {
    month_slices(panel)
        .into_iter()
        .map(|(month, group)| {
            let sales: Vec<f32> = group.iter().map(|o| o.sales as f32).collect();
            let mut factors: [Option<f64>; 5] = [None; 5];
            for factor in Factor::ALL {
                let values: Vec<f32> = group
                    .iter()
                    .filter_map(|o| o.factor(factor))
                    .map(|v| v as f32)
                    .collect();
                factors[factor.index()] = mean_f32(&values);
            }
            MonthlyFactorMeans {
                month,
                mean_sales: mean_f32(&sales).unwrap_or(0.0),
                factors,
            }
        })
        .collect()
}
