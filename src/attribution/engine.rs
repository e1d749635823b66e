// Contribution attribution for a target month against its calendar
// predecessor
//
// One complete-case least-squares fit over the whole panel, then
// contribution[f] = coefficient[f] * (portfolio mean of f in the target
// month - portfolio mean in the base month). The residual between the
// predicted and actual sales delta is reported, not discarded.

use crate::attribution::solver::{fit_least_squares, FACTORS};
use crate::config::DiagnosticsConfig;
use crate::factor::Factor;
use crate::monthly::{monthly_factor_means, MonthlyFactorMeans};
use crate::panel::Panel;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

/// Errors for the attribution engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributionError {
    #[error("target month {month} not present in the panel")]
    TargetMonthNotFound { month: NaiveDate },

    #[error("missing baseline: {base}, the month preceding {target}, has no rows in the panel")]
    MissingBaseline { target: NaiveDate, base: NaiveDate },

    #[error("insufficient data: need at least {required} complete observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("cannot form a delta for {factor}: no observation carries it in {month}")]
    FactorDeltaUnavailable { factor: Factor, month: NaiveDate },
}

/// One factor's share of the month-over-month sales change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorContribution {
    pub factor: Factor,
    /// Portfolio-mean change of the factor, target minus base
    pub delta_value: f64,
    /// Fitted coefficient from the single least-squares model
    pub coefficient: f64,
    /// `coefficient * delta_value`
    pub contribution: f64,
}

/// Attribution of a sales delta between two adjacent months
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionResult {
    pub target_month: NaiveDate,
    pub base_month: NaiveDate,
    /// Observed mean-sales change, target minus base
    pub actual_delta: f64,
    /// Sum of all factor contributions (the intercept has zero delta)
    pub predicted_delta: f64,
    /// `actual_delta - predicted_delta`: the portion the linear model
    /// does not explain
    pub residual: f64,
    /// Intercept of the fitted model
    pub intercept: f64,
    /// Contributions sorted by |contribution| descending; ties keep
    /// `Factor::ALL` declaration order
    pub per_factor: Vec<FactorContribution>,
    /// True when the fit used the minimum-norm fallback (rank-deficient
    /// design: collinear factors or too few complete rows)
    pub degenerate: bool,
    /// Complete-case observations behind the fitted coefficients
    pub observations_used: usize,
}

/// First day of the calendar month immediately preceding `month`
fn previous_month(month: NaiveDate) -> NaiveDate {
    let (year, month_number) = if month.month() == 1 {
        (month.year() - 1, 12)
    } else {
        (month.year(), month.month() - 1)
    };
    // Day 1 of any month is always constructible
    NaiveDate::from_ymd_opt(year, month_number, 1).unwrap_or(month)
}

fn month_row(monthly: &[MonthlyFactorMeans], month: NaiveDate) -> Option<&MonthlyFactorMeans> {
    monthly.iter().find(|m| m.month == month)
}

/// Attribute the sales change of `target_month` (vs its immediate
/// predecessor) to the five factors
///
/// Pure function of the panel: same panel, same target, same result.
pub fn attribute(
    panel: &Panel,
    target_month: NaiveDate,
    config: &DiagnosticsConfig,
) -> Result<AttributionResult, AttributionError> {
    let target = target_month.with_day(1).unwrap_or(target_month);
    let base = previous_month(target);

    let monthly = monthly_factor_means(panel);
    let target_row = month_row(&monthly, target)
        .ok_or(AttributionError::TargetMonthNotFound { month: target })?;
    let base_row = month_row(&monthly, base)
        .ok_or(AttributionError::MissingBaseline { target, base })?;

    // Complete-case design: one fit, coefficients consistent across factors
    let mut rows: Vec<[f64; FACTORS]> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    for obs in panel.observations() {
        let mut values = [0.0_f64; FACTORS];
        let mut complete = true;
        for factor in Factor::ALL {
            match obs.factor(factor) {
                Some(value) => values[factor.index()] = value,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            rows.push(values);
            targets.push(obs.sales);
        }
    }

    if rows.len() < config.min_fit_rows {
        return Err(AttributionError::InsufficientData {
            required: config.min_fit_rows,
            actual: rows.len(),
        });
    }

    let fit = fit_least_squares(&rows, &targets, config.rank_tolerance);

    // Deltas and the predicted sum accumulate in declaration order so
    // floating-point summation is reproducible
    let mut per_factor = Vec::with_capacity(FACTORS);
    let mut predicted_delta = 0.0_f64;
    for factor in Factor::ALL {
        let target_mean = target_row.factor(factor).ok_or(
            AttributionError::FactorDeltaUnavailable {
                factor,
                month: target,
            },
        )?;
        let base_mean =
            base_row
                .factor(factor)
                .ok_or(AttributionError::FactorDeltaUnavailable {
                    factor,
                    month: base,
                })?;

        let delta_value = target_mean - base_mean;
        let coefficient = fit.coefficients[factor.index()];
        let contribution = coefficient * delta_value;
        predicted_delta += contribution;
        per_factor.push(FactorContribution {
            factor,
            delta_value,
            coefficient,
            contribution,
        });
    }

    let actual_delta = target_row.mean_sales - base_row.mean_sales;
    let residual = actual_delta - predicted_delta;

    // Stable sort: equal magnitudes keep declaration order
    per_factor.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(AttributionResult {
        target_month: target,
        base_month: base,
        actual_delta,
        predicted_delta,
        residual,
        intercept: fit.intercept,
        per_factor,
        degenerate: fit.degenerate,
        observations_used: rows.len(),
    })
}
