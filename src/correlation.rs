//! Pearson correlation of sales against each explanatory factor
//!
//! Pairwise-complete per factor: a factor with more missing values simply
//! uses fewer rows than another. Conditions that make the coefficient
//! meaningless (too few pairs, zero variance) are reported as explicit
//! outcomes so no NaN ever reaches a caller.

use crate::config::DiagnosticsConfig;
use crate::factor::Factor;
use crate::panel::Panel;
use serde::Serialize;
use trueno::Vector;

/// Why a correlation could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NotComputableReason {
    /// Fewer valid paired observations than the configured minimum
    InsufficientRows { required: usize, actual: usize },
    /// Sales or the factor is constant over the paired observations
    ZeroVariance,
}

/// Correlation outcome for one factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CorrelationOutcome {
    /// Pearson coefficient in [-1, 1]
    Computed(f64),
    /// No meaningful coefficient exists; the caller decides whether to
    /// omit the factor or render the reason
    NotComputable(NotComputableReason),
}

impl CorrelationOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            CorrelationOutcome::Computed(r) => Some(*r),
            CorrelationOutcome::NotComputable(_) => None,
        }
    }
}

/// Sales/factor association for one factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorCorrelation {
    pub factor: Factor,
    /// Paired observations used (sales and this factor both present)
    pub rows_used: usize,
    pub outcome: CorrelationOutcome,
}

/// Pearson correlation over paired samples
///
/// Means via Trueno, second moments accumulated in f64. Assumes both
/// slices are the same length and non-empty.
fn pearson(xs: &[f32], ys: &[f32]) -> Option<f64> {
    let mean_x = Vector::from_slice(xs).mean().unwrap_or(0.0) as f64;
    let mean_y = Vector::from_slice(ys).mean().unwrap_or(0.0) as f64;

    let mut covariance = 0.0_f64;
    let mut variance_x = 0.0_f64;
    let mut variance_y = 0.0_f64;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x <= 0.0 || variance_y <= 0.0 {
        return None;
    }

    let r = covariance / (variance_x.sqrt() * variance_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// Correlate sales with each factor, in `Factor::ALL` order
///
/// Consumers reorder by magnitude as needed; the engine never does.
pub fn correlate(panel: &Panel, config: &DiagnosticsConfig) -> Vec<FactorCorrelation> {
    Factor::ALL
        .iter()
        .map(|&factor| {
            let mut sales: Vec<f32> = Vec::new();
            let mut values: Vec<f32> = Vec::new();
            for obs in panel.observations() {
                if let Some(value) = obs.factor(factor) {
                    sales.push(obs.sales as f32);
                    values.push(value as f32);
                }
            }

            let rows_used = values.len();
            let outcome = if rows_used < config.min_correlation_rows {
                CorrelationOutcome::NotComputable(NotComputableReason::InsufficientRows {
                    required: config.min_correlation_rows,
                    actual: rows_used,
                })
            } else {
                match pearson(&values, &sales) {
                    Some(r) => CorrelationOutcome::Computed(r),
                    None => CorrelationOutcome::NotComputable(NotComputableReason::ZeroVariance),
                }
            };

            FactorCorrelation {
                factor,
                rows_used,
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Observation;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn obs_with_price(month: u32, sales: f64, price: Option<f64>) -> Observation {
        Observation {
            store_id: "A".to_string(),
            month: ymd(2020, month),
            sales,
            avg_price: price,
            competition_promotions: None,
            staff_absences: None,
            marketing_investment: None,
            stock_percent: None,
        }
    }

    fn panel_of(observations: Vec<Observation>) -> Panel {
        Panel::from_observations(observations).0
    }

    #[test]
    fn test_output_follows_factor_set_order() {
        let panel = panel_of(vec![]);
        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        let factors: Vec<Factor> = correlations.iter().map(|c| c.factor).collect();
        assert_eq!(factors, Factor::ALL.to_vec());
    }

    #[test]
    fn test_perfect_positive_correlation() {
        // Factor equals sales: Pearson must be 1.0 within floating tolerance
        let panel = panel_of(
            [100.0, 150.0, 200.0, 250.0]
                .iter()
                .enumerate()
                .map(|(i, &s)| obs_with_price(i as u32 + 1, s, Some(s)))
                .collect(),
        );

        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        let r = correlations[Factor::AvgPrice.index()].outcome.value().unwrap();
        assert!((r - 1.0).abs() < 1e-6, "r = {}", r);
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let panel = panel_of(
            [(100.0, 50.0), (200.0, 40.0), (300.0, 30.0), (400.0, 20.0)]
                .iter()
                .enumerate()
                .map(|(i, &(s, p))| obs_with_price(i as u32 + 1, s, Some(p)))
                .collect(),
        );

        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        let r = correlations[Factor::AvgPrice.index()].outcome.value().unwrap();
        assert!((r + 1.0).abs() < 1e-6, "r = {}", r);
    }

    #[test]
    fn test_insufficient_rows_is_explicit() {
        let panel = panel_of(vec![
            obs_with_price(1, 100.0, Some(10.0)),
            obs_with_price(2, 200.0, Some(12.0)),
        ]);

        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        assert_eq!(
            correlations[Factor::AvgPrice.index()].outcome,
            CorrelationOutcome::NotComputable(NotComputableReason::InsufficientRows {
                required: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_zero_variance_is_explicit() {
        let panel = panel_of(vec![
            obs_with_price(1, 100.0, Some(10.0)),
            obs_with_price(2, 200.0, Some(10.0)),
            obs_with_price(3, 300.0, Some(10.0)),
        ]);

        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        assert_eq!(
            correlations[Factor::AvgPrice.index()].outcome,
            CorrelationOutcome::NotComputable(NotComputableReason::ZeroVariance)
        );
    }

    #[test]
    fn test_pairwise_complete_uses_fewer_rows_per_factor() {
        // Price present in 4 rows, promotions in only 3
        let mut observations: Vec<Observation> = (1..=4)
            .map(|m| obs_with_price(m, 100.0 * m as f64, Some(10.0 + m as f64)))
            .collect();
        for (i, obs) in observations.iter_mut().enumerate() {
            if i > 0 {
                obs.competition_promotions = Some(i as f64);
            }
        }

        let panel = panel_of(observations);
        let correlations = correlate(&panel, &DiagnosticsConfig::default());
        assert_eq!(correlations[Factor::AvgPrice.index()].rows_used, 4);
        assert_eq!(
            correlations[Factor::CompetitionPromotions.index()].rows_used,
            3
        );
        assert!(correlations[Factor::CompetitionPromotions.index()]
            .outcome
            .value()
            .is_some());
    }

    #[test]
    fn test_no_nan_ever_escapes() {
        let panel = panel_of(vec![
            obs_with_price(1, 0.0, Some(0.0)),
            obs_with_price(2, 0.0, Some(0.0)),
            obs_with_price(3, 0.0, Some(0.0)),
        ]);
        for correlation in correlate(&panel, &DiagnosticsConfig::default()) {
            if let Some(r) = correlation.outcome.value() {
                assert!(r.is_finite());
            }
        }
    }
}
