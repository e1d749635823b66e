//! Z-score standardization of the monthly factor means
//!
//! Puts the five factors on a common scale so a reviewer can spot which
//! months sit far from their own history. Uses aprender's StandardScaler;
//! a zero-variance factor standardizes to 0.0 rather than dividing by zero.

use crate::factor::Factor;
use crate::monthly::MonthlyFactorMeans;
use aprender::preprocessing::StandardScaler;
use aprender::primitives::Matrix;
use aprender::traits::Transformer;
use chrono::NaiveDate;
use serde::Serialize;

/// Z-scores for one month, in `Factor::ALL` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardizedMonth {
    pub month: NaiveDate,
    pub z_scores: [f64; 5],
}

/// Standardized view of the monthly factor means
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardizedMonths {
    /// One entry per usable month, preserving month order
    pub months: Vec<StandardizedMonth>,
    /// Months excluded because a factor had no observations (no imputation)
    pub skipped_months: Vec<NaiveDate>,
    /// Per-factor means used for centering
    pub means: Vec<f32>,
    /// Per-factor standard deviations used for scaling
    pub stds: Vec<f32>,
}

impl StandardizedMonths {
    fn empty(skipped_months: Vec<NaiveDate>) -> Self {
        Self {
            months: Vec::new(),
            skipped_months,
            means: Vec::new(),
            stds: Vec::new(),
        }
    }
}

/// Standardize the monthly factor means to zero mean and unit variance
pub fn standardize_monthly(monthly: &[MonthlyFactorMeans]) -> StandardizedMonths {
    let mut complete: Vec<&MonthlyFactorMeans> = Vec::new();
    let mut skipped_months = Vec::new();
    for month in monthly {
        if month.factors.iter().all(|f| f.is_some()) {
            complete.push(month);
        } else {
            skipped_months.push(month.month);
        }
    }

    if complete.is_empty() {
        return StandardizedMonths::empty(skipped_months);
    }

    let n_months = complete.len();
    let n_factors = Factor::ALL.len();
    let mut data = Vec::with_capacity(n_months * n_factors);
    for month in &complete {
        for value in &month.factors {
            data.push(value.unwrap_or(0.0) as f32);
        }
    }

    let features = match Matrix::from_vec(n_months, n_factors, data) {
        Ok(m) => m,
        Err(_) => return StandardizedMonths::empty(skipped_months),
    };

    let mut scaler = StandardScaler::new().with_mean(true).with_std(true);
    if scaler.fit(&features).is_err() {
        return StandardizedMonths::empty(skipped_months);
    }
    let transformed = match scaler.transform(&features) {
        Ok(t) => t,
        Err(_) => return StandardizedMonths::empty(skipped_months),
    };

    let stds = scaler.std().to_vec();
    let months = complete
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let mut z_scores = [0.0_f64; 5];
            for (j, z) in z_scores.iter_mut().enumerate() {
                let value = transformed.get(i, j) as f64;
                // Constant factor: no deviation to speak of
                *z = if stds[j] == 0.0 || !value.is_finite() {
                    0.0
                } else {
                    value
                };
            }
            StandardizedMonth {
                month: month.month,
                z_scores,
            }
        })
        .collect();

    StandardizedMonths {
        months,
        skipped_months,
        means: scaler.mean().to_vec(),
        stds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn month_means(month: NaiveDate, factors: [Option<f64>; 5]) -> MonthlyFactorMeans {
        MonthlyFactorMeans {
            month,
            mean_sales: 100.0,
            factors,
        }
    }

    #[test]
    fn test_standardize_centers_each_factor() {
        let monthly = vec![
            month_means(ymd(2020, 1), [Some(10.0), Some(1.0), Some(0.0), Some(100.0), Some(20.0)]),
            month_means(ymd(2020, 2), [Some(20.0), Some(2.0), Some(1.0), Some(200.0), Some(40.0)]),
            month_means(ymd(2020, 3), [Some(30.0), Some(3.0), Some(2.0), Some(300.0), Some(60.0)]),
        ];

        let standardized = standardize_monthly(&monthly);
        assert_eq!(standardized.months.len(), 3);
        assert!(standardized.skipped_months.is_empty());

        for j in 0..5 {
            let mean: f64 = standardized
                .months
                .iter()
                .map(|m| m.z_scores[j])
                .sum::<f64>()
                / 3.0;
            assert!(mean.abs() < 1e-4, "factor {} mean {}", j, mean);
        }

        // Middle month sits at the center of a linear ramp
        for j in 0..5 {
            assert!(standardized.months[1].z_scores[j].abs() < 1e-4);
        }
    }

    #[test]
    fn test_zero_variance_factor_standardizes_to_zero() {
        let monthly = vec![
            month_means(ymd(2020, 1), [Some(10.0), Some(5.0), Some(0.0), Some(100.0), Some(20.0)]),
            month_means(ymd(2020, 2), [Some(20.0), Some(5.0), Some(1.0), Some(200.0), Some(40.0)]),
            month_means(ymd(2020, 3), [Some(30.0), Some(5.0), Some(2.0), Some(300.0), Some(60.0)]),
        ];

        let standardized = standardize_monthly(&monthly);
        let promo = Factor::CompetitionPromotions.index();
        for month in &standardized.months {
            assert_eq!(month.z_scores[promo], 0.0);
            for z in &month.z_scores {
                assert!(z.is_finite());
            }
        }
    }

    #[test]
    fn test_months_with_missing_factor_are_skipped() {
        let monthly = vec![
            month_means(ymd(2020, 1), [Some(10.0), Some(1.0), Some(0.0), Some(100.0), Some(20.0)]),
            month_means(ymd(2020, 2), [Some(20.0), None, Some(1.0), Some(200.0), Some(40.0)]),
            month_means(ymd(2020, 3), [Some(30.0), Some(3.0), Some(2.0), Some(300.0), Some(60.0)]),
        ];

        let standardized = standardize_monthly(&monthly);
        assert_eq!(standardized.months.len(), 2);
        assert_eq!(standardized.skipped_months, vec![ymd(2020, 2)]);
        assert_eq!(standardized.months[0].month, ymd(2020, 1));
        assert_eq!(standardized.months[1].month, ymd(2020, 3));
    }

    #[test]
    fn test_empty_input() {
        let standardized = standardize_monthly(&[]);
        assert!(standardized.months.is_empty());
        assert!(standardized.skipped_months.is_empty());
    }
}
