// Configuration for the diagnostic engine
//
// Row-count minimums and the rank cutoff are the only tunables: the engine
// itself is a pure function of the panel.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for the correlation analyzer and attribution engine
///
/// # Example
/// ```
/// use vender::config::DiagnosticsConfig;
///
/// let config = DiagnosticsConfig::default();
/// assert_eq!(config.min_correlation_rows, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Minimum paired observations for a Pearson correlation
    ///
    /// Below this the factor's correlation is reported as not computable
    /// rather than returning a meaningless coefficient. Two points always
    /// correlate perfectly, so the floor is 3.
    pub min_correlation_rows: usize,

    /// Minimum complete-case observations for the attribution fit
    ///
    /// Below this `attribute` fails with an insufficient-data error. The
    /// default of 2 admits rank-deficient fits (the engine falls back to a
    /// minimum-norm solution and flags the result as degenerate); raise it
    /// to 6 to demand a full-rank design instead.
    pub min_fit_rows: usize,

    /// Relative eigenvalue cutoff for rank detection in the least-squares
    /// solve
    ///
    /// Eigenvalues of the Gram matrix below `rank_tolerance * lambda_max`
    /// are treated as zero. Larger values classify near-collinear designs
    /// as degenerate sooner.
    pub rank_tolerance: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            min_correlation_rows: 3,
            min_fit_rows: 2,
            rank_tolerance: 1e-9,
        }
    }
}

impl DiagnosticsConfig {
    /// Strict configuration: demand a full-rank design and more paired
    /// rows before reporting anything
    pub fn strict() -> Self {
        Self {
            min_correlation_rows: 5,
            min_fit_rows: 6, // intercept + five factors
            rank_tolerance: 1e-12,
        }
    }

    /// Permissive configuration: accept whatever a small classroom panel
    /// provides, leaning on the degenerate fallback
    pub fn permissive() -> Self {
        Self {
            min_correlation_rows: 3,
            min_fit_rows: 2,
            rank_tolerance: 1e-6,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_correlation_rows < 2 {
            return Err(format!(
                "min_correlation_rows must be >= 2, got {}",
                self.min_correlation_rows
            ));
        }

        if self.min_fit_rows < 1 {
            return Err("min_fit_rows must be >= 1".to_string());
        }

        if !(self.rank_tolerance > 0.0 && self.rank_tolerance < 1.0) {
            return Err(format!(
                "rank_tolerance must be in (0, 1), got {}",
                self.rank_tolerance
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML configuration string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("parsing diagnostics config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}
