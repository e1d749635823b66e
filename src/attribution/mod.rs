// Contribution attribution for month-over-month sales changes
//
// The hardest piece of the engine: fit `sales ~ 1 + factors` once over the
// complete-case panel, then allocate a target month's sales delta across
// factors as coefficient times factor delta. Rank-deficient designs
// (collinear factors, tiny panels) are an expected case, not an error: the
// solver returns the minimum-norm solution and the result is flagged
// degenerate.
//
// Implementation:
// - Normal equations solved by a Jacobi eigendecomposition of the Gram
//   matrix; the eigenvalue cutoff makes the pseudo-inverse fallback the
//   ordinary code path rather than a special case
// - Deltas are per-month portfolio means, the same granularity the monthly
//   standardization uses
// - All per-factor iteration and summation follow Factor::ALL order

mod engine;
mod solver;

pub use engine::{attribute, AttributionError, AttributionResult, FactorContribution};
pub use solver::{fit_least_squares, LeastSquaresFit, FACTORS};
