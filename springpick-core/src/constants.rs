/// Default regularization strength. Zero selects the gauge-fixed system, which
/// pins the last item instead of pulling every score toward `DEFAULT_L0`.
pub const DEFAULT_ALPHA: f64 = 0.0;

/// Default anchor value for the regularized system.
pub const DEFAULT_L0: f64 = 1.0;

/// Default weight of the win/loss imbalance term on the right-hand side.
pub const DEFAULT_L1: f64 = 1.0;

/// Adjacent scores no further apart than this belong to the same tier.
/// Must stay well above the error left by `DEFAULT_SOLVER_TOLERANCE`.
pub const DEFAULT_TIE_TOLERANCE: f64 = 1e-6;

/// Relative residual `||B - Cx|| / ||B||` at which BiCGSTAB stops.
pub const DEFAULT_SOLVER_TOLERANCE: f64 = 1e-10;

/// BiCGSTAB counts as converged when the true residual, recomputed from the
/// final iterate, is within this factor of the tolerance. The recurrence
/// residual that stops the iteration drifts from the true one by rounding.
pub const CONVERGENCE_SLACK: f64 = 10.0;

/// Floor for the BiCGSTAB iteration cap; the effective cap is
/// `max(DEFAULT_MIN_SOLVER_ITERATIONS, 10 * n)` unless configured.
pub const DEFAULT_MIN_SOLVER_ITERATIONS: usize = 100;

/// Pivots smaller than this (relative to the largest matrix entry) are
/// treated as zero by the direct solver.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// How many random redraws the pair selector attempts after its first choice
/// turned out to be already resolved, before scanning pairs in order.
pub const DEFAULT_MAX_REDRAWS: usize = 1000;
