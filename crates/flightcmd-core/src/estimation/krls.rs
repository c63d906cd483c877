//! Kernel Recursive Least Squares (KRLS) acceleration correction
//!
//! Sliding-window, multi-output KRLS sharing one tap window across x/y/z.
//!
//! Each tap maps a feature u = [e; a] (tracking error, applied correction) to
//! the tracking error observed one tick later. The filter keeps
//!
//! ```text
//! P = (K + δI)⁻¹          K: Gram matrix over the tap window
//! α = P·Y                 Y: stored targets, discounted by λ every tick
//! ê = k(u)ᵀ·α             forecast of the next tracking error
//! a' = clamp(λ·a + g·ê)   refreshed correction
//! ```
//!
//! Kernel values are cosine-normalized by default, which keeps the Gram
//! diagonal at one and the window well scaled for high polynomial degrees.
//!
//! P grows by a block Sherman–Morrison step when a tap is inserted and shrinks
//! by a Schur complement when the oldest tap is evicted. In exact arithmetic
//! the Schur complement of a new tap is at least δ and trace(P) ≤ n/δ; an update
//! that breaks either bound, or produces a non-finite value, keeps the prior
//! correction and clears the window.

use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::math::Kernel;
use crate::Vec3;

/// Number of learned outputs (x, y, z acceleration)
pub const OUTPUT_DIM: usize = 3;

/// Length of the tap feature vector
pub const FEATURE_DIM: usize = 2 * OUTPUT_DIM;

/// Tolerated slack on the theoretical trace bound of P
const TRACE_SLACK: f64 = 1.01;

/// KRLS parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KrlsConfig {
    /// Maximum number of retained taps
    pub num_taps: usize,
    /// Regularization δ added to the Gram diagonal
    pub delta: f64,
    /// Forgetting factor λ ∈ (0, 1]
    pub lambda: f64,
    /// Kernel family
    pub kernel: Kernel,
    /// Evaluate the kernel cosine-normalized (unit Gram diagonal)
    pub normalize_kernel: bool,
    /// Weight of the error forecast in the correction
    pub gain: f64,
    /// Per-axis bound on the correction [m/s²]
    pub max_correction: f64,
}

impl Default for KrlsConfig {
    fn default() -> Self {
        Self {
            num_taps: 60,
            delta: 0.01,
            lambda: 0.99,
            kernel: Kernel::default(),
            normalize_kernel: true,
            gain: 0.05,
            max_correction: 2.0,
        }
    }
}

impl KrlsConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.num_taps == 0 {
            return Err(CoreError::config("KRLS tap count must be at least 1"));
        }
        if !(self.lambda > 0.0 && self.lambda <= 1.0) {
            return Err(CoreError::config(format!(
                "forgetting factor must lie in (0, 1], got {}",
                self.lambda
            )));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(CoreError::config(format!(
                "regularization must be positive, got {}",
                self.delta
            )));
        }
        if !(self.gain.is_finite() && self.gain >= 0.0) {
            return Err(CoreError::config(format!(
                "correction gain must be finite and non-negative, got {}",
                self.gain
            )));
        }
        if !(self.max_correction.is_finite() && self.max_correction > 0.0) {
            return Err(CoreError::config(format!(
                "correction bound must be positive, got {}",
                self.max_correction
            )));
        }
        self.kernel.validate()
    }
}

/// Sliding-window multi-output KRLS filter
#[derive(Debug, Clone)]
pub struct KernelRls {
    config: KrlsConfig,
    /// Tap inputs, oldest first
    taps: VecDeque<DVector<f64>>,
    /// Discounted targets aligned with `taps`
    targets: VecDeque<Vec3>,
    /// (K + δI)⁻¹ over the current window
    inverse: DMatrix<f64>,
    /// α = P·Y, one column per output
    coefficients: DMatrix<f64>,
    /// Feature of the previous update, paired with the next observed error
    pending: Option<DVector<f64>>,
    correction: Vec3,
    updates: u64,
    degradations: u64,
}

impl KernelRls {
    /// Create a filter, rejecting invalid parameters
    pub fn new(config: KrlsConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            taps: VecDeque::with_capacity(config.num_taps),
            targets: VecDeque::with_capacity(config.num_taps),
            inverse: DMatrix::zeros(0, 0),
            coefficients: DMatrix::zeros(0, OUTPUT_DIM),
            pending: None,
            correction: Vec3::zeros(),
            updates: 0,
            degradations: 0,
            config,
        })
    }

    /// Incorporate one observation/reference pair and return the new correction
    ///
    /// # Arguments
    /// * `prior` - Correction applied during the last tick [m/s²]
    /// * `observed` - Observed position [m]
    /// * `desired` - Commanded reference position [m]
    ///
    /// The first call has nothing to pair with and returns `prior` unchanged.
    /// A numerically degraded update also returns `prior` (or the last good
    /// correction if `prior` itself is not finite).
    pub fn update(&mut self, prior: &Vec3, observed: &Vec3, desired: &Vec3) -> Vec3 {
        let fallback = if prior.iter().all(|v| v.is_finite()) {
            *prior
        } else {
            self.correction
        };

        let error = desired - observed;
        let feature = Self::feature(&error, prior);

        let Some(previous) = self.pending.replace(feature.clone()) else {
            self.correction = fallback;
            return fallback;
        };

        match self.step(previous, &error, &feature, prior) {
            Ok(correction) => {
                self.updates += 1;
                self.correction = correction;
                correction
            }
            Err(err) => {
                self.degradations += 1;
                warn!(
                    error = %err,
                    taps = self.taps.len(),
                    degradations = self.degradations,
                    "KRLS update degraded, keeping prior correction"
                );
                self.clear_window();
                self.correction = fallback;
                fallback
            }
        }
    }

    /// Feature vector [e; a]
    fn feature(error: &Vec3, correction: &Vec3) -> DVector<f64> {
        DVector::from_iterator(FEATURE_DIM, error.iter().chain(correction.iter()).copied())
    }

    fn step(
        &mut self,
        input: DVector<f64>,
        target: &Vec3,
        query: &DVector<f64>,
        prior: &Vec3,
    ) -> Result<Vec3, CoreError> {
        if !input.iter().chain(query.iter()).all(|v| v.is_finite()) {
            return Err(CoreError::NumericDegradation("non-finite input feature".into()));
        }

        let lambda = self.config.lambda;
        for t in self.targets.iter_mut() {
            *t *= lambda;
        }

        if self.taps.len() == self.config.num_taps {
            self.evict_oldest()?;
        }
        self.insert_tap(input, *target)?;
        self.check_conditioning()?;

        let y = DMatrix::from_fn(self.targets.len(), OUTPUT_DIM, |i, j| self.targets[i][j]);
        self.coefficients = &self.inverse * y;

        let k = self.kernel_row(query);
        let forecast = self.coefficients.tr_mul(&k);
        let forecast = Vec3::new(forecast[0], forecast[1], forecast[2]);

        let raw = prior * lambda + forecast * self.config.gain;
        if !raw.iter().all(|v| v.is_finite()) {
            return Err(CoreError::NumericDegradation(format!(
                "non-finite correction {raw:?}"
            )));
        }

        let bound = self.config.max_correction;
        Ok(raw.map(|v| v.clamp(-bound, bound)))
    }

    /// Grow P by one tap (block Sherman–Morrison)
    ///
    /// ```text
    /// z = P·k,  r = k(x,x) + δ - kᵀz
    /// P' = [ P + z·zᵀ/r   -z/r ]
    ///      [   -zᵀ/r       1/r ]
    /// ```
    fn insert_tap(&mut self, input: DVector<f64>, target: Vec3) -> Result<(), CoreError> {
        let n = self.taps.len();
        let delta = self.config.delta;
        let k_nn = self.kernel_value(&input, &input) + delta;

        let grown = if n == 0 {
            if !(k_nn.is_finite() && k_nn >= delta) {
                return Err(CoreError::NumericDegradation(format!(
                    "degenerate self-kernel {k_nn}"
                )));
            }
            DMatrix::from_element(1, 1, 1.0 / k_nn)
        } else {
            let k = self.kernel_row(&input);
            let z = &self.inverse * &k;
            let r = k_nn - k.dot(&z);

            // r ≥ δ in exact arithmetic
            if !(r.is_finite() && r >= 0.5 * delta) {
                return Err(CoreError::NumericDegradation(format!(
                    "schur complement {r:e} below regularization {delta:e}"
                )));
            }

            let top_left = &self.inverse + &z * z.transpose() / r;
            DMatrix::from_fn(n + 1, n + 1, |i, j| match (i < n, j < n) {
                (true, true) => top_left[(i, j)],
                (true, false) => -z[i] / r,
                (false, true) => -z[j] / r,
                (false, false) => 1.0 / r,
            })
        };

        self.inverse = grown;
        self.taps.push_back(input);
        self.targets.push_back(target);
        Ok(())
    }

    /// Drop the oldest tap and shrink P consistently
    ///
    /// With P = [e fᵀ; f G], the inverse over the remaining taps is G - f·fᵀ/e.
    fn evict_oldest(&mut self) -> Result<(), CoreError> {
        let n = self.inverse.nrows();
        let e = self.inverse[(0, 0)];
        if !(e.is_finite() && e > 0.0) {
            return Err(CoreError::NumericDegradation(format!(
                "non-positive leading inverse entry {e:e}"
            )));
        }

        let p = &self.inverse;
        let shrunk = DMatrix::from_fn(n - 1, n - 1, |i, j| {
            p[(i + 1, j + 1)] - p[(i + 1, 0)] * p[(0, j + 1)] / e
        });

        self.inverse = shrunk;
        self.taps.pop_front();
        self.targets.pop_front();
        Ok(())
    }

    /// Kernel evaluation as configured
    pub fn kernel_value(&self, u: &DVector<f64>, v: &DVector<f64>) -> f64 {
        if self.config.normalize_kernel {
            self.config.kernel.evaluate_normalized(u, v)
        } else {
            self.config.kernel.evaluate(u, v)
        }
    }

    /// Kernel row of `u` against the tap window
    fn kernel_row(&self, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(self.taps.len(), self.taps.iter().map(|t| self.kernel_value(u, t)))
    }

    /// Trace monitoring: trace(P) ≤ n/δ for a well-conditioned window
    fn check_conditioning(&self) -> Result<(), CoreError> {
        let trace = self.inverse.trace();
        let ceiling = self.taps.len() as f64 / self.config.delta * TRACE_SLACK;
        if !trace.is_finite() || trace > ceiling || trace <= 0.0 {
            return Err(CoreError::NumericDegradation(format!(
                "inverse Gram trace {trace:e} outside (0, {ceiling:e}]"
            )));
        }
        Ok(())
    }

    fn clear_window(&mut self) {
        self.taps.clear();
        self.targets.clear();
        self.inverse = DMatrix::zeros(0, 0);
        self.coefficients = DMatrix::zeros(0, OUTPUT_DIM);
        self.pending = None;
    }

    /// Forget everything learned, including the current correction
    pub fn reset(&mut self) {
        self.clear_window();
        self.correction = Vec3::zeros();
        debug!(updates = self.updates, "KRLS filter reset");
        self.updates = 0;
        self.degradations = 0;
    }

    /// Latest correction estimate [m/s²]
    pub fn correction(&self) -> Vec3 {
        self.correction
    }

    pub fn config(&self) -> &KrlsConfig {
        &self.config
    }

    /// Number of taps currently retained
    pub fn window_len(&self) -> usize {
        self.taps.len()
    }

    /// Tap inputs, oldest first
    pub fn taps(&self) -> impl Iterator<Item = &DVector<f64>> + '_ {
        self.taps.iter()
    }

    /// Recursively maintained (K + δI)⁻¹
    pub fn inverse_gram(&self) -> &DMatrix<f64> {
        &self.inverse
    }

    /// Coefficient matrix α (taps × outputs)
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Number of completed learning updates
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Number of updates that fell back to the prior correction
    pub fn degradations(&self) -> u64 {
        self.degradations
    }
}
