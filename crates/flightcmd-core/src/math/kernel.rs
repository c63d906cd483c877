//! Reproducing kernels
//!
//! Kernel families available to the KRLS estimator. The polynomial kernel
//! (c + ⟨u,v⟩)^d is the default; the others share the same interface.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kernel function family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kernel {
    /// k(u, v) = (c + ⟨u,v⟩)^d
    Polynomial { c: f64, degree: i32 },
    /// k(u, v) = exp(-‖u - v‖² / (2σ²))
    Gaussian { sigma: f64 },
    /// k(u, v) = ⟨u,v⟩
    Linear,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::Polynomial { c: 1.0, degree: 5 }
    }
}

impl Kernel {
    /// Check the kernel parameters
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Kernel::Polynomial { c, degree } => {
                if !c.is_finite() || c < 0.0 {
                    return Err(CoreError::config(format!(
                        "polynomial kernel constant must be finite and non-negative, got {c}"
                    )));
                }
                if degree < 1 {
                    return Err(CoreError::config(format!(
                        "polynomial kernel degree must be at least 1, got {degree}"
                    )));
                }
                Ok(())
            }
            Kernel::Gaussian { sigma } => {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(CoreError::config(format!(
                        "gaussian kernel width must be positive, got {sigma}"
                    )));
                }
                Ok(())
            }
            Kernel::Linear => Ok(()),
        }
    }

    /// Evaluate k(u, v)
    pub fn evaluate(&self, u: &DVector<f64>, v: &DVector<f64>) -> f64 {
        match *self {
            Kernel::Polynomial { c, degree } => (c + u.dot(v)).powi(degree),
            Kernel::Gaussian { sigma } => {
                let dist_sq = (u - v).norm_squared();
                (-dist_sq / (2.0 * sigma * sigma)).exp()
            }
            Kernel::Linear => u.dot(v),
        }
    }

    /// Cosine-normalized value k(u,v) / √(k(u,u)·k(v,v))
    ///
    /// Keeps the Gram diagonal at one whatever the input magnitudes. Pairs
    /// involving a vector with a non-positive self-kernel evaluate to zero.
    pub fn evaluate_normalized(&self, u: &DVector<f64>, v: &DVector<f64>) -> f64 {
        if let Kernel::Gaussian { .. } = self {
            return self.evaluate(u, v);
        }
        let norm = self.evaluate(u, u) * self.evaluate(v, v);
        if norm > 0.0 {
            self.evaluate(u, v) / norm.sqrt()
        } else {
            0.0
        }
    }
}
