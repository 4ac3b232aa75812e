//! Poisson model of variant burden.
//!
//! Burdens are pathogenicity-weighted allele counts and therefore real-valued;
//! the density is evaluated as `x·ln λ − λ − lnΓ(x + 1)` and only exponentiated
//! at the end.

use statrs::function::gamma::ln_gamma;
use thiserror::Error;

use lirical_common::error::LiricalError;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PoissonError {
    #[error("Poisson mean {0} is negative")]
    NegativeMean(f64),

    #[error("Poisson mean {0} is not finite")]
    NonFiniteMean(f64),

    #[error("Observed count {0} is not finite")]
    NonFiniteCount(f64),
}

impl From<PoissonError> for LiricalError {
    fn from(err: PoissonError) -> Self {
        LiricalError::NumericDomain(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonDistribution {
    lambda: f64,
}

impl PoissonDistribution {
    pub fn new(lambda: f64) -> Result<Self, PoissonError> {
        if !lambda.is_finite() {
            return Err(PoissonError::NonFiniteMean(lambda));
        }
        if lambda < 0.0 {
            return Err(PoissonError::NegativeMean(lambda));
        }
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Natural log of P(X = x). Impossible observations give `-inf`.
    pub fn ln_probability(&self, x: f64) -> Result<f64, PoissonError> {
        if !x.is_finite() {
            return Err(PoissonError::NonFiniteCount(x));
        }
        if x < 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        if x == 0.0 {
            return Ok(-self.lambda);
        }
        if self.lambda == 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(x * self.lambda.ln() - self.lambda - ln_gamma(x + 1.0))
    }

    /// P(X = x), always in [0, 1].
    pub fn probability(&self, x: f64) -> Result<f64, PoissonError> {
        let ln_p = self.ln_probability(x)?;
        Ok(ln_p.exp().clamp(0.0, 1.0))
    }
}
