//! Competitive Cobb-Douglas firm: factor prices implied by the interest rate.

use serde::{Deserialize, Serialize};

use crate::error::{AiyagariError, Result};

/// Interest rate and wage faced by households.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub r: f64,
    pub w: f64,
}

/// Parameters of the production function `Y = A K^alpha N^(1 - alpha)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmParams {
    /// Total factor productivity `A`.
    pub productivity: f64,
    /// Aggregate labour supply `N`.
    pub labor: f64,
    /// Capital share `alpha`, in `(0, 1)`.
    pub alpha: f64,
    /// Depreciation rate `delta`, in `(0, 1)`.
    pub delta: f64,
}

impl Default for FirmParams {
    fn default() -> Self {
        Self {
            productivity: 1.0,
            labor: 1.0,
            alpha: 0.33,
            delta: 0.05,
        }
    }
}

impl FirmParams {
    /// Checks every parameter against its admissible range.
    pub fn validate(&self) -> Result<()> {
        if !(self.productivity > 0.0) || !self.productivity.is_finite() {
            return Err(AiyagariError::invalid_parameter(
                "productivity",
                self.productivity,
                "must be finite and positive",
            ));
        }
        if !(self.labor > 0.0) || !self.labor.is_finite() {
            return Err(AiyagariError::invalid_parameter(
                "labor",
                self.labor,
                "must be finite and positive",
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AiyagariError::invalid_parameter(
                "alpha",
                self.alpha,
                "must lie in (0, 1)",
            ));
        }
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(AiyagariError::invalid_parameter(
                "delta",
                self.delta,
                "must lie in (0, 1)",
            ));
        }
        Ok(())
    }

    /// `A alpha / (r + delta)`, the capital-labour ratio raised to `1 - alpha`.
    fn capital_ratio_base(&self, r: f64, context: &'static str) -> Result<f64> {
        let user_cost = r + self.delta;
        if !(user_cost > 0.0) || !r.is_finite() {
            return Err(AiyagariError::PricingDomain {
                context,
                r,
                delta: self.delta,
            });
        }
        Ok(self.productivity * self.alpha / user_cost)
    }

    /// Wage implied by the interest rate `r`.
    pub fn wage(&self, r: f64) -> Result<f64> {
        let base = self.capital_ratio_base(r, "wage")?;
        let wage = self.productivity
            * (1.0 - self.alpha)
            * base.powf(self.alpha / (1.0 - self.alpha));
        finite(wage, "wage")
    }

    /// Capital the firm demands at interest rate `r`.
    pub fn capital_demand(&self, r: f64) -> Result<f64> {
        let base = self.capital_ratio_base(r, "capital demand")?;
        let capital = self.labor * base.powf(1.0 / (1.0 - self.alpha));
        finite(capital, "capital demand")
    }

    /// Interest rate at which the firm demands `capital`.
    pub fn interest_rate(&self, capital: f64) -> Result<f64> {
        if !(capital > 0.0) || !capital.is_finite() {
            return Err(AiyagariError::invalid_parameter(
                "capital",
                capital,
                "must be finite and positive",
            ));
        }
        let r = self.productivity * self.alpha * (self.labor / capital).powf(1.0 - self.alpha)
            - self.delta;
        finite(r, "interest rate")
    }

    /// Output produced with `capital` and the configured labour supply.
    pub fn output(&self, capital: f64) -> f64 {
        self.productivity * capital.powf(self.alpha) * self.labor.powf(1.0 - self.alpha)
    }

    /// Interest rate and the wage it implies.
    pub fn prices(&self, r: f64) -> Result<Prices> {
        Ok(Prices {
            r,
            w: self.wage(r)?,
        })
    }
}

fn finite(value: f64, context: &'static str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AiyagariError::NumericalError { context })
    }
}
