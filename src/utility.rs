//! Period utility of consumption.

use serde::{Deserialize, Serialize};

use crate::error::{AiyagariError, Result};

/// Strictly increasing, concave utility over consumption `c > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Utility {
    /// `u(c) = ln c`.
    Log,
    /// `u(c) = (c^(1 - sigma) - 1) / (1 - sigma)` for relative risk aversion `sigma != 1`.
    Crra { sigma: f64 },
}

impl Default for Utility {
    fn default() -> Self {
        Utility::Log
    }
}

impl Utility {
    /// Builds a CRRA utility after validating `sigma`.
    pub fn crra(sigma: f64) -> Result<Self> {
        let utility = Utility::Crra { sigma };
        utility.validate()?;
        Ok(utility)
    }

    /// Rejects negative or non-finite risk aversion, and `sigma = 1` which is [`Utility::Log`].
    pub fn validate(&self) -> Result<()> {
        match *self {
            Utility::Log => Ok(()),
            Utility::Crra { sigma } => {
                if !sigma.is_finite() || sigma < 0.0 {
                    return Err(AiyagariError::invalid_parameter(
                        "sigma",
                        sigma,
                        "risk aversion must be finite and non-negative",
                    ));
                }
                if sigma == 1.0 {
                    return Err(AiyagariError::invalid_parameter(
                        "sigma",
                        sigma,
                        "unit risk aversion is the log case; use Utility::Log",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Relative risk aversion.
    pub fn risk_aversion(&self) -> f64 {
        match *self {
            Utility::Log => 1.0,
            Utility::Crra { sigma } => sigma,
        }
    }

    /// Utility of consumption `c`; callers only pass `c > 0`.
    ///
    /// With large `sigma` a tiny positive `c` overflows the CRRA branch to
    /// `-inf`; [`crate::arrays::RewardArray::refill`] reports that as an error.
    #[inline]
    pub fn value(&self, c: f64) -> f64 {
        match *self {
            Utility::Log => c.ln(),
            Utility::Crra { sigma } => (c.powf(1.0 - sigma) - 1.0) / (1.0 - sigma),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crra_approaches_log_near_unit_risk_aversion() {
        let near_log = Utility::crra(1.0 + 1e-7).unwrap();
        assert_relative_eq!(near_log.value(2.5), 2.5_f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn negative_risk_aversion_is_a_configuration_error() {
        assert!(matches!(
            Utility::crra(-0.5),
            Err(AiyagariError::InvalidParameter { name: "sigma", .. })
        ));
        assert!(Utility::crra(1.0).is_err());
    }

    #[test]
    fn utility_is_increasing_and_concave() {
        for utility in [Utility::Log, Utility::crra(2.0).unwrap(), Utility::crra(0.5).unwrap()] {
            let (a, b, c) = (utility.value(0.5), utility.value(1.0), utility.value(1.5));
            assert!(a < b && b < c);
            assert!(b - a > c - b);
        }
    }
}
