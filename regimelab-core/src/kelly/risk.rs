//! Risk banding and human-readable sizing advice.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
    VeryAggressive,
}

impl RiskLevel {
    /// Band for an applied Kelly fraction: <=25%, <=50%, <=75%, above.
    pub fn from_applied(applied: f64) -> Self {
        let pct = applied * 100.0;
        if pct <= 25.0 {
            Self::Conservative
        } else if pct <= 50.0 {
            Self::Moderate
        } else if pct <= 75.0 {
            Self::Aggressive
        } else {
            Self::VeryAggressive
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Conservative => "safe, lower growth potential",
            Self::Moderate => "optimal zone, half Kelly territory",
            Self::Aggressive => "higher risk, higher volatility",
            Self::VeryAggressive => "excessive risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "Conservative"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Aggressive => write!(f, "Aggressive"),
            Self::VeryAggressive => write!(f, "Very Aggressive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    NoEdge,
    Conservative,
    Optimal,
    AboveOptimal,
    TooAggressive,
}

impl Recommendation {
    pub fn assess(tradeable: bool, applied: f64) -> Self {
        if !tradeable || applied <= 0.0 {
            Self::NoEdge
        } else if applied > 0.75 {
            Self::TooAggressive
        } else if applied > 0.5 {
            Self::AboveOptimal
        } else if applied >= 0.25 {
            Self::Optimal
        } else {
            Self::Conservative
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::NoEdge => "No edge detected: avoid the position or wait for a better setup",
            Self::Conservative => "Conservative sizing: safe but slower growth",
            Self::Optimal => "In the optimal zone: good growth with manageable risk",
            Self::AboveOptimal => {
                "Above the optimal zone: consider half Kelly for lower volatility"
            }
            Self::TooAggressive => "Position too aggressive: reduce to the 25-50% range",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_applied(0.0), RiskLevel::Conservative);
        assert_eq!(RiskLevel::from_applied(0.25), RiskLevel::Conservative);
        assert_eq!(RiskLevel::from_applied(0.3), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_applied(0.6), RiskLevel::Aggressive);
        assert_eq!(RiskLevel::from_applied(0.9), RiskLevel::VeryAggressive);
    }

    #[test]
    fn recommendation_bands() {
        assert_eq!(Recommendation::assess(false, 0.3), Recommendation::NoEdge);
        assert_eq!(Recommendation::assess(true, 0.0), Recommendation::NoEdge);
        assert_eq!(Recommendation::assess(true, 0.1125), Recommendation::Conservative);
        assert_eq!(Recommendation::assess(true, 0.25), Recommendation::Optimal);
        assert_eq!(Recommendation::assess(true, 0.6), Recommendation::AboveOptimal);
        assert_eq!(Recommendation::assess(true, 0.8), Recommendation::TooAggressive);
    }
}
