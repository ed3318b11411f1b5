//! Regime — the three ordered market states and their probability vector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market regime, ordered from lowest to highest mean return.
///
/// The derive order matters: `Bear < Sideways < Bull`, and `index()` matches
/// the position in `Regime::ALL` and in `RegimeProbabilities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Regime {
    Bear,
    #[serde(alias = "Neutral")]
    Sideways,
    Bull,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Bear, Regime::Sideways, Regime::Bull];

    pub fn index(self) -> usize {
        match self {
            Regime::Bear => 0,
            Regime::Sideways => 1,
            Regime::Bull => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Bear => "Bear",
            Regime::Sideways => "Sideways",
            Regime::Bull => "Bull",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bear" => Ok(Regime::Bear),
            "sideways" | "neutral" => Ok(Regime::Sideways),
            "bull" => Ok(Regime::Bull),
            other => Err(format!("unknown regime '{other}'")),
        }
    }
}

/// Tolerance for the sum-to-one invariant.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

/// Probability over the three regimes, indexed by `Regime::index()`.
///
/// Always normalized: constructors rescale so the entries sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeProbabilities([f64; 3]);

impl RegimeProbabilities {
    /// Build from raw non-negative weights. Falls back to uniform when the
    /// weights are all zero or not finite.
    pub fn from_weights(weights: [f64; 3]) -> Self {
        let clean = weights.map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
        let total: f64 = clean.iter().sum();
        if total <= 0.0 {
            return Self::uniform();
        }
        Self(clean.map(|w| w / total))
    }

    pub fn uniform() -> Self {
        Self([1.0 / 3.0; 3])
    }

    /// All mass on `regime` except `1 - confidence` split evenly across the rest.
    pub fn concentrated(regime: Regime, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let rest = (1.0 - confidence) / 2.0;
        let mut p = [rest; 3];
        p[regime.index()] = confidence;
        Self::from_weights(p)
    }

    pub fn get(&self, regime: Regime) -> f64 {
        self.0[regime.index()]
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Most probable regime. Ties resolve toward the more neutral/bearish state.
    pub fn most_likely(&self) -> Regime {
        let mut best = Regime::Sideways;
        let mut best_p = self.get(Regime::Sideways);
        for regime in [Regime::Bear, Regime::Bull] {
            if self.get(regime) > best_p {
                best = regime;
                best_p = self.get(regime);
            }
        }
        best
    }

    /// Gap between the largest and second-largest probability.
    pub fn top_two_spread(&self) -> f64 {
        let mut sorted = self.0;
        sorted.sort_by(|a, b| b.total_cmp(a));
        sorted[0] - sorted[1]
    }
}
