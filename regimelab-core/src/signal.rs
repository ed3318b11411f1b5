//! SignalCombiner: fuses the current regime with the latest pattern.
//!
//! A conflict between regime and pattern always resolves to HOLD. Every
//! strength is capped by `round(confidence * 10)`, so the combined signal is
//! never stronger than the regime confidence alone would justify.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Regime;
use crate::patterns::{Direction, PatternEvent, PatternSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalCategory {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub category: SignalCategory,
    /// Integer in [1, 10].
    pub strength: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Pattern-frequency weight when no same-direction patterns back the
    /// current one; rises linearly to 1.0.
    pub min_pattern_weight: f64,
    /// Scale applied to the confidence strength for unconfirmed BUY/SELL.
    pub cautious_scale: f64,
    pub cautious_max: u8,
    pub conflict_strength: u8,
    pub sideways_strength: u8,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_pattern_weight: 0.7,
            cautious_scale: 0.6,
            cautious_max: 6,
            conflict_strength: 2,
            sideways_strength: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalCombiner {
    config: SignalConfig,
}

impl SignalCombiner {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Weight in [min_pattern_weight, 1] from the share of recent patterns
    /// agreeing with `direction`.
    pub fn pattern_weight(&self, summary: Option<&PatternSummary>, direction: Direction) -> f64 {
        let floor = self.config.min_pattern_weight.clamp(0.0, 1.0);
        let share = summary.map_or(0.0, |s| s.share(direction));
        floor + (1.0 - floor) * share.clamp(0.0, 1.0)
    }

    /// Pure fusion of (regime, confidence, pattern). `pattern_weight` only
    /// affects confirmed signals.
    pub fn combine(
        &self,
        regime: Regime,
        confidence: f64,
        pattern: Option<&PatternEvent>,
        pattern_weight: f64,
    ) -> Signal {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cap = confidence_cap(confidence);
        let capped = |s: f64| -> u8 { (s.round().max(1.0) as u8).min(cap) };

        let regime_direction = match regime {
            Regime::Bull => Direction::Bullish,
            Regime::Bear => Direction::Bearish,
            Regime::Sideways => {
                return Signal {
                    category: SignalCategory::Hold,
                    strength: self.config.sideways_strength.clamp(1, cap),
                    reasoning: "sideways market detected".into(),
                };
            }
        };

        match pattern {
            Some(event) if event.direction == regime_direction => {
                let weight = pattern_weight.clamp(0.0, 1.0);
                Signal {
                    category: match regime_direction {
                        Direction::Bullish => SignalCategory::StrongBuy,
                        Direction::Bearish => SignalCategory::StrongSell,
                    },
                    strength: capped(10.0 * confidence * weight),
                    reasoning: format!("{regime} regime confirmed by {} pattern", event.kind),
                }
            }
            Some(event) => Signal {
                category: SignalCategory::Hold,
                strength: self.config.conflict_strength.clamp(1, cap),
                reasoning: format!(
                    "pattern conflict with regime: {regime} regime vs {} {}",
                    event.direction, event.kind
                ),
            },
            None => {
                let raw = (10.0 * confidence * self.config.cautious_scale)
                    .min(f64::from(self.config.cautious_max));
                Signal {
                    category: match regime_direction {
                        Direction::Bullish => SignalCategory::Buy,
                        Direction::Bearish => SignalCategory::Sell,
                    },
                    strength: capped(raw),
                    reasoning: format!("{regime} regime without pattern confirmation"),
                }
            }
        }
    }
}

/// Highest strength a given regime confidence can justify.
pub fn confidence_cap(confidence: f64) -> u8 {
    ((confidence.clamp(0.0, 1.0) * 10.0).round() as u8).clamp(1, 10)
}
