//! Regime-transition risk discount.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Regime, RegimeProbabilities};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPolicy {
    /// Trailing regimes inspected for flips.
    pub window: usize,
    /// More flips than this inside the window means TRANSITIONING.
    pub max_flips: usize,
    /// Top-two probability spread below this means UNCERTAIN.
    pub uncertain_spread: f64,
    pub uncertain_multiplier: f64,
    pub transitioning_multiplier: f64,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            window: 10,
            max_flips: 2,
            uncertain_spread: 0.2,
            uncertain_multiplier: 0.75,
            transitioning_multiplier: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionState {
    Stable,
    Uncertain,
    Transitioning,
}

impl TransitionState {
    /// Classify from the trailing regime sequence (oldest first) and the
    /// current probability vector. Flip count is checked first.
    pub fn assess(
        recent: &[Regime],
        current: &RegimeProbabilities,
        policy: &TransitionPolicy,
    ) -> Self {
        let start = recent.len().saturating_sub(policy.window);
        if count_flips(&recent[start..]) > policy.max_flips {
            Self::Transitioning
        } else if current.top_two_spread() < policy.uncertain_spread {
            Self::Uncertain
        } else {
            Self::Stable
        }
    }

    pub fn multiplier(self, policy: &TransitionPolicy) -> f64 {
        match self {
            Self::Stable => 1.0,
            Self::Uncertain => policy.uncertain_multiplier,
            Self::Transitioning => policy.transitioning_multiplier,
        }
    }
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "STABLE"),
            Self::Uncertain => write!(f, "UNCERTAIN"),
            Self::Transitioning => write!(f, "TRANSITIONING"),
        }
    }
}

/// Number of adjacent pairs whose regimes differ.
pub fn count_flips(regimes: &[Regime]) -> usize {
    regimes.windows(2).filter(|w| w[0] != w[1]).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Regime::*;

    fn confident() -> RegimeProbabilities {
        RegimeProbabilities::from_weights([0.1, 0.1, 0.8])
    }

    #[test]
    fn steady_history_is_stable() {
        let state =
            TransitionState::assess(&[Bull; 10], &confident(), &TransitionPolicy::default());
        assert_eq!(state, TransitionState::Stable);
        assert_eq!(state.multiplier(&TransitionPolicy::default()), 1.0);
    }

    #[test]
    fn close_probabilities_are_uncertain() {
        let p = RegimeProbabilities::from_weights([0.1, 0.42, 0.48]);
        let state = TransitionState::assess(&[Bull; 10], &p, &TransitionPolicy::default());
        assert_eq!(state, TransitionState::Uncertain);
        assert_eq!(state.multiplier(&TransitionPolicy::default()), 0.75);
    }

    #[test]
    fn frequent_flips_are_transitioning() {
        let recent = [Bull, Bull, Bear, Bear, Bull, Bull, Sideways, Sideways, Bull, Bull];
        assert_eq!(count_flips(&recent), 4);
        let p = RegimeProbabilities::from_weights([0.1, 0.42, 0.48]);
        let state = TransitionState::assess(&recent, &p, &TransitionPolicy::default());
        assert_eq!(state, TransitionState::Transitioning);
        assert_eq!(state.multiplier(&TransitionPolicy::default()), 0.5);
    }

    #[test]
    fn flips_at_threshold_are_not_transitioning() {
        let recent = [Bull, Bull, Bear, Bear, Bull, Bull, Bull, Bull, Bull, Bull];
        assert_eq!(count_flips(&recent), 2);
        let state = TransitionState::assess(&recent, &confident(), &TransitionPolicy::default());
        assert_eq!(state, TransitionState::Stable);
    }

    #[test]
    fn only_the_window_counts() {
        let mut recent = vec![Bull, Bear, Bull, Bear, Bull];
        recent.extend([Bull; 10]);
        let state = TransitionState::assess(&recent, &confident(), &TransitionPolicy::default());
        assert_eq!(state, TransitionState::Stable);
    }
}
