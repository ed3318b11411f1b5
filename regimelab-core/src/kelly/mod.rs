//! KellyEngine: regime-aware fractional Kelly position sizing.
//!
//! # Pipeline
//! ```text
//! p        = sum_r P(r) * win_rate(r)
//! b        = avg_gain(Bull) / avg_loss(Bear)
//! f*       = clamp((p*b - q) / b, 0, cap)
//! gross    = f* * avg_gain * holding_days
//! decayed  = gross * exp(-decay_rate * holding_days)
//! net      = decayed - costs
//! applied  = clamp(f* * transition_multiplier * fraction, 0, f*)   (0 if net <= 0)
//! position = portfolio_value * applied
//! ```

pub mod costs;
pub mod risk;
pub mod transition;

pub use costs::{CostEstimate, CostModel, MarketSnapshot};
pub use risk::{Recommendation, RiskLevel};
pub use transition::{TransitionPolicy, TransitionState};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Regime;
use crate::error::CoreError;
use crate::regime::RegimeFit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Hard ceiling on the full Kelly fraction.
    pub cap: f64,
    /// Edge decay per day of holding.
    pub decay_rate: f64,
    /// Fewest regime assignments accepted for sizing.
    pub min_history: usize,
    /// Bars used for the spread/volume snapshot.
    pub cost_lookback: usize,
    pub transition: TransitionPolicy,
    pub costs: CostModel,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            cap: 0.5,
            decay_rate: 0.15,
            min_history: 10,
            cost_lookback: 20,
            transition: TransitionPolicy::default(),
            costs: CostModel::default(),
        }
    }
}

/// Caller-side sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingRequest {
    pub portfolio_value: f64,
    /// Stop-loss distance as a fraction of price (0.05 = 5%).
    pub stop_loss: f64,
    /// Fractional Kelly multiplier in (0, 1].
    pub fraction: f64,
    pub holding_days: u32,
}

impl Default for SizingRequest {
    fn default() -> Self {
        Self {
            portfolio_value: 100_000.0,
            stop_loss: 0.05,
            fraction: 0.5,
            holding_days: 5,
        }
    }
}

impl SizingRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.portfolio_value.is_finite() && self.portfolio_value > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "portfolio value must be positive, got {}",
                self.portfolio_value
            )));
        }
        if !(self.stop_loss > 0.0 && self.stop_loss < 1.0) {
            return Err(CoreError::InvalidInput(format!(
                "stop loss must be in (0, 1), got {}",
                self.stop_loss
            )));
        }
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(CoreError::InvalidInput(format!(
                "Kelly fraction multiplier must be in (0, 1], got {}",
                self.fraction
            )));
        }
        if self.holding_days == 0 {
            return Err(CoreError::InvalidInput(
                "holding period must be at least one day".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyResult {
    pub win_probability: f64,
    /// `None` when either conditional average is zero.
    pub win_loss_ratio: Option<f64>,
    pub full_fraction: f64,
    pub transition: TransitionState,
    pub transition_multiplier: f64,
    pub gross_edge: f64,
    pub decayed_edge: f64,
    pub costs: CostEstimate,
    pub net_edge: f64,
    pub applied_fraction: f64,
    pub position_value: f64,
    pub shares: u64,
    pub stop_price: f64,
    pub tradeable: bool,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
}

/// `f* = (p*b - q) / b`, clamped to [0, cap]. Zero when `b` is undefined.
pub fn kelly_fraction(win_probability: f64, win_loss_ratio: Option<f64>, cap: f64) -> f64 {
    let b = match win_loss_ratio {
        Some(b) if b.is_finite() && b > 0.0 => b,
        _ => return 0.0,
    };
    let p = win_probability.clamp(0.0, 1.0);
    let f = (p * b - (1.0 - p)) / b;
    if f.is_finite() {
        f.clamp(0.0, cap.max(0.0))
    } else {
        0.0
    }
}

/// Full fraction discounted by the transition multiplier and the caller's
/// fractional multiplier, re-clamped to [0, min(full, cap)].
pub fn applied_fraction(full: f64, transition_multiplier: f64, fraction: f64, cap: f64) -> f64 {
    let upper = full.min(cap).max(0.0);
    (full * transition_multiplier * fraction).clamp(0.0, upper)
}

#[derive(Debug, Clone, Default)]
pub struct KellyEngine {
    config: KellyConfig,
}

impl KellyEngine {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Size a long position from a regime fit.
    pub fn size(
        &self,
        fit: &RegimeFit,
        market: &MarketSnapshot,
        request: &SizingRequest,
    ) -> Result<KellyResult, CoreError> {
        request.validate()?;
        validate_market(market)?;
        if fit.len() < self.config.min_history {
            return Err(CoreError::insufficient(
                "Kelly sizing",
                self.config.min_history,
                fit.len(),
            ));
        }

        let current = fit.current();
        let stats = fit.stats();
        let win_probability: f64 = Regime::ALL
            .iter()
            .map(|r| current.probabilities.get(*r) * stats.get(*r).win_rate)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let avg_gain = stats.get(Regime::Bull).avg_gain;
        let avg_loss = stats.get(Regime::Bear).avg_loss;
        let win_loss_ratio = ratio(avg_gain, avg_loss);

        let transition = TransitionState::assess(
            &fit.recent_regimes(self.config.transition.window),
            &current.probabilities,
            &self.config.transition,
        );

        Ok(self.finish(
            win_probability,
            win_loss_ratio,
            avg_gain,
            transition,
            market,
            request,
        ))
    }

    /// Size from caller-supplied statistics instead of a regime fit.
    /// `avg_win` and `avg_loss` are positive return magnitudes.
    pub fn size_manual(
        &self,
        win_probability: f64,
        avg_win: f64,
        avg_loss: f64,
        transition: TransitionState,
        market: &MarketSnapshot,
        request: &SizingRequest,
    ) -> Result<KellyResult, CoreError> {
        request.validate()?;
        validate_market(market)?;
        if !(0.0..=1.0).contains(&win_probability) {
            return Err(CoreError::InvalidInput(format!(
                "win probability must be in [0, 1], got {win_probability}"
            )));
        }
        if !(avg_win >= 0.0 && avg_loss >= 0.0) {
            return Err(CoreError::InvalidInput(
                "average win and loss must be non-negative".into(),
            ));
        }

        Ok(self.finish(
            win_probability,
            ratio(avg_win, avg_loss),
            avg_win,
            transition,
            market,
            request,
        ))
    }

    fn finish(
        &self,
        win_probability: f64,
        win_loss_ratio: Option<f64>,
        avg_gain: f64,
        transition: TransitionState,
        market: &MarketSnapshot,
        request: &SizingRequest,
    ) -> KellyResult {
        let cap = self.config.cap;
        let full = kelly_fraction(win_probability, win_loss_ratio, cap);
        let multiplier = transition.multiplier(&self.config.transition);
        let candidate = applied_fraction(full, multiplier, request.fraction, cap);

        // impact is estimated on the size we would take before the edge check
        let costs = self
            .config
            .costs
            .estimate(market, request.portfolio_value * candidate);

        let days = f64::from(request.holding_days);
        let gross_edge = full * avg_gain * days;
        let decayed_edge = gross_edge * (-self.config.decay_rate * days).exp();
        let net_edge = decayed_edge - costs.total;

        let tradeable = full > 0.0 && net_edge > 0.0;
        let applied = if tradeable { candidate } else { 0.0 };
        let position_value = request.portfolio_value * applied;
        let shares = (position_value / market.price).floor().max(0.0) as u64;

        debug!(
            win_probability,
            full, applied, net_edge, %transition, "kelly sizing"
        );

        KellyResult {
            win_probability,
            win_loss_ratio,
            full_fraction: full,
            transition,
            transition_multiplier: multiplier,
            gross_edge,
            decayed_edge,
            costs,
            net_edge,
            applied_fraction: applied,
            position_value,
            shares,
            stop_price: market.price * (1.0 - request.stop_loss),
            tradeable,
            risk_level: RiskLevel::from_applied(applied),
            recommendation: Recommendation::assess(tradeable, applied),
        }
    }
}

fn ratio(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_gain > 0.0 && avg_loss > 0.0 && avg_gain.is_finite() && avg_loss.is_finite() {
        Some(avg_gain / avg_loss)
    } else {
        None
    }
}

fn validate_market(market: &MarketSnapshot) -> Result<(), CoreError> {
    if market.price.is_finite() && market.price > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!(
            "price must be positive, got {}",
            market.price
        )))
    }
}
