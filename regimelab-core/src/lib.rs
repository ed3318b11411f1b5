//! RegimeLab Core: regime classification, candlestick patterns, signal fusion
//! and Kelly position sizing over daily bars.
//!
//! - Domain types (bars, regimes, regime probabilities)
//! - Rolling indicators and the per-bar feature extractor
//! - Gaussian-mixture regime classifier with a moving-average fallback
//! - Rule-based pattern detector and regime/pattern signal fusion
//! - Edge-decay-adjusted fractional Kelly sizing
//! - Sharpe ratio, drawdown and rating bands over return series
//! - Market-data provider trait, reference providers and the bar cache

pub mod analysis;
pub mod clock;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod kelly;
pub mod patterns;
pub mod regime;
pub mod sharpe;
pub mod signal;

pub use analysis::{Analysis, AnalysisConfig, Analyzer};
pub use domain::{Bar, Regime, RegimeProbabilities};
pub use error::CoreError;
