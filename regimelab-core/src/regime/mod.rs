//! RegimeClassifier: three ordered market regimes from a bar series.
//!
//! Primary path is a diagonal Gaussian mixture over standardized features,
//! relabeled after every fit by ascending mean return. When the fit is not
//! possible the moving-average rule takes over with confidence 0.5.

pub mod classifier;
pub mod fallback;
pub mod mixture;
pub mod scaler;
pub mod stats;

pub use classifier::{
    ClassifierConfig, FallbackReason, FitMethod, RegimeAssignment, RegimeClassifier, RegimeFit,
};
pub use fallback::MovingAverageRule;
pub use stats::{RegimeStats, RegimeStatsTable};
