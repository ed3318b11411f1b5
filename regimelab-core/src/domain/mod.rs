//! Domain types shared by every stage of the pipeline.

pub mod bar;
pub mod regime;

pub use bar::{clean_bars, Bar};
pub use regime::{Regime, RegimeProbabilities};

/// Ticker symbol.
pub type Ticker = String;
