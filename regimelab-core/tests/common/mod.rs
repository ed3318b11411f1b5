//! Synthetic bar series shared by the integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regimelab_core::Bar;

/// Random walk that cycles through rally, chop and selloff phases of
/// `phase_len` bars each.
pub fn regime_switching_bars(n: usize, phase_len: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut close: f64 = 100.0;
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let noise: f64 = rng.gen_range(-1.0..1.0);
        let (drift, vol, volume) = match (i / phase_len.max(1)) % 3 {
            0 => (0.010, 0.004, 1_000_000),
            1 => (0.0, 0.006, 800_000),
            _ => (-0.014, 0.015, 2_000_000),
        };
        let open = close;
        close = (close * (1.0 + drift + vol * noise)).max(1.0);
        let wick: f64 = rng.gen_range(0.001..0.01);
        bars.push(Bar::new(
            start + Duration::days(i as i64),
            open,
            open.max(close) * (1.0 + wick),
            open.min(close) * (1.0 - wick),
            close,
            volume + rng.gen_range(0..200_000),
        ));
    }
    bars
}

pub fn linear_bars(n: usize, start_price: f64, step: f64) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = start_price + step * i as f64;
            let open = if i == 0 { close } else { close - step };
            Bar::new(
                start + Duration::days(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                500_000,
            )
        })
        .collect()
}
