//! Diagonal-covariance Gaussian mixture fitted by expectation-maximization.
//!
//! Initialization is k-means++ seeding followed by a few Lloyd iterations,
//! repeated over `n_init` seeded restarts; the restart with the highest
//! final log-likelihood wins. Seeds are fixed, so a given input always yields
//! the same model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use thiserror::Error;

/// Numerical failure of a mixture fit. Recovered by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("mixture fit failed: {0}")]
pub struct FitFailure(pub String);

#[derive(Debug, Clone)]
pub struct MixtureConfig {
    pub n_components: usize,
    pub max_iter: usize,
    /// Convergence threshold on the change in mean log-likelihood.
    pub tolerance: f64,
    pub n_init: usize,
    pub seed: u64,
    /// Added to every variance to keep components from collapsing.
    pub reg_variance: f64,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            n_components: 3,
            max_iter: 100,
            tolerance: 1e-3,
            n_init: 3,
            seed: 42,
            reg_variance: 1e-6,
        }
    }
}

const LLOYD_ITERATIONS: usize = 10;
const MIN_COMPONENT_MASS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct GaussianMixture<const D: usize> {
    weights: Vec<f64>,
    means: Vec<[f64; D]>,
    variances: Vec<[f64; D]>,
    /// Mean per-sample log-likelihood at the last E-step.
    log_likelihood: f64,
    iterations: usize,
    converged: bool,
}

impl<const D: usize> GaussianMixture<D> {
    pub fn fit(data: &[[f64; D]], config: &MixtureConfig) -> Result<Self, FitFailure> {
        let k = config.n_components;
        if k == 0 {
            return Err(FitFailure("zero components requested".into()));
        }
        if data.len() < 2 * k {
            return Err(FitFailure(format!(
                "{} samples is too few for {k} components",
                data.len()
            )));
        }
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(FitFailure("non-finite value in feature matrix".into()));
        }

        let mut best: Option<Self> = None;
        let mut last_err = None;
        for restart in 0..config.n_init.max(1) {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(restart as u64));
            match Self::fit_once(data, config, &mut rng) {
                Ok(model) => {
                    if best
                        .as_ref()
                        .map_or(true, |b| model.log_likelihood > b.log_likelihood)
                    {
                        best = Some(model);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }

        best.ok_or_else(|| last_err.unwrap_or_else(|| FitFailure("no restart succeeded".into())))
    }

    fn fit_once(
        data: &[[f64; D]],
        config: &MixtureConfig,
        rng: &mut StdRng,
    ) -> Result<Self, FitFailure> {
        let mut model = Self::initialize(data, config, rng)?;

        let mut prev_ll = f64::NEG_INFINITY;
        for iter in 1..=config.max_iter {
            let (resp, ll) = model.e_step(data);
            if !ll.is_finite() {
                return Err(FitFailure(format!("log-likelihood diverged at iteration {iter}")));
            }
            model.m_step(data, &resp, config.reg_variance)?;
            model.log_likelihood = ll;
            model.iterations = iter;
            if (ll - prev_ll).abs() < config.tolerance {
                model.converged = true;
                break;
            }
            prev_ll = ll;
        }

        Ok(model)
    }

    fn initialize(
        data: &[[f64; D]],
        config: &MixtureConfig,
        rng: &mut StdRng,
    ) -> Result<Self, FitFailure> {
        let k = config.n_components;
        let n = data.len();
        let mut centers = kmeans_plus_plus(data, k, rng)?;

        let mut labels = vec![0usize; n];
        for _ in 0..LLOYD_ITERATIONS {
            for (i, x) in data.iter().enumerate() {
                labels[i] = nearest(x, &centers);
            }
            for (j, center) in centers.iter_mut().enumerate() {
                let members: Vec<&[f64; D]> = data
                    .iter()
                    .zip(&labels)
                    .filter(|(_, &l)| l == j)
                    .map(|(x, _)| x)
                    .collect();
                if !members.is_empty() {
                    *center = column_means(&members);
                }
            }
        }

        let all: Vec<&[f64; D]> = data.iter().collect();
        let global_var = column_variances(&all, &column_means(&all), config.reg_variance);

        let mut weights = Vec::with_capacity(k);
        let mut variances = Vec::with_capacity(k);
        for (j, center) in centers.iter().enumerate() {
            let members: Vec<&[f64; D]> = data
                .iter()
                .zip(&labels)
                .filter(|(_, &l)| l == j)
                .map(|(x, _)| x)
                .collect();
            weights.push(members.len().max(1) as f64 / n as f64);
            variances.push(if members.len() >= 2 {
                column_variances(&members, center, config.reg_variance)
            } else {
                global_var
            });
        }
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }

        Ok(Self {
            weights,
            means: centers,
            variances,
            log_likelihood: f64::NEG_INFINITY,
            iterations: 0,
            converged: false,
        })
    }

    /// Posterior responsibilities per sample plus mean log-likelihood.
    fn e_step(&self, data: &[[f64; D]]) -> (Vec<Vec<f64>>, f64) {
        let k = self.weights.len();
        let log_weights: Vec<f64> = self.weights.iter().map(|w| w.ln()).collect();
        let mut resp = Vec::with_capacity(data.len());
        let mut total = 0.0;

        for x in data {
            let log_p: Vec<f64> = (0..k)
                .map(|j| log_weights[j] + log_gaussian(x, &self.means[j], &self.variances[j]))
                .collect();
            let max = log_p.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + log_p.iter().map(|l| (l - max).exp()).sum::<f64>().ln();
            total += lse;
            resp.push(log_p.iter().map(|l| (l - lse).exp()).collect());
        }

        (resp, total / data.len() as f64)
    }

    fn m_step(
        &mut self,
        data: &[[f64; D]],
        resp: &[Vec<f64>],
        reg_variance: f64,
    ) -> Result<(), FitFailure> {
        let n = data.len() as f64;
        for j in 0..self.weights.len() {
            let nk: f64 = resp.iter().map(|r| r[j]).sum();
            if nk < MIN_COMPONENT_MASS {
                return Err(FitFailure(format!("component {j} collapsed")));
            }

            let mut mean = [0.0; D];
            for (x, r) in data.iter().zip(resp) {
                for d in 0..D {
                    mean[d] += r[j] * x[d];
                }
            }
            for m in &mut mean {
                *m /= nk;
            }

            let mut var = [0.0; D];
            for (x, r) in data.iter().zip(resp) {
                for d in 0..D {
                    var[d] += r[j] * (x[d] - mean[d]).powi(2);
                }
            }
            for v in &mut var {
                *v = *v / nk + reg_variance;
            }

            self.weights[j] = nk / n;
            self.means[j] = mean;
            self.variances[j] = var;
        }
        Ok(())
    }

    /// Posterior probability of each component for each sample.
    pub fn predict_proba(&self, data: &[[f64; D]]) -> Vec<Vec<f64>> {
        self.e_step(data).0
    }

    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn means(&self) -> &[[f64; D]] {
        &self.means
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

fn log_gaussian<const D: usize>(x: &[f64; D], mean: &[f64; D], var: &[f64; D]) -> f64 {
    let mut acc = 0.0;
    for d in 0..D {
        acc += -0.5 * ((2.0 * PI * var[d]).ln() + (x[d] - mean[d]).powi(2) / var[d]);
    }
    acc
}

fn sq_dist<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    (0..D).map(|d| (a[d] - b[d]).powi(2)).sum()
}

fn nearest<const D: usize>(x: &[f64; D], centers: &[[f64; D]]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (j, c) in centers.iter().enumerate() {
        let d = sq_dist(x, c);
        if d < best_d {
            best = j;
            best_d = d;
        }
    }
    best
}

fn kmeans_plus_plus<const D: usize>(
    data: &[[f64; D]],
    k: usize,
    rng: &mut StdRng,
) -> Result<Vec<[f64; D]>, FitFailure> {
    let n = data.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(data[rng.gen_range(0..n)]);

    while centers.len() < k {
        let d2: Vec<f64> = data
            .iter()
            .map(|x| {
                centers
                    .iter()
                    .map(|c| sq_dist(x, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = d2.iter().sum();
        if total <= 0.0 {
            return Err(FitFailure(format!(
                "fewer than {k} distinct samples in feature matrix"
            )));
        }

        let mut target = rng.gen::<f64>() * total;
        let mut chosen = n - 1;
        for (i, &w) in d2.iter().enumerate() {
            if target < w {
                chosen = i;
                break;
            }
            target -= w;
        }
        centers.push(data[chosen]);
    }

    Ok(centers)
}

fn column_means<const D: usize>(rows: &[&[f64; D]]) -> [f64; D] {
    let mut out = [0.0; D];
    for row in rows {
        for d in 0..D {
            out[d] += row[d];
        }
    }
    let n = rows.len().max(1) as f64;
    out.map(|v| v / n)
}

fn column_variances<const D: usize>(rows: &[&[f64; D]], mean: &[f64; D], reg: f64) -> [f64; D] {
    let mut out = [0.0; D];
    for row in rows {
        for d in 0..D {
            out[d] += (row[d] - mean[d]).powi(2);
        }
    }
    let n = rows.len().max(1) as f64;
    out.map(|v| v / n + reg)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated 1-D blobs of 30 points each.
    fn blobs() -> Vec<[f64; 1]> {
        let mut data = Vec::new();
        for (center, n) in [(-5.0, 30), (0.0, 30), (5.0, 30)] {
            for i in 0..n {
                data.push([center + (i as f64 / n as f64 - 0.5) * 0.5]);
            }
        }
        data
    }

    #[test]
    fn recovers_separated_components() {
        let model = GaussianMixture::fit(&blobs(), &MixtureConfig::default()).unwrap();
        let mut means: Vec<f64> = model.means().iter().map(|m| m[0]).collect();
        means.sort_by(|a, b| a.total_cmp(b));
        assert!((means[0] + 5.0).abs() < 0.2, "{means:?}");
        assert!(means[1].abs() < 0.2, "{means:?}");
        assert!((means[2] - 5.0).abs() < 0.2, "{means:?}");
        let w_sum: f64 = model.weights().iter().sum();
        assert!((w_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn responsibilities_sum_to_one() {
        let data = blobs();
        let model = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        for row in model.predict_proba(&data) {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn fit_is_deterministic() {
        let data = blobs();
        let a = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        let b = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap();
        assert_eq!(a.means(), b.means());
        assert_eq!(a.log_likelihood(), b.log_likelihood());
    }

    #[test]
    fn identical_samples_fail() {
        let data = vec![[1.0, 2.0]; 20];
        let err = GaussianMixture::fit(&data, &MixtureConfig::default()).unwrap_err();
        assert!(err.0.contains("distinct"), "{err}");
    }

    #[test]
    fn too_few_samples_fail() {
        let data = vec![[1.0], [2.0], [3.0]];
        assert!(GaussianMixture::fit(&data, &MixtureConfig::default()).is_err());
    }
}
