//! Per-column standardization (zero mean, unit population variance).

/// Column standardizer. Constant columns are centered but not rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler<const D: usize> {
    means: [f64; D],
    stds: [f64; D],
}

impl<const D: usize> StandardScaler<D> {
    pub fn fit(data: &[[f64; D]]) -> Self {
        let n = data.len().max(1) as f64;
        let mut means = [0.0; D];
        for row in data {
            for d in 0..D {
                means[d] += row[d];
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = [0.0; D];
        for row in data {
            for d in 0..D {
                stds[d] += (row[d] - means[d]).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
        }

        Self { means, stds }
    }

    /// Population standard deviation of each column as seen at fit time.
    pub fn stds(&self) -> &[f64; D] {
        &self.stds
    }

    pub fn transform(&self, data: &[[f64; D]]) -> Vec<[f64; D]> {
        data.iter()
            .map(|row| {
                let mut out = [0.0; D];
                for d in 0..D {
                    let scale = if self.stds[d] > 0.0 {
                        self.stds[d]
                    } else {
                        1.0
                    };
                    out[d] = (row[d] - self.means[d]) / scale;
                }
                out
            })
            .collect()
    }
}
