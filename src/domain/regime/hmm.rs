//! Gaussian hidden Markov model with full per-state covariance.
//!
//! Fitting is expectation-maximisation (Baum-Welch) in log space, seeded by a
//! deterministic k-means initialisation. Decoding is Viterbi.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::gaussian::{weighted_moments, MultivariateGaussian};
use crate::domain::error::RegimeTraderError;

const KMEANS_MAX_ITER: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct HmmConfig {
    pub n_states: usize,
    pub n_iter: usize,
    pub tol: f64,
    pub min_covar: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianHmm {
    pub start_probs: Array1<f64>,
    pub transitions: Array2<f64>,
    pub emissions: Vec<MultivariateGaussian>,
}

impl GaussianHmm {
    pub fn n_states(&self) -> usize {
        self.start_probs.len()
    }

    /// Fit a model to the rows of `observations`.
    ///
    /// Stops once the log-likelihood gain drops below `tol` or after `n_iter`
    /// iterations, whichever comes first. Hitting the iteration cap is not an
    /// error; the parameters reached so far are returned.
    pub fn fit(
        observations: &Array2<f64>,
        config: &HmmConfig,
    ) -> Result<(Self, FitReport), RegimeTraderError> {
        let n = observations.nrows();
        let k = config.n_states;
        if k == 0 || n < k {
            return Err(RegimeTraderError::InvalidInput {
                reason: format!("cannot fit {} states to {} observations", k, n),
            });
        }

        let mut model = Self::initialise(observations, config)?;
        let mut prev_ll = f64::NEG_INFINITY;
        let mut report = FitReport {
            log_likelihood: f64::NEG_INFINITY,
            iterations: 0,
            converged: false,
        };

        for iter in 0..config.n_iter {
            let log_b = model.log_emissions(observations);
            let pass = forward_backward(&log_b, &model.start_probs, &model.transitions);
            model.maximise(observations, &pass, config.min_covar);

            report.log_likelihood = pass.log_likelihood;
            report.iterations = iter + 1;

            if iter > 0 && pass.log_likelihood - prev_ll < config.tol {
                report.converged = true;
                break;
            }
            if (iter + 1) % 50 == 0 {
                tracing::debug!(
                    "EM iteration {}: log-likelihood = {:.4}",
                    iter + 1,
                    pass.log_likelihood
                );
            }
            prev_ll = pass.log_likelihood;
        }

        Ok((model, report))
    }

    /// Most likely state sequence for `observations`.
    pub fn decode(&self, observations: &Array2<f64>) -> Vec<usize> {
        let log_b = self.log_emissions(observations);
        viterbi(&log_b, &self.start_probs, &self.transitions)
    }

    fn initialise(
        observations: &Array2<f64>,
        config: &HmmConfig,
    ) -> Result<Self, RegimeTraderError> {
        let k = config.n_states;
        let n = observations.nrows();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let centers = kmeans(observations, k, &mut rng);

        let uniform = Array1::from_elem(n, 1.0);
        let (_, biased) = weighted_moments(observations.view(), uniform.view(), 0.0)
            .ok_or_else(|| RegimeTraderError::InvalidInput {
                reason: "no observations to initialise regime model".into(),
            })?;
        // shared starting covariance: unbiased estimate plus the floor
        let scale = if n > 1 { n as f64 / (n - 1) as f64 } else { 1.0 };
        let pooled = biased * scale + Array2::<f64>::eye(observations.ncols()) * config.min_covar;

        let emissions = centers
            .into_iter()
            .map(|mean| {
                MultivariateGaussian::new(mean, pooled.clone()).ok_or_else(|| {
                    RegimeTraderError::InvalidInput {
                        reason: "feature covariance is not positive definite".into(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            start_probs: Array1::from_elem(k, 1.0 / k as f64),
            transitions: Array2::from_elem((k, k), 1.0 / k as f64),
            emissions,
        })
    }

    fn log_emissions(&self, observations: &Array2<f64>) -> Array2<f64> {
        let n = observations.nrows();
        let k = self.n_states();
        let mut log_b = Array2::<f64>::zeros((n, k));
        for (t, row) in observations.axis_iter(Axis(0)).enumerate() {
            for (j, emission) in self.emissions.iter().enumerate() {
                log_b[[t, j]] = emission.log_pdf(row);
            }
        }
        log_b
    }

    fn maximise(&mut self, observations: &Array2<f64>, pass: &ForwardBackward, min_covar: f64) {
        let k = self.n_states();

        let start = pass.gamma.row(0).to_owned();
        let start_sum = start.sum();
        if start_sum > 0.0 {
            self.start_probs = start / start_sum;
        }

        for i in 0..k {
            let row_sum = pass.xi_sum.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..k {
                    self.transitions[[i, j]] = pass.xi_sum[[i, j]] / row_sum;
                }
            }
        }

        for j in 0..k {
            let weights = pass.gamma.column(j);
            if let Some((mean, cov)) = weighted_moments(observations.view(), weights, min_covar) {
                // a state that lost all its mass keeps its previous emission
                if let Some(emission) = MultivariateGaussian::new(mean, cov) {
                    self.emissions[j] = emission;
                }
            }
        }
    }
}

struct ForwardBackward {
    gamma: Array2<f64>,
    xi_sum: Array2<f64>,
    log_likelihood: f64,
}

fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn forward_backward(
    log_b: &Array2<f64>,
    start_probs: &Array1<f64>,
    transitions: &Array2<f64>,
) -> ForwardBackward {
    let (t_len, k) = log_b.dim();
    let log_start = start_probs.mapv(f64::ln);
    let log_trans = transitions.mapv(f64::ln);

    let mut log_alpha = Array2::<f64>::zeros((t_len, k));
    for j in 0..k {
        log_alpha[[0, j]] = log_start[j] + log_b[[0, j]];
    }
    for t in 1..t_len {
        for j in 0..k {
            let prev = log_alpha.row(t - 1);
            let lse = log_sum_exp((0..k).map(|i| prev[i] + log_trans[[i, j]]));
            log_alpha[[t, j]] = lse + log_b[[t, j]];
        }
    }
    let last = log_alpha.row(t_len - 1);
    let log_likelihood = log_sum_exp(last.iter().copied());

    let mut log_beta = Array2::<f64>::zeros((t_len, k));
    for t in (0..t_len - 1).rev() {
        for i in 0..k {
            log_beta[[t, i]] = log_sum_exp(
                (0..k).map(|j| log_trans[[i, j]] + log_b[[t + 1, j]] + log_beta[[t + 1, j]]),
            );
        }
    }

    let mut gamma = Array2::<f64>::zeros((t_len, k));
    for t in 0..t_len {
        for j in 0..k {
            gamma[[t, j]] = (log_alpha[[t, j]] + log_beta[[t, j]] - log_likelihood).exp();
        }
    }

    let mut xi_sum = Array2::<f64>::zeros((k, k));
    for t in 0..t_len.saturating_sub(1) {
        for i in 0..k {
            for j in 0..k {
                let log_xi = log_alpha[[t, i]]
                    + log_trans[[i, j]]
                    + log_b[[t + 1, j]]
                    + log_beta[[t + 1, j]]
                    - log_likelihood;
                xi_sum[[i, j]] += log_xi.exp();
            }
        }
    }

    ForwardBackward {
        gamma,
        xi_sum,
        log_likelihood,
    }
}

fn viterbi(
    log_b: &Array2<f64>,
    start_probs: &Array1<f64>,
    transitions: &Array2<f64>,
) -> Vec<usize> {
    let (t_len, k) = log_b.dim();
    if t_len == 0 {
        return Vec::new();
    }
    let log_start = start_probs.mapv(f64::ln);
    let log_trans = transitions.mapv(f64::ln);

    let mut delta = Array2::<f64>::zeros((t_len, k));
    let mut psi = Array2::<usize>::zeros((t_len, k));
    for j in 0..k {
        delta[[0, j]] = log_start[j] + log_b[[0, j]];
    }

    for t in 1..t_len {
        for j in 0..k {
            let mut best_val = f64::NEG_INFINITY;
            let mut best_state = 0;
            for i in 0..k {
                let val = delta[[t - 1, i]] + log_trans[[i, j]];
                if val > best_val {
                    best_val = val;
                    best_state = i;
                }
            }
            delta[[t, j]] = best_val + log_b[[t, j]];
            psi[[t, j]] = best_state;
        }
    }

    let mut path = vec![0; t_len];
    let mut best_final = f64::NEG_INFINITY;
    for j in 0..k {
        if delta[[t_len - 1, j]] > best_final {
            best_final = delta[[t_len - 1, j]];
            path[t_len - 1] = j;
        }
    }
    for t in (0..t_len - 1).rev() {
        path[t] = psi[[t + 1, path[t + 1]]];
    }
    path
}

/// k-means++ seeding followed by Lloyd iterations.
fn kmeans(observations: &Array2<f64>, k: usize, rng: &mut StdRng) -> Vec<Array1<f64>> {
    let n = observations.nrows();
    let sq_dist = |a: &Array1<f64>, t: usize| -> f64 {
        observations
            .row(t)
            .iter()
            .zip(a.iter())
            .map(|(x, c)| (x - c).powi(2))
            .sum()
    };

    let mut centers: Vec<Array1<f64>> = vec![observations.row(rng.gen_range(0..n)).to_owned()];
    while centers.len() < k {
        let d2: Vec<f64> = (0..n)
            .map(|t| {
                centers
                    .iter()
                    .map(|c| sq_dist(c, t))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = d2.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen_range(0.0..1.0) * total;
            let mut acc = 0.0;
            d2.iter()
                .position(|d| {
                    acc += d;
                    acc >= target
                })
                .unwrap_or(n - 1)
        } else {
            rng.gen_range(0..n)
        };
        centers.push(observations.row(pick).to_owned());
    }

    let mut assignments = vec![usize::MAX; n];
    for _ in 0..KMEANS_MAX_ITER {
        let mut changed = false;
        for (t, slot) in assignments.iter_mut().enumerate() {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, c) in centers.iter().enumerate() {
                let d = sq_dist(c, t);
                if d < best_dist {
                    best_dist = d;
                    best = j;
                }
            }
            if *slot != best {
                *slot = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (j, center) in centers.iter_mut().enumerate() {
            let members: Vec<usize> = (0..n).filter(|&t| assignments[t] == j).collect();
            if members.is_empty() {
                continue;
            }
            let mut sum = Array1::<f64>::zeros(observations.ncols());
            for &t in &members {
                sum += &observations.row(t);
            }
            *center = sum / members.len() as f64;
        }
    }
    centers
}
