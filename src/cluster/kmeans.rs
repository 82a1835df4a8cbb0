use super::{nearest_center, squared_euclidean, validate_input};
use crate::error::{Error, Result};
use crate::metrics::inertia;
use crate::{Labels, Matrix, Vector};
use ndarray::Axis;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// K-Means with greedy k-means++ seeding and `n_init` restarts.
///
/// A cluster that loses all its points is re-seeded with the sample farthest
/// from its centroid. When the data has fewer distinct points than
/// `n_clusters` some ids can still end up unused.
#[derive(Clone, Debug)]
pub struct KMeans {
    pub cluster_centers: Option<Matrix>,
    pub labels: Option<Labels>,
    pub inertia: Option<f64>,
    pub n_iter: Option<usize>,
    n_clusters: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    random_state: Option<u64>,
}

struct Run {
    centers: Matrix,
    labels: Labels,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        if n_clusters == 0 {
            panic!("n_clusters must be > 0, got {}", n_clusters);
        }

        Self {
            cluster_centers: None,
            labels: None,
            inertia: None,
            n_iter: None,
            n_clusters,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            random_state: None,
        }
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        if n_init == 0 {
            panic!("n_init must be > 0, got {}", n_init);
        }
        self.n_init = n_init;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Fits with a generator seeded from `random_state` (0 when unset).
    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        self.fit_with_rng(x, &mut rng)
    }

    /// Runs `n_init` restarts drawing from `rng` and keeps the one with the
    /// lowest inertia.
    pub fn fit_with_rng<R: Rng + ?Sized>(&mut self, x: &Matrix, rng: &mut R) -> Result<()> {
        validate_input(x)?;

        if x.nrows() < self.n_clusters {
            return Err(Error::TooFewSamples {
                n_samples: x.nrows(),
                n_clusters: self.n_clusters,
            });
        }

        let tol = self.scaled_tolerance(x);
        let mut best: Option<Run> = None;

        for run_idx in 0..self.n_init {
            let run = self.single_run(x, tol, rng)?;
            debug!(run = run_idx, inertia = run.inertia, n_iter = run.n_iter, "k-means restart finished");

            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let best = best.ok_or(Error::NotFitted("KMeans"))?;
        info!(inertia = best.inertia, n_iter = best.n_iter, "k-means fitted");

        self.cluster_centers = Some(best.centers);
        self.labels = Some(best.labels);
        self.inertia = Some(best.inertia);
        self.n_iter = Some(best.n_iter);

        Ok(())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Labels> {
        let centroids = self.fitted_centers(x)?;

        Ok(x.axis_iter(Axis(0))
            .map(|row| nearest_center(&row, centroids).0)
            .collect())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<Labels> {
        self.fit(x)?;
        self.labels.clone().ok_or(Error::NotFitted("KMeans"))
    }

    /// Euclidean distance from every sample to every centroid.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let centroids = self.fitted_centers(x)?;

        let mut distances = Matrix::zeros((x.nrows(), self.n_clusters));
        for i in 0..x.nrows() {
            for k in 0..self.n_clusters {
                distances[[i, k]] = squared_euclidean(&x.row(i), &centroids.row(k)).sqrt();
            }
        }

        Ok(distances)
    }

    fn fitted_centers(&self, x: &Matrix) -> Result<&Matrix> {
        let centroids = self.cluster_centers.as_ref().ok_or(Error::NotFitted("KMeans"))?;

        if x.ncols() != centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: centroids.ncols(),
                found: x.ncols(),
            });
        }

        Ok(centroids)
    }

    /// Tolerance relative to the mean per-feature variance of the data.
    fn scaled_tolerance(&self, x: &Matrix) -> f64 {
        let variances = x.var_axis(Axis(0), 0.0);
        variances.mean().unwrap_or(0.0) * self.tolerance
    }

    fn single_run<R: Rng + ?Sized>(&self, x: &Matrix, tol: f64, rng: &mut R) -> Result<Run> {
        let mut centers = self.kmeans_plus_plus(x, rng);
        let mut labels = self.assign(x, &centers);
        let mut n_iter = 0;

        for iteration in 0..self.max_iter {
            n_iter = iteration + 1;

            let new_centers = self.update_centers(x, &labels, &centers);
            let shift: f64 = (&new_centers - &centers).mapv(|d| d * d).sum();
            centers = new_centers;

            let new_labels = self.assign(x, &centers);
            let stable = new_labels == labels;
            labels = new_labels;

            if stable || shift <= tol {
                break;
            }
        }

        let inertia = inertia(x, &labels, &centers)?;
        Ok(Run {
            centers,
            labels,
            inertia,
            n_iter,
        })
    }

    fn assign(&self, x: &Matrix, centers: &Matrix) -> Labels {
        x.axis_iter(Axis(0))
            .map(|row| nearest_center(&row, centers).0)
            .collect()
    }

    fn update_centers(&self, x: &Matrix, labels: &Labels, old: &Matrix) -> Matrix {
        let mut sums = Matrix::zeros((self.n_clusters, x.ncols()));
        let mut counts = vec![0usize; self.n_clusters];

        for (row, &label) in x.axis_iter(Axis(0)).zip(labels.iter()) {
            let mut sum = sums.row_mut(label);
            sum += &row;
            counts[label] += 1;
        }

        let mut taken = Vec::new();
        for k in 0..self.n_clusters {
            if counts[k] > 0 {
                let mut center = sums.row_mut(k);
                center /= counts[k] as f64;
            } else {
                // Re-seed an empty cluster with the point farthest from its centroid.
                let far = self.farthest_point(x, labels, old, &taken);
                taken.push(far);
                sums.row_mut(k).assign(&x.row(far));
            }
        }

        sums
    }

    fn farthest_point(&self, x: &Matrix, labels: &Labels, centers: &Matrix, taken: &[usize]) -> usize {
        let mut far = 0;
        let mut far_dist = f64::NEG_INFINITY;
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            if taken.contains(&i) {
                continue;
            }
            let dist = squared_euclidean(&row, &centers.row(labels[i]));
            if dist > far_dist {
                far_dist = dist;
                far = i;
            }
        }
        far
    }

    /// Greedy k-means++: each new centroid is the best of `2 + ln(k)`
    /// candidates sampled proportionally to squared distance.
    fn kmeans_plus_plus<R: Rng + ?Sized>(&self, x: &Matrix, rng: &mut R) -> Matrix {
        let n_samples = x.nrows();
        let n_local_trials = 2 + (self.n_clusters as f64).ln().floor() as usize;
        let mut centroids = Matrix::zeros((self.n_clusters, x.ncols()));

        let first_idx = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first_idx));

        let mut closest: Vector = x
            .axis_iter(Axis(0))
            .map(|row| squared_euclidean(&row, &centroids.row(0)))
            .collect();
        let mut potential = closest.sum();

        for k in 1..self.n_clusters {
            let mut best_candidate = None;
            let mut best_potential = f64::INFINITY;
            let mut best_closest = closest.clone();

            for _ in 0..n_local_trials {
                let candidate = if potential > 0.0 {
                    pick_weighted(&closest, rng.gen_range(0.0..1.0) * potential)
                } else {
                    rng.gen_range(0..n_samples)
                };

                let trial_closest: Vector = x
                    .axis_iter(Axis(0))
                    .zip(closest.iter())
                    .map(|(row, &current)| current.min(squared_euclidean(&row, &x.row(candidate))))
                    .collect();
                let trial_potential = trial_closest.sum();

                if trial_potential < best_potential {
                    best_potential = trial_potential;
                    best_candidate = Some(candidate);
                    best_closest = trial_closest;
                }
            }

            let chosen = best_candidate.unwrap_or(first_idx);
            centroids.row_mut(k).assign(&x.row(chosen));
            closest = best_closest;
            potential = best_potential;
        }

        centroids
    }
}

/// Index of the first sample whose cumulative weight reaches `target`.
fn pick_weighted(weights: &Vector, target: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative >= target {
            return i;
        }
    }
    weights.len() - 1
}
