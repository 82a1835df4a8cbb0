use crate::error::{Error, Result};
use crate::metrics::label_counts;
use crate::{Labels, Matrix};
use ndarray::{Axis, s};
use ndarray_rand::rand_distr::{Distribution, Normal};
use rand::Rng;
use tracing::debug;

pub const FEATURE_NAMES: [&str; 2] = ["age", "annual_spend"];

/// One generating distribution: independent normals per feature.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSpec {
    pub name: String,
    pub mean: [f64; 2],
    pub std_dev: [f64; 2],
    pub count: usize,
}

impl SegmentSpec {
    pub fn new(name: &str, mean: [f64; 2], std_dev: [f64; 2], count: usize) -> Self {
        Self {
            name: name.to_string(),
            mean,
            std_dev,
            count,
        }
    }

    fn distributions(&self) -> Result<Vec<Normal<f64>>> {
        self.mean
            .iter()
            .zip(self.std_dev.iter())
            .map(|(&mean, &std_dev)| {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev <= 0.0 {
                    return Err(Error::InvalidDistribution {
                        segment: self.name.clone(),
                        reason: format!("mean={mean}, std_dev={std_dev}"),
                    });
                }
                Normal::new(mean, std_dev).map_err(|e| Error::InvalidDistribution {
                    segment: self.name.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Draws `count` rows, age then spend for each row.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Matrix> {
        let distributions = self.distributions()?;
        Ok(Matrix::from_shape_fn(
            (self.count, distributions.len()),
            |(_, j)| distributions[j].sample(&mut *rng),
        ))
    }
}

/// Young, adult and senior customers, 100 each.
pub fn default_segments() -> Vec<SegmentSpec> {
    vec![
        SegmentSpec::new("young", [25.0, 2000.0], [5.0, 500.0], 100),
        SegmentSpec::new("adult", [40.0, 5000.0], [5.0, 1000.0], 100),
        SegmentSpec::new("senior", [60.0, 8000.0], [5.0, 1500.0], 100),
    ]
}

#[derive(Clone, Debug)]
pub struct Dataset {
    pub features: Matrix,
    /// Index of the segment each row was drawn from.
    pub segments: Labels,
    pub clusters: Option<Labels>,
}

impl Dataset {
    pub fn new(features: Matrix, segments: Labels) -> Result<Self> {
        if features.nrows() != segments.len() {
            return Err(Error::DimensionMismatch {
                expected: features.nrows(),
                found: segments.len(),
            });
        }

        Ok(Self {
            features,
            segments,
            clusters: None,
        })
    }

    /// Samples every segment in order and stacks the rows.
    pub fn generate<R: Rng + ?Sized>(segment_specs: &[SegmentSpec], rng: &mut R) -> Result<Self> {
        let n_samples: usize = segment_specs.iter().map(|segment| segment.count).sum();
        if segment_specs.is_empty() || segment_specs.iter().any(|segment| segment.count == 0) {
            return Err(Error::EmptyInput);
        }

        let mut features = Matrix::zeros((n_samples, FEATURE_NAMES.len()));
        let mut segments = Labels::zeros(n_samples);
        let mut offset = 0;

        for (idx, segment) in segment_specs.iter().enumerate() {
            let block = segment.sample(rng)?;
            let end = offset + segment.count;
            features.slice_mut(s![offset..end, ..]).assign(&block);
            segments.slice_mut(s![offset..end]).fill(idx);
            debug!(segment = %segment.name, rows = segment.count, "sampled segment");
            offset = end;
        }

        Self::new(features, segments)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    /// Count of NaN or infinite values per column.
    pub fn missing_values(&self) -> Vec<usize> {
        self.features
            .axis_iter(Axis(1))
            .map(|column| column.iter().filter(|v| !v.is_finite()).count())
            .collect()
    }

    pub fn attach_clusters(&mut self, labels: Labels) -> Result<()> {
        if labels.len() != self.n_samples() {
            return Err(Error::DimensionMismatch {
                expected: self.n_samples(),
                found: labels.len(),
            });
        }
        self.clusters = Some(labels);
        Ok(())
    }

    /// Per-cluster sizes and feature means in original units.
    pub fn cluster_summary(&self, n_clusters: usize) -> Result<ClusterSummary> {
        let labels = self.clusters.as_ref().ok_or(Error::NotFitted("Cluster assignment"))?;
        if n_clusters == 0 {
            return Err(Error::InvalidClusterCount(n_clusters));
        }

        let counts = label_counts(labels, n_clusters)?;
        let mut sums = Matrix::zeros((n_clusters, self.n_features()));

        for (row, &label) in self.features.axis_iter(Axis(0)).zip(labels.iter()) {
            let mut sum = sums.row_mut(label);
            sum += &row;
        }

        for (k, mut sum) in sums.axis_iter_mut(Axis(0)).enumerate() {
            if counts[k] == 0 {
                sum.fill(f64::NAN);
            } else {
                sum /= counts[k] as f64;
            }
        }

        Ok(ClusterSummary {
            counts,
            means: sums,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ClusterSummary {
    pub counts: Vec<usize>,
    /// One row per cluster, one column per feature. NaN for empty clusters.
    pub means: Matrix,
}

impl ClusterSummary {
    pub fn n_clusters(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_dataset_creation() {
        let features = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let segments = array![0, 0, 1];

        let dataset = Dataset::new(features, segments).unwrap();
        assert_eq!(dataset.n_samples(), 3);
        assert_eq!(dataset.n_features(), 2);
        assert!(dataset.clusters.is_none());
    }

    #[test]
    fn test_dataset_length_mismatch() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        let segments = array![0, 1, 2];

        assert!(Dataset::new(features, segments).is_err());
    }

    #[test]
    fn test_generate_shape_and_segments() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let dataset = Dataset::generate(&default_segments(), &mut rng).unwrap();

        assert_eq!(dataset.features.shape(), &[300, 2]);
        assert_eq!(dataset.segments[0], 0);
        assert_eq!(dataset.segments[150], 1);
        assert_eq!(dataset.segments[299], 2);
        assert_eq!(dataset.missing_values(), vec![0, 0]);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let first = Dataset::generate(&default_segments(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let second = Dataset::generate(&default_segments(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let other = Dataset::generate(&default_segments(), &mut ChaCha8Rng::seed_from_u64(7)).unwrap();

        for (a, b) in first.features.iter().zip(second.features.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_ne!(first.features, other.features);
    }

    #[test]
    fn test_generated_segment_means() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let segment_specs = default_segments();
        let dataset = Dataset::generate(&segment_specs, &mut rng).unwrap();

        for (idx, segment) in segment_specs.iter().enumerate() {
            let rows = dataset.features.slice(s![idx * 100..(idx + 1) * 100, ..]);
            let means = rows.mean_axis(Axis(0)).unwrap();
            // Five standard errors of the mean.
            assert!((means[0] - segment.mean[0]).abs() < 5.0 * segment.std_dev[0] / 10.0);
            assert!((means[1] - segment.mean[1]).abs() < 5.0 * segment.std_dev[1] / 10.0);
        }
    }

    #[test]
    fn test_generate_rejects_bad_std_dev() {
        let segment_specs = vec![SegmentSpec::new("broken", [1.0, 1.0], [0.0, 1.0], 10)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = Dataset::generate(&segment_specs, &mut rng);
        assert!(matches!(result, Err(Error::InvalidDistribution { .. })));
    }

    #[test]
    fn test_generate_rejects_empty_segments() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(Dataset::generate(&[], &mut rng), Err(Error::EmptyInput)));

        let segment_specs = vec![SegmentSpec::new("none", [1.0, 1.0], [1.0, 1.0], 0)];
        assert!(matches!(Dataset::generate(&segment_specs, &mut rng), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_missing_values_counts_non_finite() {
        let features = array![[1.0, f64::NAN], [f64::INFINITY, 4.0], [5.0, f64::NAN]];
        let dataset = Dataset::new(features, array![0, 0, 0]).unwrap();

        assert_eq!(dataset.missing_values(), vec![1, 2]);
    }

    #[test]
    fn test_cluster_summary() {
        let features = array![[20.0, 1000.0], [30.0, 3000.0], [60.0, 9000.0]];
        let mut dataset = Dataset::new(features, array![0, 0, 1]).unwrap();

        assert!(dataset.cluster_summary(2).is_err());

        dataset.attach_clusters(array![1, 1, 0]).unwrap();
        let summary = dataset.cluster_summary(2).unwrap();

        assert_eq!(summary.counts, vec![1, 2]);
        assert_eq!(summary.means.row(0).to_vec(), vec![60.0, 9000.0]);
        assert_eq!(summary.means.row(1).to_vec(), vec![25.0, 2000.0]);

        assert!(matches!(
            dataset.cluster_summary(1),
            Err(Error::InvalidClusterCount(2))
        ));
    }

    #[test]
    fn test_attach_clusters_length_mismatch() {
        let mut dataset = Dataset::new(array![[1.0, 2.0]], array![0]).unwrap();
        assert!(dataset.attach_clusters(array![0, 1]).is_err());
    }
}
