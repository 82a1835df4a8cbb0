//! Generation, scaling and clustering stages shared by both demos.
//!
//! One `ChaCha8Rng` is seeded from the config and threaded through the
//! generator and then the K-Means initializer, so a seed fixes the whole run.

use crate::cluster::{KMeans, LinkageTree, WardLinkage};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metrics::adjusted_rand_index;
use crate::preprocessing::MinMaxScaler;
use crate::{Labels, Matrix};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

#[derive(Clone, Debug)]
pub struct KMeansOutcome {
    /// Generated data with the K-Means assignment attached.
    pub dataset: Dataset,
    pub scaler: MinMaxScaler,
    pub model: KMeans,
    /// Cluster centers in original units.
    pub centroids: Matrix,
    /// Adjusted Rand index between clusters and generating segments.
    pub agreement: f64,
}

impl KMeansOutcome {
    pub fn labels(&self) -> Option<&Labels> {
        self.dataset.clusters.as_ref()
    }
}

#[derive(Clone, Debug)]
pub struct HierarchicalOutcome {
    /// Generated data with the flat Ward assignment attached.
    pub dataset: Dataset,
    pub scaler: MinMaxScaler,
    pub tree: LinkageTree,
    /// Tree height separating the requested number of clusters.
    pub cut_height: f64,
    pub agreement: f64,
}

impl HierarchicalOutcome {
    pub fn labels(&self) -> Option<&Labels> {
        self.dataset.clusters.as_ref()
    }
}

/// Generates the dataset and fits the scaler on all of it.
fn prepare(config: &PipelineConfig, rng: &mut ChaCha8Rng) -> Result<(Dataset, MinMaxScaler, Matrix)> {
    if config.n_clusters == 0 {
        return Err(Error::InvalidClusterCount(config.n_clusters));
    }

    info!(seed = config.seed, segments = config.segments.len(), "generating synthetic customer data");
    let dataset = Dataset::generate(&config.segments, rng)?;

    let mut scaler = MinMaxScaler::new();
    let scaled = scaler.fit_transform(&dataset.features)?;
    info!(n_samples = dataset.n_samples(), "features scaled to [0, 1]");

    Ok((dataset, scaler, scaled))
}

pub fn run_kmeans(config: &PipelineConfig) -> Result<KMeansOutcome> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (mut dataset, scaler, scaled) = prepare(config, &mut rng)?;

    info!(n_clusters = config.n_clusters, n_init = config.n_init, "running k-means");
    let mut model = KMeans::new(config.n_clusters)
        .n_init(config.n_init)
        .max_iter(config.max_iter)
        .tolerance(config.tolerance);
    model.fit_with_rng(&scaled, &mut rng)?;

    let labels = model.labels.clone().ok_or(Error::NotFitted("KMeans"))?;
    let centers = model.cluster_centers.as_ref().ok_or(Error::NotFitted("KMeans"))?;
    let centroids = scaler.inverse_transform(centers)?;
    let agreement = adjusted_rand_index(&dataset.segments, &labels)?;
    dataset.attach_clusters(labels)?;

    Ok(KMeansOutcome {
        dataset,
        scaler,
        model,
        centroids,
        agreement,
    })
}

pub fn run_hierarchical(config: &PipelineConfig) -> Result<HierarchicalOutcome> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (mut dataset, scaler, scaled) = prepare(config, &mut rng)?;

    info!(n_clusters = config.n_clusters, "computing ward linkage");
    let mut model = WardLinkage::new(config.n_clusters);
    model.fit(&scaled)?;

    let tree = model.tree.take().ok_or(Error::NotFitted("WardLinkage"))?;
    let labels = model.labels.take().ok_or(Error::NotFitted("WardLinkage"))?;
    let cut_height = tree.cut_height(config.n_clusters)?;
    let agreement = adjusted_rand_index(&dataset.segments, &labels)?;
    dataset.attach_clusters(labels)?;

    Ok(HierarchicalOutcome {
        dataset,
        scaler,
        tree,
        cut_height,
        agreement,
    })
}
