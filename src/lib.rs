//! Customer segmentation demos: synthetic age/spend data, min-max scaling,
//! K-Means and Ward hierarchical clustering, plus console and plot reporting.

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cli;
pub mod cluster;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod preprocessing;
pub mod report;

pub use cluster::{Dendrogram, KMeans, LinkageTree, Merge, WardLinkage};
pub use config::{ImageFormat, PipelineConfig};
pub use dataset::{ClusterSummary, Dataset, SegmentSpec, default_segments};
pub use error::{Error, Result};
pub use preprocessing::MinMaxScaler;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
pub type Labels = Array1<usize>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_types_work() {
        let vec = Vector::zeros(5);
        let mat = Matrix::zeros((3, 4));
        let labels = Labels::zeros(3);
        assert_eq!(vec.len(), 5);
        assert_eq!(mat.shape(), &[3, 4]);
        assert_eq!(labels.len(), 3);
    }
}
